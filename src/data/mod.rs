pub mod encoding;
pub mod loader;
pub mod shuffle;

use crate::error::{PipelineError, Result};
use std::collections::HashMap;

/// Default name of the trailing label column
pub const DEFAULT_CONDITION_COLUMN: &str = "Pacient_Condition";

/// Strip a version suffix from a gene identifier.
///
/// `ENSG00000123.5` becomes `ENSG00000123`; identifiers without a dot are
/// returned unchanged.
pub fn strip_version(gene_id: &str) -> &str {
    gene_id.split('.').next().unwrap_or(gene_id)
}

/// Samples x genes expression table with one condition label per sample
#[derive(Debug, Clone)]
pub struct FeatureTable {
    /// Sample identifiers, one per row
    samples: Vec<String>,
    /// Gene identifiers, one per column
    genes: Vec<String>,
    /// Row-major expression values (samples x genes)
    values: Vec<f64>,
    /// Condition label per sample
    conditions: Vec<String>,
    /// Column position of each gene
    gene_index: HashMap<String, usize>,
}

impl FeatureTable {
    /// Build a table from rows, validating its shape
    pub fn new(
        samples: Vec<String>,
        genes: Vec<String>,
        rows: Vec<Vec<f64>>,
        conditions: Vec<String>,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(PipelineError::MalformedInput("table has no samples".into()));
        }
        if genes.is_empty() {
            return Err(PipelineError::MalformedInput("table has no gene columns".into()));
        }
        if rows.len() != samples.len() || conditions.len() != samples.len() {
            return Err(PipelineError::MalformedInput(format!(
                "expected {} rows and labels, got {} rows and {} labels",
                samples.len(),
                rows.len(),
                conditions.len()
            )));
        }

        let mut gene_index = HashMap::with_capacity(genes.len());
        for (i, gene) in genes.iter().enumerate() {
            if gene_index.insert(gene.clone(), i).is_some() {
                return Err(PipelineError::MalformedInput(format!(
                    "duplicate gene column: {}",
                    gene
                )));
            }
        }

        let mut values = Vec::with_capacity(samples.len() * genes.len());
        for (sample, row) in samples.iter().zip(&rows) {
            if row.len() != genes.len() {
                return Err(PipelineError::MalformedInput(format!(
                    "sample {} has {} values, expected {}",
                    sample,
                    row.len(),
                    genes.len()
                )));
            }
            if let Some(col) = row.iter().position(|v| !v.is_finite()) {
                return Err(PipelineError::MalformedInput(format!(
                    "sample {} has non-finite value {} for gene {}",
                    sample, row[col], genes[col]
                )));
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            samples,
            genes,
            values,
            conditions,
            gene_index,
        })
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    /// Re-project the expression values onto a new gene order.
    ///
    /// Column `j` of the returned matrix holds gene `order[j]`.
    pub fn project(&self, order: &[String]) -> Result<Matrix> {
        let cols = order
            .iter()
            .map(|gene| {
                self.gene_index.get(gene).copied().ok_or_else(|| {
                    PipelineError::MalformedInput(format!("unknown gene in column order: {}", gene))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let n_genes = self.genes.len();
        let mut data = Vec::with_capacity(self.samples.len() * cols.len());
        for row in 0..self.samples.len() {
            let base = row * n_genes;
            data.extend(cols.iter().map(|&c| self.values[base + c]));
        }

        Ok(Matrix::from_raw(self.samples.len(), cols.len(), data))
    }
}

/// Dense row-major feature matrix handed to the tree inducer
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Wrap row-major data; `data.len()` must equal `n_rows * n_cols`
    pub fn from_raw(n_rows: usize, n_cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n_rows * n_cols);
        Self { n_rows, n_cols, data }
    }

    /// Build from per-row vectors of equal length
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n_cols = rows.first().map_or(0, Vec::len);
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::from_raw(rows.len(), n_cols, data)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }
}
