//! Per-gene importance scores collected across tree generations.

use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Gene -> one score per committed tree generation, in commit order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportanceAccumulator {
    scores: BTreeMap<String, Vec<f64>>,
}

impl ImportanceAccumulator {
    /// Start with an empty score list for every gene
    pub fn new<S: AsRef<str>>(genes: &[S]) -> Self {
        Self {
            scores: genes
                .iter()
                .map(|g| (g.as_ref().to_string(), Vec::new()))
                .collect(),
        }
    }

    /// Append one iteration's scores; `genes[i]` is the gene scored by `values[i]`.
    pub fn merge(&mut self, genes: &[String], values: &[f64]) -> Result<()> {
        if genes.len() != values.len() {
            return Err(PipelineError::TreeStructure(format!(
                "{} importance values for {} genes",
                values.len(),
                genes.len()
            )));
        }
        for (gene, &value) in genes.iter().zip(values) {
            self.scores.entry(gene.clone()).or_default().push(value);
        }
        Ok(())
    }

    pub fn scores(&self, gene: &str) -> Option<&[f64]> {
        self.scores.get(gene).map(Vec::as_slice)
    }

    pub fn n_genes(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.values().all(Vec::is_empty)
    }

    /// Report entries sorted by mean score, highest first
    pub fn report(&self) -> Vec<GeneImportance> {
        let mut entries: Vec<GeneImportance> = self
            .scores
            .iter()
            .map(|(gene, scores)| GeneImportance {
                gene: gene.clone(),
                mean: if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f64>() / scores.len() as f64
                },
                scores: scores.clone(),
            })
            .collect();
        entries.sort_by(|a, b| b.mean.total_cmp(&a.mean).then_with(|| a.gene.cmp(&b.gene)));
        entries
    }

    /// Write the report as pretty JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self.report())
            .map_err(|e| PipelineError::Io(e.into()))
    }
}

/// One gene's collected scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneImportance {
    pub gene: String,
    pub mean: f64,
    pub scores: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genes(names: &[&str]) -> Vec<String> {
        names.iter().map(|g| g.to_string()).collect()
    }

    #[test]
    fn test_merge_follows_gene_names() {
        let mut acc = ImportanceAccumulator::new(&["A", "B", "C"]);
        assert!(acc.is_empty());

        acc.merge(&genes(&["B", "A", "C"]), &[1.0, 0.0, 0.0]).unwrap();
        acc.merge(&genes(&["C", "B", "A"]), &[0.25, 0.75, 0.0]).unwrap();

        assert_eq!(acc.scores("A"), Some(&[0.0, 0.0][..]));
        assert_eq!(acc.scores("B"), Some(&[1.0, 0.75][..]));
        assert_eq!(acc.scores("C"), Some(&[0.0, 0.25][..]));
        assert_eq!(acc.n_genes(), 3);
    }

    #[test]
    fn test_merge_length_mismatch() {
        let mut acc = ImportanceAccumulator::new(&["A"]);
        assert!(acc.merge(&genes(&["A"]), &[0.5, 0.5]).is_err());
        assert!(acc.is_empty());
    }

    #[test]
    fn test_report_order_and_mean() {
        let mut acc = ImportanceAccumulator::new(&["A", "B"]);
        acc.merge(&genes(&["A", "B"]), &[0.2, 0.8]).unwrap();
        acc.merge(&genes(&["A", "B"]), &[0.4, 0.6]).unwrap();

        let report = acc.report();
        assert_eq!(report[0].gene, "B");
        assert!((report[0].mean - 0.7).abs() < 1e-12);
        assert!((report[1].mean - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("importance.json");
        let mut acc = ImportanceAccumulator::new(&["A"]);
        acc.merge(&genes(&["A"]), &[1.0]).unwrap();
        acc.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["gene"], "A");
        assert_eq!(value[0]["scores"][0], 1.0);
    }
}
