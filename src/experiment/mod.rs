pub mod importance;
pub mod runner;

use crate::error::{PipelineError, Result};
use crate::projection::ProjectionReport;
use crate::tree::cart::CartConfig;
use crate::utils::{format_duration, format_number, validation};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use importance::ImportanceAccumulator;
pub use runner::Experiment;

/// Experiment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Free-text description stored on the experiment row
    pub description: String,
    /// Number of trees generated
    pub iterations: usize,
    /// Random transpositions applied to the gene order per iteration
    pub swaps: usize,
    /// Random seed (drawn from entropy when unset)
    pub seed: Option<u64>,
    /// Per-iteration induction deadline in seconds (0 or unset = none)
    pub iteration_timeout_secs: Option<u64>,
    /// Tree growth limits
    pub cart: CartConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            description: "decision tree lineages".to_string(),
            iterations: 100,
            swaps: crate::data::shuffle::DEFAULT_SWAPS,
            seed: None,
            iteration_timeout_secs: None,
            cart: CartConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            PipelineError::InvalidConfig(format!("{}: {}", path.display(), e))
        })
    }

    /// Reject values that cannot produce a run
    pub fn validate(&self) -> Result<()> {
        validation::positive(self.iterations, "iterations")?;
        validation::positive(self.cart.min_samples_split, "cart.min_samples_split")?;
        validation::positive(self.cart.min_samples_leaf, "cart.min_samples_leaf")?;
        if let Some(depth) = self.cart.max_depth {
            validation::positive(depth, "cart.max_depth")?;
        }
        if self.description.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "description must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct ExperimentSummary {
    pub experiment_id: i64,
    /// Iterations whose tree generation was committed
    pub completed: usize,
    /// Iterations skipped after an iteration-local error
    pub failed: usize,
    /// Rows written across all committed tree generations
    pub rows: ProjectionReport,
    pub importances: ImportanceAccumulator,
    pub duration_secs: f64,
}

impl ExperimentSummary {
    pub fn print(&self) {
        println!("\n=== Experiment Summary ===");
        println!("Experiment id: {}", self.experiment_id);
        println!("Trees committed: {}", self.completed);
        println!("Iterations skipped: {}", self.failed);
        println!("Gene occurrences: {}", format_number(self.rows.occurrences));
        println!("Parent/child pairs: {}", format_number(self.rows.pairs));
        println!("Paths: {}", format_number(self.rows.paths));
        println!("Tree nodes: {}", format_number(self.rows.tree_nodes));
        println!("Duration: {}", format_duration(self.duration_secs));
        println!("==========================\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert_eq!(config.swaps, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = ExperimentConfig {
            iterations: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_max_depth_rejected() {
        let mut config = ExperimentConfig::default();
        config.cart.max_depth = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"iterations": 7, "seed": 11, "cart": {{"max_depth": 3}}}}"#).unwrap();

        let config = ExperimentConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.iterations, 7);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.cart.max_depth, Some(3));
        assert_eq!(config.cart.min_samples_split, 2);
        assert_eq!(config.swaps, 100);
    }

    #[test]
    fn test_bad_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            ExperimentConfig::from_json_file(file.path()),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
