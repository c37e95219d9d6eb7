//! # treemine: decision-tree lineage mining
//!
//! treemine fits many decision trees over a gene expression table, each on a
//! randomly shuffled gene order, and stores every root-to-leaf lineage in a
//! SQLite database so that recurring genes and parent/child gene pairs can be
//! mined afterwards.
//!
//! ## Features
//!
//! - CSV/TSV feature tables, optionally gzipped, with version-stripped gene ids
//! - CART trees with Gini impurity and per-gene importance scores
//! - Lineage projection into gene occurrence, pair, path and node tables
//! - One transaction per tree generation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use treemine::data::loader::TableLoader;
//! use treemine::experiment::{Experiment, ExperimentConfig};
//! use treemine::store::Store;
//! use treemine::tree::cart::CartInducer;
//!
//! let table = TableLoader::new().load("expression.csv").unwrap();
//! let mut store = Store::open("trees.sqlite3").unwrap();
//!
//! let config = ExperimentConfig {
//!     iterations: 10,
//!     seed: Some(2026),
//!     ..ExperimentConfig::default()
//! };
//! let experiment = Experiment::new(config, CartInducer::default());
//! let summary = experiment.run(&mut store, &table).unwrap();
//! summary.print();
//! ```

pub mod cli;
pub mod data;
pub mod error;
pub mod experiment;
pub mod projection;
pub mod store;
pub mod tree;
pub mod utils;

/// Re-export commonly used types
pub use data::loader::TableLoader;
pub use data::{FeatureTable, Matrix};
pub use error::{PipelineError, Result};
pub use experiment::{Experiment, ExperimentConfig, ExperimentSummary};
pub use store::Store;
pub use tree::cart::{CartConfig, CartInducer};
pub use tree::{FittedModel, FittedTree, TreeInducer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!(
        "{} v{} - decision-tree lineage mining for gene expression data",
        NAME, VERSION
    )
}
