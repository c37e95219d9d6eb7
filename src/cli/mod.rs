use crate::error::Result;
use crate::experiment::ExperimentConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// treemine: decision-tree lineage mining over gene expression tables
#[derive(Parser, Debug)]
#[command(name = "treemine")]
#[command(about = "Mine gene lineages from repeated decision trees into SQLite")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit shuffled trees and store their lineages
    Run(RunArgs),

    /// Summarize the lineages stored for an experiment
    Mine(MineArgs),
}

/// Run arguments
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Feature table (CSV or TSV, optionally gzipped)
    #[arg(short, long, required = true)]
    pub input: PathBuf,

    /// SQLite database file
    #[arg(short, long, default_value = "trees.sqlite3")]
    pub database: PathBuf,

    /// Experiment configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Experiment description
    #[arg(long)]
    pub description: Option<String>,

    /// Number of trees generated
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Random column transpositions per iteration
    #[arg(long)]
    pub swaps: Option<usize>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum tree depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Per-iteration induction deadline in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Name of the condition column (defaults to the last column)
    #[arg(long)]
    pub condition_column: Option<String>,

    /// Keep version suffixes on gene identifiers
    #[arg(long)]
    pub keep_versions: bool,

    /// Write per-gene importance scores to this JSON file
    #[arg(long)]
    pub importance_output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn experiment_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };

        if let Some(description) = &self.description {
            config.description = description.clone();
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(swaps) = self.swaps {
            config.swaps = swaps;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(depth) = self.max_depth {
            config.cart.max_depth = Some(depth);
        }
        if let Some(timeout) = self.timeout {
            config.iteration_timeout_secs = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Mining arguments
#[derive(Parser, Debug)]
pub struct MineArgs {
    /// SQLite database file
    #[arg(short, long, default_value = "trees.sqlite3")]
    pub database: PathBuf,

    /// Experiment id (lists experiments when omitted)
    #[arg(short, long)]
    pub experiment: Option<i64>,

    /// Number of genes and pairs to report
    #[arg(short, long, default_value = "20")]
    pub top: usize,

    /// Write the report as JSON instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Setup logging based on verbosity; `RUST_LOG` wins when set
pub fn setup_logging(verbose: bool) {
    let filter = if verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
