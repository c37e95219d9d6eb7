use std::time::Duration;
use thiserror::Error;

/// Errors raised by the tree-mining pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unparseable feature table or missing expected column
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Label column cannot be encoded
    #[error("label encoding failed: {0}")]
    Encoding(String),

    /// Fitted tree does not have the expected shape
    #[error("malformed tree: {0}")]
    TreeStructure(String),

    /// Tree induction ran past the iteration deadline
    #[error("tree induction exceeded its deadline after {0:?}")]
    InductionTimeout(Duration),

    /// Insert or lookup against the store failed
    #[error("store write failed: {0}")]
    StoreWrite(#[from] rusqlite::Error),

    /// Experiment configuration rejected before the run
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error only invalidates the current iteration.
    ///
    /// Everything else aborts the whole run.
    pub fn is_iteration_local(&self) -> bool {
        matches!(
            self,
            PipelineError::TreeStructure(_) | PipelineError::InductionTimeout(_)
        )
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::MalformedInput(e.to_string())
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, PipelineError>;
