use thiserror::Error;

use crate::error::{CacheError, CatalogLoadError, StorageError};
use crate::job::Step;

/// Failure of a single step. Recorded on the job; never aborts the batch.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("No handler registered for step '{0}'")]
    NoHandler(Step),

    #[error("Fetch failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Command '{program}' failed: {reason}")]
    Command { program: String, reason: String },

    #[error("{0}")]
    Failed(String),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to load catalog: {0}")]
    Catalog(#[from] CatalogLoadError),
}
