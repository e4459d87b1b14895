use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LensError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogLoadError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    UnknownStep(#[from] UnknownStepError),

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatusError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid step configuration: {0}")]
    UnknownStep(#[from] UnknownStepError),
}

/// User-correctable input problems. Never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {
    #[error("Batch size must be at least 1, got {batch_size}")]
    InvalidBatchSize { batch_size: usize },

    #[error("No source identifiers to plan")]
    EmptyInput,

    #[error("Could not derive a source id from '{0}'")]
    MalformedSourceRef(String),

    #[error("Invalid source id '{id}': {reason}")]
    InvalidSourceId { id: String, reason: String },

    #[error("Invalid run name '{name}': {reason}")]
    InvalidRunName { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum CatalogLoadError {
    #[error("Failed to read catalog '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog is missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("Catalog row {row} is missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("Catalog row {row} has invalid metadata JSON: {source}")]
    InvalidMetadata {
        row: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate code '{code}' on catalog rows {first_row} and {row}")]
    DuplicateCode {
        code: String,
        first_row: usize,
        row: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown step '{name}'")]
pub struct UnknownStepError {
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown status '{name}'")]
pub struct UnknownStatusError {
    pub name: String,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename '{from}' to '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Job record '{path}' is missing steps: {missing}")]
    IncompleteSteps { path: PathBuf, missing: String },
}

/// Failures of the fetch collaborator. Transient; the calling step decides
/// whether to retry.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Fetch of '{source_id}' failed: {reason}")]
    Collaborator { source_id: String, reason: String },

    #[error("Fetch of '{source_id}' produced no artifact")]
    NoArtifact { source_id: String },

    #[error("Failed to stage fetched artifact: {0}")]
    Staging(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    #[error("Run already planned at '{0}'")]
    RunExists(PathBuf),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, LensError>;
