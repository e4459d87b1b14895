pub mod batch;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod job;
pub mod media;
pub mod pipeline;
pub mod sanitize;
pub mod source;
pub mod storage;
pub mod worker;

pub use batch::{Aggregate, BatchPlanner, BatchRecord, RunRecord, StatusCounts};
pub use cache::{ArtifactInfo, DownloadCache, Fetcher};
pub use catalog::{Catalog, Entity, EntityMatch, EntityResolver, MatchStrategy};
pub use config::{load_config, Config};
pub use error::{
    CacheError, CatalogLoadError, ConfigError, FetchError, InvalidInputError, LensError,
    PlanError, Result, StorageError, UnknownStatusError, UnknownStepError, WorkerError,
};
pub use job::{JobRecord, JobStore, Status, Step};
pub use pipeline::{Pipeline, PipelineConfig, StepContext, StepError, StepRegistry};
pub use source::SourceRef;
