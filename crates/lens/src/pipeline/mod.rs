pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod registry;
pub mod runner;
pub mod steps;

pub use config::PipelineConfig;
pub use context::StepContext;
pub use error::{PipelineError, StepError};
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter};
pub use registry::{StepHandler, StepRegistry};
pub use runner::{BatchSummary, BatchTracker, JobOutcome, Pipeline};
