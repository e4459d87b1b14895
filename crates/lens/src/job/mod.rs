//! Per-job records: the fixed step set, statuses, and durable storage.

mod outputs;
mod record;
mod store;

pub use outputs::{Insight, PersistReport, StepFailure, StepOutputs};
pub use record::{derive_status, JobRecord, Status, Step};
pub use store::{generate_job_id, JobStore, JOB_FILE};
