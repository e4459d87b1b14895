//! Run/batch partitioning, aggregate counters, and the per-batch log.

mod aggregator;
mod batch_log;
mod input;
mod planner;
mod record;
mod stats;

pub use aggregator::{refresh_batch, refresh_run};
pub use batch_log::BatchLog;
pub use input::{dedup_source_ids, read_source_ids};
pub use planner::{batch_dir_name, BatchPlanner};
pub use record::{BatchRecord, BatchRef, JobRef, RunRecord, BATCH_FILE, BATCH_LOG_FILE, RUN_FILE};
pub use stats::{Aggregate, StatusCounts};
