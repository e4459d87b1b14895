pub mod pool;

pub use pool::{BatchOutcome, WorkerPool};
