//! Crash recovery: rebuild batch and run state from the job files on disk.

use std::path::Path;

use tracing::{debug, warn};

use super::record::{BatchRecord, JobRef, RunRecord, RUN_FILE};
use super::stats::Aggregate;
use crate::error::StorageError;
use crate::job::JobStore;
use crate::storage;

/// Reloads every job a batch references, refreshes its reference, recomputes
/// and saves the batch. Unreadable jobs keep their last known status.
pub fn refresh_batch(store: &JobStore, batch_path: &Path) -> Result<BatchRecord, StorageError> {
    let mut batch: BatchRecord = storage::load_yaml(batch_path)?;

    for job_ref in &mut batch.jobs {
        match store.load(&job_ref.job_yaml) {
            Ok(job) => *job_ref = JobRef::from_record(&job, job_ref.job_yaml.clone()),
            Err(e) => warn!("Keeping last known status of {}: {}", job_ref.job_id, e),
        }
    }

    batch.recompute_aggregates();
    storage::save_yaml(batch_path, &batch)?;
    debug!(
        "Batch {} refreshed: {}/{} completed",
        batch.batch_num, batch.stats.completed, batch.stats.total
    );
    Ok(batch)
}

/// Refreshes each batch of the run in `run_dir`, then the run itself.
pub fn refresh_run(store: &JobStore, run_dir: &Path) -> Result<RunRecord, StorageError> {
    let run_path = run_dir.join(RUN_FILE);
    let mut run: RunRecord = storage::load_yaml(&run_path)?;

    for batch_ref in &mut run.batches {
        let batch = refresh_batch(store, &batch_ref.batch_file())?;
        batch_ref.status = batch.status;
    }

    run.recompute_aggregates();
    storage::save_yaml(&run_path, &run)?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchPlanner;
    use crate::job::{Status, Step};
    use tempfile::TempDir;

    fn plan(temp: &TempDir, count: usize, batch_size: usize) -> (JobStore, RunRecord) {
        let store = JobStore::new(temp.path().join("jobs"));
        let planner = BatchPlanner::new(temp.path().join("runs"), store.clone());
        let ids: Vec<String> = (0..count).map(|i| format!("src{:08}", i)).collect();
        let run = planner.plan(&ids, batch_size, "run", "audio-only").unwrap();
        (store, run)
    }

    #[test]
    fn test_refresh_batch_reads_job_files() {
        let temp = TempDir::new().unwrap();
        let (store, run) = plan(&temp, 3, 3);
        let batch_path = run.batches[0].batch_file();
        let batch: BatchRecord = storage::load_yaml(&batch_path).unwrap();

        // Mutate job files behind the batch's back, as a crashed worker would.
        let mut first = store.load(&batch.jobs[0].job_yaml).unwrap();
        first.set_status(Step::Fetch, Status::Failed);
        store.save(&first, &batch.jobs[0].job_yaml).unwrap();

        let mut second = store.load(&batch.jobs[1].job_yaml).unwrap();
        for step in Step::ALL {
            second.set_status(step, Status::Completed);
        }
        store.save(&second, &batch.jobs[1].job_yaml).unwrap();

        let refreshed = refresh_batch(&store, &batch_path).unwrap();
        assert_eq!(refreshed.stats.failed, 1);
        assert_eq!(refreshed.stats.completed, 1);
        assert_eq!(refreshed.stats.pending, 1);
        assert!(refreshed.stats.is_consistent());
        assert_eq!(refreshed.status, Status::Processing);

        let saved: BatchRecord = storage::load_yaml(&batch_path).unwrap();
        assert_eq!(saved, refreshed);
    }

    #[test]
    fn test_refresh_batch_fixes_drifted_counters() {
        let temp = TempDir::new().unwrap();
        let (store, run) = plan(&temp, 2, 2);
        let batch_path = run.batches[0].batch_file();

        let mut batch: BatchRecord = storage::load_yaml(&batch_path).unwrap();
        batch.stats.completed = 7;
        storage::save_yaml(&batch_path, &batch).unwrap();

        let refreshed = refresh_batch(&store, &batch_path).unwrap();
        assert!(refreshed.stats.is_consistent());
        assert_eq!(refreshed.stats.pending, 2);
    }

    #[test]
    fn test_missing_job_file_keeps_last_status() {
        let temp = TempDir::new().unwrap();
        let (store, run) = plan(&temp, 2, 2);
        let batch_path = run.batches[0].batch_file();
        let batch: BatchRecord = storage::load_yaml(&batch_path).unwrap();
        std::fs::remove_file(&batch.jobs[0].job_yaml).unwrap();

        let refreshed = refresh_batch(&store, &batch_path).unwrap();
        assert_eq!(refreshed.stats.total, 2);
        assert_eq!(refreshed.jobs[0].status, Status::Pending);
    }

    #[test]
    fn test_refresh_run_rolls_up_batches() {
        let temp = TempDir::new().unwrap();
        let (store, run) = plan(&temp, 3, 2);
        let run_dir = temp.path().join("runs/run");

        let batch: BatchRecord = storage::load_yaml(&run.batches[1].batch_file()).unwrap();
        let mut job = store.load(&batch.jobs[0].job_yaml).unwrap();
        for step in Step::ALL {
            job.set_status(step, Status::Skipped);
        }
        store.save(&job, &batch.jobs[0].job_yaml).unwrap();

        let refreshed = refresh_run(&store, &run_dir).unwrap();
        assert_eq!(refreshed.stats.total, 2);
        assert_eq!(refreshed.stats.pending, 1);
        assert_eq!(refreshed.stats.skipped, 1);
        assert_eq!(refreshed.batches[1].status, Status::Skipped);
        assert_eq!(refreshed.status, Status::Processing);
        assert_eq!(refreshed.total_videos, 3);
    }
}
