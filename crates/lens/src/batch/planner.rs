use std::path::{Path, PathBuf};

use tracing::{info, info_span, warn};

use super::batch_log::BatchLog;
use super::record::{BatchRecord, BatchRef, JobRef, RunRecord, BATCH_FILE, BATCH_LOG_FILE, RUN_FILE};
use crate::error::{InvalidInputError, PlanError};
use crate::job::JobStore;
use crate::sanitize::check_path_component;
use crate::source::SourceRef;
use crate::storage;

pub fn batch_dir_name(batch_num: u32) -> String {
    format!("batch_{:03}", batch_num)
}

/// Partitions source ids into batches and writes every job, batch, and run
/// record for a new run.
#[derive(Debug, Clone)]
pub struct BatchPlanner {
    batch_runs_directory: PathBuf,
    store: JobStore,
}

impl BatchPlanner {
    pub fn new(batch_runs_directory: impl Into<PathBuf>, store: JobStore) -> Self {
        Self {
            batch_runs_directory: batch_runs_directory.into(),
            store,
        }
    }

    pub fn run_dir(&self, run_name: &str) -> PathBuf {
        self.batch_runs_directory.join(run_name)
    }

    /// Chunks `source_ids` (already deduplicated) into batches of at most
    /// `batch_size`, in input order, numbered from 1.
    ///
    /// The run file is written last, so its presence marks a completely
    /// planned run. A plan that fails partway removes what it wrote.
    pub fn plan(
        &self,
        source_ids: &[String],
        batch_size: usize,
        run_name: &str,
        pipeline_type: &str,
    ) -> Result<RunRecord, PlanError> {
        if batch_size < 1 {
            return Err(InvalidInputError::InvalidBatchSize { batch_size }.into());
        }
        if source_ids.is_empty() {
            return Err(InvalidInputError::EmptyInput.into());
        }
        check_path_component(run_name).map_err(|reason| InvalidInputError::InvalidRunName {
            name: run_name.to_string(),
            reason,
        })?;
        for id in source_ids {
            check_source_id(id)?;
        }

        let run_dir = self.run_dir(run_name);
        if run_dir.join(RUN_FILE).exists() {
            return Err(PlanError::RunExists(run_dir));
        }

        let _span = info_span!("plan", run = %run_name, jobs = source_ids.len()).entered();

        let mut written = Written::default();
        if !run_dir.exists() {
            written.dirs.push(run_dir.clone());
        }
        let run = match self.write_run(
            &run_dir,
            source_ids,
            batch_size,
            run_name,
            pipeline_type,
            &mut written,
        ) {
            Ok(run) => run,
            Err(e) => {
                written.discard();
                return Err(e);
            }
        };

        info!(
            "Planned run {} with {} jobs in {} batches",
            run_name, run.total_videos, run.total_batches
        );
        Ok(run)
    }

    fn write_run(
        &self,
        run_dir: &Path,
        source_ids: &[String],
        batch_size: usize,
        run_name: &str,
        pipeline_type: &str,
        written: &mut Written,
    ) -> Result<RunRecord, PlanError> {
        let mut batches = Vec::new();
        for (index, chunk) in source_ids.chunks(batch_size).enumerate() {
            let batch_num = index as u32 + 1;
            let batch_dir = run_dir.join(batch_dir_name(batch_num));
            batches.push(self.plan_batch(
                &batch_dir,
                batch_num,
                chunk,
                run_name,
                pipeline_type,
                written,
            )?);
        }

        let run = RunRecord::new(run_name, pipeline_type, batch_size, batches);
        storage::save_yaml(&run_dir.join(RUN_FILE), &run)?;
        Ok(run)
    }

    fn plan_batch(
        &self,
        batch_dir: &Path,
        batch_num: u32,
        source_ids: &[String],
        run_name: &str,
        pipeline_type: &str,
        written: &mut Written,
    ) -> Result<BatchRef, PlanError> {
        let mut jobs = Vec::with_capacity(source_ids.len());
        for source_id in source_ids {
            let record = self
                .store
                .create(source_id, batch_num, run_name, pipeline_type)?;
            let job_dir = self.store.job_dir(&record.job_id);
            if !job_dir.exists() {
                written.dirs.push(job_dir);
            }
            let path = self.store.save_new(&record)?;
            jobs.push(JobRef::from_record(&record, path));
        }

        if !batch_dir.exists() {
            written.dirs.push(batch_dir.to_path_buf());
        }

        let batch = BatchRecord::new(batch_num, run_name, pipeline_type, jobs);
        storage::save_yaml(&batch_dir.join(BATCH_FILE), &batch)?;

        let log = BatchLog::create(batch_dir.join(BATCH_LOG_FILE))?;
        log.append(&format!(
            "Batch {} planned with {} jobs",
            batch_num,
            batch.jobs.len()
        ))?;

        Ok(BatchRef {
            batch_num,
            path: batch_dir.to_path_buf(),
            job_count: batch.jobs.len(),
            status: batch.status,
        })
    }
}

/// Planned ids must be bare source ids, the form the fetch step resolves.
fn check_source_id(id: &str) -> Result<(), InvalidInputError> {
    match SourceRef::parse(id) {
        Ok(source) if source.source_id == id => Ok(()),
        _ => Err(InvalidInputError::InvalidSourceId {
            id: id.to_string(),
            reason: "not a bare 11-character source id".to_string(),
        }),
    }
}

/// Directories created by a plan that has not finished yet.
#[derive(Default)]
struct Written {
    dirs: Vec<PathBuf>,
}

impl Written {
    /// Removes everything a failed plan wrote, so a re-plan starts clean.
    fn discard(self) {
        for dir in self.dirs.iter().rev() {
            if !dir.exists() {
                continue;
            }
            if let Err(e) = std::fs::remove_dir_all(dir) {
                warn!("Failed to remove {} after failed plan: {}", dir.display(), e);
            }
        }
    }
}
