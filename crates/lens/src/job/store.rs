use std::path::{Path, PathBuf};

use tracing::warn;

use super::record::{JobRecord, Status, Step};
use crate::error::{InvalidInputError, StorageError, UnknownStepError};
use crate::sanitize::check_path_component;
use crate::storage;

pub const JOB_FILE: &str = "job.yaml";

/// `<source_id>_<4 hex chars>`; the suffix keeps re-planned runs from colliding.
pub fn generate_job_id(source_id: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", source_id, &suffix[..4])
}

/// Creates, loads, and atomically saves job records under one jobs directory.
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs_directory: PathBuf,
}

impl JobStore {
    pub fn new(jobs_directory: impl Into<PathBuf>) -> Self {
        Self {
            jobs_directory: jobs_directory.into(),
        }
    }

    pub fn jobs_directory(&self) -> &Path {
        &self.jobs_directory
    }

    /// Working directory of a job: `<jobs_directory>/<job_id>`.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.jobs_directory.join(job_id)
    }

    pub fn job_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(JOB_FILE)
    }

    /// Builds a fresh record with every step pending. Nothing is written.
    pub fn create(
        &self,
        source_id: &str,
        batch_no: u32,
        batch_name: &str,
        pipeline_type: &str,
    ) -> Result<JobRecord, InvalidInputError> {
        check_path_component(source_id).map_err(|reason| InvalidInputError::InvalidSourceId {
            id: source_id.to_string(),
            reason,
        })?;

        Ok(JobRecord::new(
            generate_job_id(source_id),
            source_id,
            batch_no,
            batch_name,
            pipeline_type,
        ))
    }

    /// Loads a record, rejecting any whose step map does not cover the full step set.
    pub fn load(&self, path: &Path) -> Result<JobRecord, StorageError> {
        let mut record: JobRecord = storage::load_yaml(path)?;

        let missing: Vec<&str> = Step::ALL
            .iter()
            .filter(|step| !record.steps.contains_key(step))
            .map(|step| step.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(StorageError::IncompleteSteps {
                path: path.to_path_buf(),
                missing: missing.join(", "),
            });
        }

        let derived = record.derive_status();
        if record.status != derived {
            warn!(
                "Job {} stored status {} disagrees with its steps, using {}",
                record.job_id, record.status, derived
            );
            record.status = derived;
        }

        Ok(record)
    }

    pub fn save(&self, record: &JobRecord, path: &Path) -> Result<(), StorageError> {
        storage::save_yaml(path, record)
    }

    /// Saves to the record's canonical location and returns that path.
    pub fn save_new(&self, record: &JobRecord) -> Result<PathBuf, StorageError> {
        let path = self.job_path(&record.job_id);
        self.save(record, &path)?;
        Ok(path)
    }

    pub fn set_step_status(
        &self,
        record: &mut JobRecord,
        step_name: &str,
        status: Status,
    ) -> Result<(), UnknownStepError> {
        record.set_step_status(step_name, status)
    }
}
