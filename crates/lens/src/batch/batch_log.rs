use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::warn;

use crate::error::StorageError;
use crate::pipeline::{ProgressEvent, ProgressReporter};
use crate::storage::ensure_directory;

/// Plain-text append log, one `[timestamp] message` line per entry.
#[derive(Debug, Clone)]
pub struct BatchLog {
    path: PathBuf,
}

impl BatchLog {
    /// Creates the log file if it doesn't exist; existing lines are kept.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let log = Self::open(path);
        if let Some(parent) = log.path.parent() {
            ensure_directory(parent)?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.path)
            .map_err(|e| StorageError::WriteFile {
                path: log.path.clone(),
                source: e,
            })?;
        Ok(log)
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, message: &str) -> Result<(), StorageError> {
        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            message
        );
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|e| StorageError::WriteFile {
                path: self.path.clone(),
                source: e,
            })
    }
}

impl ProgressReporter for BatchLog {
    fn report(&self, event: ProgressEvent) {
        let message = match event {
            ProgressEvent::StepStarted { job_id, step } => format!("{} {} started", job_id, step),
            ProgressEvent::StepCompleted { job_id, step } => {
                format!("{} {} completed", job_id, step)
            }
            ProgressEvent::StepFailed { job_id, step, error } => {
                format!("{} {} failed: {}", job_id, step, error)
            }
            ProgressEvent::JobFinished { job_id, status } => format!("{} finished: {}", job_id, status),
        };
        if let Err(e) = self.append(&message) {
            warn!("Could not append to batch log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Status, Step};
    use tempfile::TempDir;

    #[test]
    fn test_create_then_append() {
        let temp = TempDir::new().unwrap();
        let log = BatchLog::create(temp.path().join("batch_001/batch.log")).unwrap();
        assert!(log.path().is_file());

        log.append("Batch 1 planned with 2 jobs").unwrap();
        log.report(ProgressEvent::StepFailed {
            job_id: "abc_1234".to_string(),
            step: Step::Transcribe,
            error: "no audio".to_string(),
        });
        log.report(ProgressEvent::JobFinished {
            job_id: "abc_1234".to_string(),
            status: Status::Failed,
        });

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.starts_with('[')));
        assert!(lines[1].ends_with("abc_1234 transcribe failed: no audio"));
        assert!(lines[2].ends_with("abc_1234 finished: failed"));
    }

    #[test]
    fn test_create_keeps_existing_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("batch.log");
        BatchLog::create(&path).unwrap().append("first").unwrap();
        BatchLog::create(&path).unwrap().append("second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_report_failure_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        // A directory cannot be opened for appending.
        let log = BatchLog::open(temp.path());
        log.report(ProgressEvent::StepStarted {
            job_id: "abc_1234".to_string(),
            step: Step::Fetch,
        });
    }
}
