use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats::{Aggregate, StatusCounts};
use crate::job::{JobRecord, Status, Step};

pub const BATCH_FILE: &str = "batch.yaml";
pub const BATCH_LOG_FILE: &str = "batch.log";
pub const RUN_FILE: &str = "pipeline.yaml";

/// Lightweight reference from a batch to one of its jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRef {
    pub job_id: String,
    pub source_id: String,
    pub status: Status,
    pub job_yaml: PathBuf,
    pub steps: BTreeMap<Step, Status>,
}

impl JobRef {
    pub fn from_record(record: &JobRecord, job_yaml: PathBuf) -> Self {
        Self {
            job_id: record.job_id.clone(),
            source_id: record.source_id.clone(),
            status: record.status,
            job_yaml,
            steps: record.steps.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_num: u32,
    pub batch_name: String,
    pub pipeline_type: String,
    pub created_at: DateTime<Utc>,
    pub status: Status,
    pub jobs: Vec<JobRef>,
    pub stats: StatusCounts,
}

impl BatchRecord {
    pub fn new(
        batch_num: u32,
        batch_name: impl Into<String>,
        pipeline_type: impl Into<String>,
        jobs: Vec<JobRef>,
    ) -> Self {
        let mut record = Self {
            batch_num,
            batch_name: batch_name.into(),
            pipeline_type: pipeline_type.into(),
            created_at: Utc::now(),
            status: Status::Pending,
            jobs,
            stats: StatusCounts::default(),
        };
        record.recompute_aggregates();
        record
    }

    /// Copies a job's current status and step snapshot into its reference and
    /// recomputes. Returns false if the job is not part of this batch.
    pub fn update_job(&mut self, job: &JobRecord) -> bool {
        let Some(job_ref) = self.jobs.iter_mut().find(|j| j.job_id == job.job_id) else {
            return false;
        };
        job_ref.status = job.status;
        job_ref.steps = job.steps.clone();
        self.recompute_aggregates();
        true
    }
}

impl Aggregate for BatchRecord {
    fn recompute_aggregates(&mut self) {
        self.stats = StatusCounts::tally(self.jobs.iter().map(|j| j.status));
        self.status = self.stats.aggregate_status();
    }

    fn stats(&self) -> &StatusCounts {
        &self.stats
    }
}

/// Reference from a run to one batch directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRef {
    pub batch_num: u32,
    pub path: PathBuf,
    pub job_count: usize,
    pub status: Status,
}

impl BatchRef {
    pub fn batch_file(&self) -> PathBuf {
        self.path.join(BATCH_FILE)
    }
}

/// One planning invocation. Counters are over batches, not jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_name: String,
    pub pipeline_type: String,
    pub created_at: DateTime<Utc>,
    pub batch_size: usize,
    pub total_batches: usize,
    pub total_videos: usize,
    pub status: Status,
    pub batches: Vec<BatchRef>,
    pub stats: StatusCounts,
}

impl RunRecord {
    pub fn new(
        run_name: impl Into<String>,
        pipeline_type: impl Into<String>,
        batch_size: usize,
        batches: Vec<BatchRef>,
    ) -> Self {
        let mut record = Self {
            run_name: run_name.into(),
            pipeline_type: pipeline_type.into(),
            created_at: Utc::now(),
            batch_size,
            total_batches: batches.len(),
            total_videos: batches.iter().map(|b| b.job_count).sum(),
            status: Status::Pending,
            batches,
            stats: StatusCounts::default(),
        };
        record.recompute_aggregates();
        record
    }

    /// Returns false if the batch is not part of this run.
    pub fn update_batch(&mut self, batch: &BatchRecord) -> bool {
        let Some(batch_ref) = self
            .batches
            .iter_mut()
            .find(|b| b.batch_num == batch.batch_num)
        else {
            return false;
        };
        batch_ref.status = batch.status;
        self.recompute_aggregates();
        true
    }
}

impl Aggregate for RunRecord {
    fn recompute_aggregates(&mut self) {
        self.total_batches = self.batches.len();
        self.total_videos = self.batches.iter().map(|b| b.job_count).sum();
        self.stats = StatusCounts::tally(self.batches.iter().map(|b| b.status));
        self.status = self.stats.aggregate_status();
    }

    fn stats(&self) -> &StatusCounts {
        &self.stats
    }
}
