//! Test harness for isolated planning and execution.
//!
//! `TestHarness` owns a temp directory with separate jobs, runs, and cache
//! roots, and offers shortcuts for planning runs and reading their records.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use lens::batch::BatchRef;
use lens::storage;
use lens::{BatchPlanner, BatchRecord, DownloadCache, JobRecord, JobStore, RunRecord};

pub struct TestHarness {
    temp_dir: TempDir,
    pub jobs_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        Self {
            jobs_dir: base.join("jobs"),
            runs_dir: base.join("runs"),
            cache_dir: base.join("cache"),
            temp_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn store(&self) -> JobStore {
        JobStore::new(&self.jobs_dir)
    }

    pub fn planner(&self) -> BatchPlanner {
        BatchPlanner::new(&self.runs_dir, self.store())
    }

    pub fn cache(&self) -> DownloadCache {
        DownloadCache::new(&self.cache_dir)
    }

    /// `count` distinct, valid 11-character source ids.
    pub fn source_ids(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("vid{:08}", i)).collect()
    }

    pub fn plan(&self, count: usize, batch_size: usize, run_name: &str) -> RunRecord {
        self.plan_ids(&Self::source_ids(count), batch_size, run_name)
    }

    pub fn plan_ids(&self, ids: &[String], batch_size: usize, run_name: &str) -> RunRecord {
        self.planner()
            .plan(ids, batch_size, run_name, "audio-only")
            .expect("Failed to plan run")
    }

    pub fn run_dir(&self, run_name: &str) -> PathBuf {
        self.runs_dir.join(run_name)
    }

    pub fn load_batch(&self, batch: &BatchRef) -> BatchRecord {
        storage::load_yaml(&batch.batch_file()).expect("Failed to load batch")
    }

    /// Job file paths of every batch, in batch then job order.
    pub fn job_paths(&self, run: &RunRecord) -> Vec<PathBuf> {
        run.batches
            .iter()
            .flat_map(|b| self.load_batch(b).jobs.into_iter().map(|j| j.job_yaml))
            .collect()
    }

    pub fn load_job(&self, path: &Path) -> JobRecord {
        self.store().load(path).expect("Failed to load job")
    }

    pub fn write_file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }
}
