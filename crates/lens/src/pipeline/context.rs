use std::path::{Path, PathBuf};

use crate::job::JobRecord;

pub const INPUT_DIR: &str = "input";
pub const RENDERS_DIR: &str = "renders";

/// What a step handler gets to work with. Outputs go into `record.outputs`;
/// the runner owns status changes and saving.
pub struct StepContext<'a> {
    pub record: &'a mut JobRecord,
    pub job_dir: &'a Path,
    pub job_path: &'a Path,
}

impl<'a> StepContext<'a> {
    pub fn new(record: &'a mut JobRecord, job_dir: &'a Path, job_path: &'a Path) -> Self {
        Self {
            record,
            job_dir,
            job_path,
        }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.job_dir.join(INPUT_DIR)
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.job_dir.join(RENDERS_DIR)
    }
}
