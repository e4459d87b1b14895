use crate::job::{Status, Step};

/// Events emitted while a job's steps run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StepStarted {
        job_id: String,
        step: Step,
    },
    StepCompleted {
        job_id: String,
        step: Step,
    },
    StepFailed {
        job_id: String,
        step: Step,
        error: String,
    },
    JobFinished {
        job_id: String,
        status: Status,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}
