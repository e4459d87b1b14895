use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outputs::{StepFailure, StepOutputs};
use crate::error::{UnknownStatusError, UnknownStepError};

/// The fixed, ordered set of per-job steps. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Fetch,
    Transcribe,
    ExtractInsight,
    Validate,
    ResolveEntity,
    ExtractMedia,
    PublishArtifact,
    PersistRecord,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::Fetch,
        Step::Transcribe,
        Step::ExtractInsight,
        Step::Validate,
        Step::ResolveEntity,
        Step::ExtractMedia,
        Step::PublishArtifact,
        Step::PersistRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Fetch => "fetch",
            Step::Transcribe => "transcribe",
            Step::ExtractInsight => "extract-insight",
            Step::Validate => "validate",
            Step::ResolveEntity => "resolve-entity",
            Step::ExtractMedia => "extract-media",
            Step::PublishArtifact => "publish-artifact",
            Step::PersistRecord => "persist-record",
        }
    }

    /// Steps whose handler is always provided by the crate and cannot be
    /// replaced by a configured command.
    pub fn is_builtin(&self) -> bool {
        matches!(self, Step::Fetch | Step::ResolveEntity)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = UnknownStepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .iter()
            .copied()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownStepError {
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Pending,
        Status::Processing,
        Status::Completed,
        Status::Failed,
        Status::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Failed => "failed",
            Status::Skipped => "skipped",
        }
    }

    /// Terminal steps are never re-run on resume.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Skipped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatusError {
                name: s.to_string(),
            })
    }
}

/// Overall job status from its step statuses.
pub fn derive_status<'a, I>(statuses: I) -> Status
where
    I: IntoIterator<Item = &'a Status>,
{
    let mut any = false;
    let mut all_pending = true;
    let mut all_terminal = true;
    let mut all_skipped = true;

    for status in statuses {
        any = true;
        if *status == Status::Failed {
            return Status::Failed;
        }
        all_pending &= *status == Status::Pending;
        all_terminal &= status.is_terminal();
        all_skipped &= *status == Status::Skipped;
    }

    if !any || all_pending {
        Status::Pending
    } else if all_skipped {
        Status::Skipped
    } else if all_terminal {
        Status::Completed
    } else {
        Status::Processing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub source_id: String,
    pub batch_no: u32,
    pub batch_name: String,
    pub pipeline_type: String,
    pub created_at: DateTime<Utc>,
    pub status: Status,
    pub steps: BTreeMap<Step, Status>,
    #[serde(default, skip_serializing_if = "StepOutputs::is_empty")]
    pub outputs: StepOutputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<StepFailure>,
}

impl JobRecord {
    pub fn new(
        job_id: impl Into<String>,
        source_id: impl Into<String>,
        batch_no: u32,
        batch_name: impl Into<String>,
        pipeline_type: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            source_id: source_id.into(),
            batch_no,
            batch_name: batch_name.into(),
            pipeline_type: pipeline_type.into(),
            created_at: Utc::now(),
            status: Status::Pending,
            steps: Step::ALL.iter().map(|&s| (s, Status::Pending)).collect(),
            outputs: StepOutputs::default(),
            last_error: None,
        }
    }

    pub fn step_status(&self, step: Step) -> Status {
        self.steps.get(&step).copied().unwrap_or(Status::Pending)
    }

    /// Sets one step and recomputes the overall status.
    pub fn set_status(&mut self, step: Step, status: Status) {
        self.steps.insert(step, status);
        self.status = self.derive_status();
    }

    /// Like [`set_status`](Self::set_status) but takes a step name, rejecting
    /// names outside the fixed step set.
    pub fn set_step_status(&mut self, step_name: &str, status: Status) -> Result<(), UnknownStepError> {
        let step = Step::from_str(step_name)?;
        self.set_status(step, status);
        Ok(())
    }

    pub fn derive_status(&self) -> Status {
        derive_status(self.steps.values())
    }

    /// First step that still needs to run, in step order.
    pub fn next_step(&self) -> Option<Step> {
        Step::ALL
            .iter()
            .copied()
            .find(|&step| !self.step_status(step).is_terminal())
    }

    pub fn record_failure(&mut self, step: Step, message: impl Into<String>) {
        self.set_status(step, Status::Failed);
        self.last_error = Some(StepFailure {
            step,
            message: message.into(),
            at: Utc::now(),
        });
    }
}
