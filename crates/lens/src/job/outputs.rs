use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::Step;
use crate::cache::ArtifactInfo;
use crate::catalog::EntityMatch;
use crate::media::MediaInfo;

/// Results of completed steps, kept on the job so a resumed run can use them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<Insight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_match: Option<EntityMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted: Option<PersistReport>,
}

impl StepOutputs {
    pub fn is_empty(&self) -> bool {
        self.artifact.is_none()
            && self.insight.is_none()
            && self.entity_match.is_none()
            && self.media.is_none()
            && self.persisted.is_none()
    }
}

/// The entity mention an insight-extraction step found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default, alias = "company")]
    pub entity_name: Option<String>,
    #[serde(default, alias = "ticker")]
    pub entity_code: Option<String>,
}

/// What the persistence collaborator reported back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
    pub record_id: String,
    pub operation: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: Step,
    pub message: String,
    pub at: DateTime<Utc>,
}
