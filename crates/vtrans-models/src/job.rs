//! Transcoding job identifiers and engine-reported states.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::video::VideoStatus;

/// External transcoding job identifier.
///
/// The last path segment of the engine's job resource name. This is the
/// join key between the polling and push observation channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Extract the job ID from a full resource name such as
    /// `projects/p/locations/l/jobs/job-42`. A bare ID passes through.
    /// Returns `None` when the trailing segment is empty.
    pub fn from_resource_name(name: &str) -> Option<Self> {
        let id = name.rsplit('/').next().unwrap_or("");
        if id.is_empty() {
            None
        } else {
            Some(Self(id.to_string()))
        }
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job state as reported by the transcoding engine.
///
/// Unknown wire values deserialize to `ProcessingStateUnspecified` so a
/// new engine state never breaks decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    ProcessingStateUnspecified,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::ProcessingStateUnspecified => "PROCESSING_STATE_UNSPECIFIED",
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        }
    }

    /// Whether the engine guarantees no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// The record status this engine state maps to. An unspecified state
    /// keeps the record in `Processing`.
    pub fn to_video_status(self) -> VideoStatus {
        match self {
            JobState::ProcessingStateUnspecified => VideoStatus::Processing,
            JobState::Pending => VideoStatus::Pending,
            JobState::Running => VideoStatus::Running,
            JobState::Succeeded => VideoStatus::Succeeded,
            JobState::Failed => VideoStatus::Failed,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
