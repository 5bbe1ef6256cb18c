//! Video record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::job::JobId;

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a video record.
///
/// `Pending`, `Running`, `Succeeded` and `Failed` mirror the states the
/// transcoding engine reports. `Succeeded` and `Failed` are terminal:
/// once recorded they are never overwritten by a late observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Object stored, no transcoding job created yet
    #[default]
    Uploaded,
    /// Job created, engine has not reported a state yet
    Processing,
    /// Engine accepted the job but has not started it
    Pending,
    /// Engine is transcoding
    Running,
    /// Transcoding finished
    Succeeded,
    /// Transcoding failed
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Pending => "pending",
            VideoStatus::Running => "running",
            VideoStatus::Succeeded => "succeeded",
            VideoStatus::Failed => "failed",
        }
    }

    /// Whether the engine guarantees no further transitions from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Succeeded | VideoStatus::Failed)
    }

    /// Parse a stored status string. Unknown values map to `Processing`
    /// so a record written by a newer engine revision still loads.
    pub fn parse(s: &str) -> Self {
        match s {
            "uploaded" => VideoStatus::Uploaded,
            "processing" => VideoStatus::Processing,
            "pending" => VideoStatus::Pending,
            "running" => VideoStatus::Running,
            "succeeded" => VideoStatus::Succeeded,
            "failed" => VideoStatus::Failed,
            _ => VideoStatus::Processing,
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One uploaded asset and its processing lifecycle, stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique identifier, assigned at upload time
    pub id: VideoId,
    /// Public URL of the uploaded object
    pub storage_url: String,
    /// Object key inside the bucket; compensation deletes by this key
    pub storage_key: String,
    /// Current lifecycle status
    #[serde(default)]
    pub status: VideoStatus,
    /// External transcoding job identifier, set at most once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Elapsed transcoding time in seconds, set once on a terminal
    /// observation that carries both timestamps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a freshly uploaded record with `Uploaded` status.
    pub fn new(
        id: VideoId,
        storage_url: impl Into<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            storage_url: storage_url.into(),
            storage_key: storage_key.into(),
            status: VideoStatus::Uploaded,
            job_id: None,
            process_duration_seconds: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the record as submitted to the engine.
    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self.status = VideoStatus::Processing;
        self.updated_at = Utc::now();
        self
    }

    /// Whether the record reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_unique() {
        let a = VideoId::new();
        let b = VideoId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&VideoStatus::Succeeded).unwrap();
        assert_eq!(json, "\"succeeded\"");
        let parsed: VideoStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(parsed, VideoStatus::Running);
    }

    #[test]
    fn test_status_terminal() {
        assert!(VideoStatus::Succeeded.is_terminal());
        assert!(VideoStatus::Failed.is_terminal());
        assert!(!VideoStatus::Uploaded.is_terminal());
        assert!(!VideoStatus::Processing.is_terminal());
        assert!(!VideoStatus::Pending.is_terminal());
        assert!(!VideoStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_parse_unknown_is_processing() {
        assert_eq!(VideoStatus::parse("uploaded"), VideoStatus::Uploaded);
        assert_eq!(VideoStatus::parse("exotic_state"), VideoStatus::Processing);
    }

    #[test]
    fn test_record_creation() {
        let id = VideoId::new();
        let record = VideoRecord::new(
            id.clone(),
            "https://storage.googleapis.com/bucket/abc-cat.mp4",
            "abc-cat.mp4",
        );
        assert_eq!(record.id, id);
        assert_eq!(record.status, VideoStatus::Uploaded);
        assert!(record.job_id.is_none());
        assert!(record.process_duration_seconds.is_none());
    }

    #[test]
    fn test_record_with_job() {
        let record = VideoRecord::new(VideoId::new(), "url", "key")
            .with_job(JobId::from_string("job-42"));
        assert_eq!(record.status, VideoStatus::Processing);
        assert_eq!(record.job_id.as_ref().map(|j| j.as_str()), Some("job-42"));
    }
}
