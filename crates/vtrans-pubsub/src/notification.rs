//! Engine notification payloads.
//!
//! The engine publishes one JSON document per job state change, wrapped in
//! base64 by the transport. The same payload arrives on two paths: pulled
//! by the worker, or pushed to the API's delivery endpoint.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use vtrans_models::{JobId, JobState, TimeOffset};

use crate::error::{PubsubError, PubsubResult};

/// Job fields carried in a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedJob {
    /// Full resource name of the job.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<JobState>,
    #[serde(default)]
    pub start_time: Option<TimeOffset>,
    #[serde(default)]
    pub end_time: Option<TimeOffset>,
}

/// A decoded engine notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobNotification {
    pub job: NotifiedJob,
}

impl JobNotification {
    /// Decode from the base64 `data` field of a Pub/Sub message.
    pub fn from_base64(data: &str) -> PubsubResult<Self> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| PubsubError::decode(format!("base64: {}", e)))?;

        serde_json::from_slice(&bytes).map_err(|e| PubsubError::decode(format!("payload: {}", e)))
    }

    /// The job this notification refers to, when the name carries an ID.
    pub fn job_id(&self) -> Option<JobId> {
        JobId::from_resource_name(&self.job.name)
    }

    /// Engine state carried by the notification. Missing states read as
    /// unspecified rather than failing the decode.
    pub fn state(&self) -> JobState {
        self.job
            .state
            .unwrap_or(JobState::ProcessingStateUnspecified)
    }
}
