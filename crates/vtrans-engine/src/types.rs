//! Transcoder API wire types.

use serde::{Deserialize, Serialize};

use vtrans_models::{JobId, JobState, TimeOffset};

/// Body for job creation. The template decides the output renditions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub input_uri: String,
    pub output_uri: String,
    pub template_id: String,
}

/// Wire form of a transcoder job resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Full resource name (`projects/.../locations/.../jobs/<id>`).
    #[serde(default)]
    pub name: String,
    /// Absent on jobs the engine has accepted but not yet scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<JobState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobErrorDetail>,
}

impl Job {
    /// Collapse the wire resource into the view consumed by reconciliation.
    pub fn into_view(self) -> JobView {
        JobView {
            state: self.state.unwrap_or(JobState::ProcessingStateUnspecified),
            start_time: self.start_time,
            end_time: self.end_time,
            error_message: self.error.and_then(|e| e.message),
        }
    }
}

/// Failure detail attached to jobs in the `FAILED` state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobErrorDetail {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Handle for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Raw resource name as returned by the engine. Can be empty when the
    /// engine reports success without naming the job.
    pub name: String,
}

impl JobHandle {
    /// The short job ID, when the resource name carries one.
    pub fn job_id(&self) -> Option<JobId> {
        JobId::from_resource_name(&self.name)
    }
}

/// Engine-side view of a job, used by status polling.
#[derive(Debug, Clone)]
pub struct JobView {
    pub state: JobState,
    pub start_time: Option<TimeOffset>,
    pub end_time: Option<TimeOffset>,
    /// Human-readable failure message for failed jobs.
    pub error_message: Option<String>,
}
