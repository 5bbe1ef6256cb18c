//! On-demand status polling.

use std::sync::Arc;

use serde::Serialize;

use vtrans_models::{JobId, VideoId, VideoRecord, VideoStatus};

use crate::error::{LifecycleError, LifecycleResult};
use crate::reconcile::{ReconcileOutcome, StatusReconciler};
use crate::stores::TranscodeEngine;

/// How a poll's observation related to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileDisposition {
    Applied,
    Stale,
}

/// Post-reconcile view returned to status queries.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub video_id: VideoId,
    pub job_id: JobId,
    pub status: VideoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_duration_seconds: Option<f64>,
    /// Whether this poll's observation was applied or discarded as stale.
    pub reconcile: ReconcileDisposition,
}

impl StatusSnapshot {
    fn of(record: VideoRecord, job_id: JobId, reconcile: ReconcileDisposition) -> Self {
        Self {
            video_id: record.id,
            job_id,
            status: record.status,
            process_duration_seconds: record.process_duration_seconds,
            reconcile,
        }
    }
}

/// Fetches engine state on demand and runs it through the reconciler.
pub struct PollAdapter {
    engine: Arc<dyn TranscodeEngine>,
    reconciler: Arc<StatusReconciler>,
}

impl PollAdapter {
    pub fn new(engine: Arc<dyn TranscodeEngine>, reconciler: Arc<StatusReconciler>) -> Self {
        Self { engine, reconciler }
    }

    /// Query the engine for `job_id` and reconcile the observation.
    ///
    /// Engine fetch failures surface unchanged. A job no record joins on
    /// is a not-found error. A stale observation still returns the stored
    /// record, tagged so callers can tell the observation was discarded.
    pub async fn poll(&self, job_id: &JobId) -> LifecycleResult<StatusSnapshot> {
        let view = self.engine.get_job(job_id).await?;

        let outcome = self
            .reconciler
            .reconcile(job_id, view.state, view.start_time, view.end_time)
            .await?;

        match outcome {
            ReconcileOutcome::Applied(record) => Ok(StatusSnapshot::of(
                record,
                job_id.clone(),
                ReconcileDisposition::Applied,
            )),
            ReconcileOutcome::Stale(record) => Ok(StatusSnapshot::of(
                record,
                job_id.clone(),
                ReconcileDisposition::Stale,
            )),
            ReconcileOutcome::NotFound => Err(LifecycleError::record_not_found(format!(
                "No video joins on job {}",
                job_id
            ))),
        }
    }
}
