//! Status reconciliation.
//!
//! Two channels observe the same job: HTTP handlers polling the engine,
//! and the push listener receiving notifications. Both funnel through
//! [`StatusReconciler::reconcile`]. The persisted update is one conditional
//! write keyed on the record version, re-read and re-decided on conflict,
//! so concurrent observers never lose an update and a terminal status is
//! never overwritten by a late non-terminal one.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use vtrans_firestore::FirestoreError;
use vtrans_models::{transcode_duration, JobId, JobState, TimeOffset, VideoRecord, VideoStatus};

use crate::error::LifecycleResult;
use crate::stores::RecordStore;

/// Bounded attempts for the conditional-write loop.
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Base delay between attempts; grows linearly.
const CAS_RETRY_DELAY_MS: u64 = 50;

/// What one reconciliation did.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The observation is reflected in the record (written now, or already
    /// present from an earlier identical observation).
    Applied(VideoRecord),
    /// The observation lost to an already-terminal record; discarded.
    Stale(VideoRecord),
    /// No record joins on this job ID.
    NotFound,
}

/// Pure decision over a (stored, incoming) status pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDecision {
    /// Persist the incoming status.
    Apply,
    /// Stored and incoming agree; write only if a missing duration can
    /// now be filled.
    Unchanged,
    /// Stored status is terminal and the incoming one is not; discard.
    Stale,
}

/// Decide how an incoming status relates to the stored one.
pub fn decide(stored: VideoStatus, incoming: VideoStatus) -> StatusDecision {
    if stored == incoming {
        StatusDecision::Unchanged
    } else if stored.is_terminal() && !incoming.is_terminal() {
        StatusDecision::Stale
    } else {
        StatusDecision::Apply
    }
}

/// Applies engine observations to the persisted record.
pub struct StatusReconciler {
    records: Arc<dyn RecordStore>,
}

impl StatusReconciler {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Reconcile one observation of `job_id` into the record that joins on
    /// it. Idempotent, and safe to call concurrently from both channels.
    pub async fn reconcile(
        &self,
        job_id: &JobId,
        state: JobState,
        start: Option<TimeOffset>,
        end: Option<TimeOffset>,
    ) -> LifecycleResult<ReconcileOutcome> {
        let incoming = state.to_video_status();
        let mut last_error = None;

        for attempt in 0..MAX_CAS_ATTEMPTS {
            let Some(versioned) = self.records.find_by_job(job_id).await? else {
                debug!("No record joins on job {}", job_id);
                return Ok(ReconcileOutcome::NotFound);
            };
            let record = versioned.record;

            let decision = decide(record.status, incoming);
            if decision == StatusDecision::Stale {
                debug!(
                    "Discarding stale observation {} for job {} (stored: {})",
                    incoming, job_id, record.status
                );
                return Ok(ReconcileOutcome::Stale(record));
            }

            let duration = Self::duration_to_fill(&record, incoming, start, end);

            if decision == StatusDecision::Unchanged && duration.is_none() {
                debug!("Observation {} for job {} already applied", incoming, job_id);
                return Ok(ReconcileOutcome::Applied(record));
            }

            match self
                .records
                .apply_status(
                    &record.id,
                    versioned.update_time.as_deref(),
                    incoming,
                    duration,
                )
                .await
            {
                Ok(()) => {
                    if incoming.is_terminal() {
                        info!(
                            "Job {} reached terminal status {} (duration: {:?})",
                            job_id, incoming, duration
                        );
                    } else {
                        debug!("Applied status {} for job {}", incoming, job_id);
                    }

                    let mut updated = record;
                    updated.status = incoming;
                    if duration.is_some() {
                        updated.process_duration_seconds = duration;
                    }
                    return Ok(ReconcileOutcome::Applied(updated));
                }
                Err(e) if e.is_precondition_failed() => {
                    // Another observer wrote first; re-read and re-decide.
                    debug!(
                        "Reconcile precondition failed for job {} (attempt {}), retrying",
                        job_id,
                        attempt + 1
                    );
                    last_error = Some(e);
                    tokio::time::sleep(Duration::from_millis(
                        CAS_RETRY_DELAY_MS * (attempt as u64 + 1),
                    ))
                    .await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            "Reconcile for job {} failed after {} attempts: {:?}",
            job_id, MAX_CAS_ATTEMPTS, last_error
        );
        Err(FirestoreError::request_failed(format!(
            "Conditional status update exhausted {} attempts",
            MAX_CAS_ATTEMPTS
        ))
        .into())
    }

    /// The duration to persist with this write, if any. Only a terminal
    /// observation carrying both timestamps produces one, and only for a
    /// record that does not have its duration yet, so the value is set
    /// exactly once even across duplicate deliveries.
    fn duration_to_fill(
        record: &VideoRecord,
        incoming: VideoStatus,
        start: Option<TimeOffset>,
        end: Option<TimeOffset>,
    ) -> Option<f64> {
        if !incoming.is_terminal() || record.process_duration_seconds.is_some() {
            return None;
        }

        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => return None,
        };

        match transcode_duration(start, end) {
            Ok(seconds) => Some(seconds),
            Err(e) => {
                // Engine state stays authoritative; never persist a bogus
                // duration alongside it.
                warn!(
                    "Terminal observation for video {} has invalid timestamps ({}), applying status without duration",
                    record.id, e
                );
                None
            }
        }
    }
}
