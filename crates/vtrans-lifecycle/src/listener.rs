//! Push-notification handling.
//!
//! One decision function owns the ack/nack policy so both delivery paths
//! (the worker's pull loop and the API's push endpoint) settle messages
//! identically, and the policy is testable without a subscription.

use std::sync::Arc;

use tracing::{debug, warn};

use vtrans_pubsub::JobNotification;

use crate::error::LifecycleResult;
use crate::reconcile::{ReconcileOutcome, StatusReconciler};

/// What to do with a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    /// Settle the message.
    Ack,
    /// Return the message for redelivery.
    Nack,
}

/// The ack/nack policy: only a persistence-side failure earns redelivery.
/// Unknown records and stale observations are settled, since redelivering
/// them can never change the answer.
pub fn disposition(outcome: &LifecycleResult<ReconcileOutcome>) -> MessageDisposition {
    match outcome {
        Ok(_) => MessageDisposition::Ack,
        Err(_) => MessageDisposition::Nack,
    }
}

/// Decodes pushed payloads and drives them through the reconciler.
pub struct NotificationHandler {
    reconciler: Arc<StatusReconciler>,
}

impl NotificationHandler {
    pub fn new(reconciler: Arc<StatusReconciler>) -> Self {
        Self { reconciler }
    }

    /// Handle one delivered payload (the base64 `data` of a message).
    /// Never errors: every failure mode resolves to a disposition.
    pub async fn handle(&self, data: &str) -> MessageDisposition {
        let notification = match JobNotification::from_base64(data) {
            Ok(notification) => notification,
            Err(e) => {
                // Redelivery cannot fix a malformed payload; settle it.
                warn!("Discarding undecodable notification: {}", e);
                return MessageDisposition::Ack;
            }
        };

        let Some(job_id) = notification.job_id() else {
            warn!("Discarding notification without a job ID");
            return MessageDisposition::Ack;
        };

        let outcome = self
            .reconciler
            .reconcile(
                &job_id,
                notification.state(),
                notification.job.start_time,
                notification.job.end_time,
            )
            .await;

        match &outcome {
            Ok(ReconcileOutcome::Applied(record)) => {
                debug!("Notification applied: job {} -> {}", job_id, record.status);
            }
            Ok(ReconcileOutcome::Stale(_)) => {
                debug!("Notification for job {} is stale, discarded", job_id);
            }
            Ok(ReconcileOutcome::NotFound) => {
                warn!("Notification for unknown job {}, discarded", job_id);
            }
            Err(e) => {
                warn!(
                    "Reconcile for pushed job {} failed, leaving for redelivery: {}",
                    job_id, e
                );
            }
        }

        disposition(&outcome)
    }
}
