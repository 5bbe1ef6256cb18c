//! Pub/Sub push delivery handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::warn;

use vtrans_lifecycle::MessageDisposition;

use crate::metrics;
use crate::state::AppState;

/// Pub/Sub push envelope.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: String,
}

#[derive(Debug, Deserialize)]
pub struct PushMessage {
    /// Base64 payload; absent for empty messages.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(rename = "messageId", default)]
    pub message_id: String,
}

/// `POST /notifications/transcoder`
///
/// Push deliveries are settled with the response status: 204 acks the
/// message, non-2xx makes Pub/Sub redeliver. Payloads that redelivery can
/// never fix (malformed envelopes, messages without data) are logged and
/// acked so they stop arriving.
pub async fn transcoder_push(
    State(state): State<AppState>,
    payload: Result<Json<PushEnvelope>, JsonRejection>,
) -> StatusCode {
    let Json(envelope) = match payload {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Discarding malformed push envelope: {}", e);
            metrics::record_push_message("ack");
            return StatusCode::NO_CONTENT;
        }
    };

    let Some(data) = envelope.message.data else {
        warn!(
            "Push message {} from {} has no data, discarding",
            envelope.message.message_id, envelope.subscription
        );
        metrics::record_push_message("ack");
        return StatusCode::NO_CONTENT;
    };

    match state.notifications.handle(&data).await {
        MessageDisposition::Ack => {
            metrics::record_push_message("ack");
            StatusCode::NO_CONTENT
        }
        MessageDisposition::Nack => {
            metrics::record_push_message("nack");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
