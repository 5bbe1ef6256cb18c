//! Firestore error types.

use thiserror::Error;

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Authentication error
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Document already exists
    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Optimistic concurrency precondition failed
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Rate limited by the server
    #[error("Rate limited, retry after {0} ms")]
    RateLimited(u64),

    /// Server-side error (5xx)
    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    /// Request failed for another reason
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an HTTP status code to the matching error variant.
    pub fn from_http_status(status: u16, msg: String) -> Self {
        match status {
            403 => Self::PermissionDenied(msg),
            404 => Self::NotFound(msg),
            409 => Self::AlreadyExists(msg),
            412 => Self::PreconditionFailed(msg),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// The HTTP status this error corresponds to, when known.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) => Some(409),
            Self::PreconditionFailed(_) => Some(412),
            Self::RateLimited(_) => Some(429),
            Self::ServerError(status, _) => Some(*status),
            _ => None,
        }
    }

    /// Server-suggested wait before retrying, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Whether retrying the same request can help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited(_) | Self::ServerError(_, _)
        )
    }

    /// Whether this is an optimistic concurrency conflict. Firestore can
    /// also report these as FAILED_PRECONDITION inside a 400 body.
    pub fn is_precondition_failed(&self) -> bool {
        match self {
            Self::PreconditionFailed(_) => true,
            Self::RequestFailed(msg) => msg.contains("FAILED_PRECONDITION"),
            _ => false,
        }
    }
}

/// Result type for Firestore operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;
