//! Transcoder client error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn job_not_found(msg: impl Into<String>) -> Self {
        Self::JobNotFound(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map an HTTP error status to the matching variant.
    pub fn from_http_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::AuthError(message),
            404 => Self::JobNotFound(message),
            500..=599 => Self::ServerError(status, message),
            _ => Self::RequestFailed(message),
        }
    }

    /// HTTP status this error maps to, when it has one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(403),
            Self::JobNotFound(_) => Some(404),
            Self::ServerError(status, _) => Some(*status),
            _ => None,
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::ServerError(_, _))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_mapping() {
        assert!(matches!(
            EngineError::from_http_status(404, "gone".to_string()),
            EngineError::JobNotFound(_)
        ));
        assert!(matches!(
            EngineError::from_http_status(403, "denied".to_string()),
            EngineError::AuthError(_)
        ));
        assert!(matches!(
            EngineError::from_http_status(503, "down".to_string()),
            EngineError::ServerError(503, _)
        ));
        assert!(matches!(
            EngineError::from_http_status(400, "bad".to_string()),
            EngineError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(EngineError::ServerError(500, "oops".to_string()).is_retryable());
        assert!(!EngineError::JobNotFound("j".to_string()).is_retryable());
        assert!(!EngineError::request_failed("bad request").is_retryable());
    }
}
