//! Authentication error types.

use thiserror::Error;

/// Errors from service-account authentication.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Service account credentials could not be loaded
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Token fetch or refresh failed with no usable cached token
    #[error("Token fetch failed: {0}")]
    TokenFetch(String),
}

impl AuthError {
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    pub fn token_fetch(msg: impl Into<String>) -> Self {
        Self::TokenFetch(msg.into())
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
