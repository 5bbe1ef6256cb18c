//! Shared Google Cloud authentication.
//!
//! Every REST client in the backend (Firestore, Transcoder, Pub/Sub)
//! authenticates with the same service account. This crate owns the
//! credential loading and the token cache so each client only picks a
//! scope.

pub mod error;
pub mod token_cache;

pub use error::{AuthError, AuthResult};
pub use token_cache::{is_token_expiry_response, service_account_provider, TokenCache};

/// OAuth scope for Firestore access via the REST API.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// OAuth scope for Pub/Sub pull subscriptions.
pub const PUBSUB_SCOPE: &str = "https://www.googleapis.com/auth/pubsub";

/// OAuth scope covering the Transcoder API (no narrower scope exists).
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
