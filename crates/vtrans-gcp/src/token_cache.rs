//! Access token caching for Google Cloud REST clients.
//!
//! Thread-safe, async-aware cache with:
//! - Refresh margin so a token never expires mid-request
//! - Single-flight refresh to prevent a thundering herd
//! - Graceful fallback to a still-usable token when refresh fails

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};

/// Refresh the token this long before its actual expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative TTL when the provider reports no expiry. OAuth tokens
/// are typically valid for 60 minutes.
const DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// Whether an UNAUTHORIZED response body indicates an expired access
/// token (as opposed to a genuinely rejected request). Shared by every
/// REST client's invalidate-and-retry-once path.
pub fn is_token_expiry_response(body: &str) -> bool {
    body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
}

/// Load the service account named by `GOOGLE_APPLICATION_CREDENTIALS`.
pub fn service_account_provider() -> AuthResult<Arc<dyn TokenProvider>> {
    let service_account = CustomServiceAccount::from_env()
        .map_err(|e| AuthError::credentials(format!("Failed to load service account: {}", e)))?;

    match service_account {
        Some(sa) => Ok(Arc::new(sa)),
        None => Err(AuthError::credentials(
            "GOOGLE_APPLICATION_CREDENTIALS not set. \
             Set it to the path of your service account JSON file.",
        )),
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Thread-safe token cache with single-flight refresh, bound to one
/// OAuth scope.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    scope: &'static str,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Create a cache over `provider` for the given scope.
    pub fn new(provider: Arc<dyn TokenProvider>, scope: &'static str) -> Self {
        Self {
            provider,
            scope,
            cached: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call fetches a fresh one.
    /// Used after a 401 that indicates server-side invalidation.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// Fast path returns the cached token under a read lock. The slow
    /// path takes the write lock, double-checks (another task may have
    /// refreshed while we waited) and then refreshes.
    pub async fn get_token(&self) -> AuthResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_fresh() {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh() {
                return Ok(token.access_token.clone());
            }
        }

        self.refresh(&mut cached).await
    }

    async fn refresh(&self, cached: &mut Option<CachedToken>) -> AuthResult<String> {
        match self.provider.token(&[self.scope]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();

                // Prefer the real expiry, fall back to the conservative default.
                let expires_at = {
                    let now = Utc::now();
                    let exp = token.expires_at();

                    if exp > now {
                        match (exp - now).to_std() {
                            Ok(ttl) => Instant::now() + ttl,
                            Err(_) => Instant::now() + DEFAULT_TTL,
                        }
                    } else {
                        // Already expired: force a refresh on the next request.
                        Instant::now()
                    }
                };

                *cached = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });

                debug!(scope = self.scope, "Refreshed Google Cloud auth token");
                Ok(access_token)
            }
            Err(e) => {
                if let Some(token) = cached.as_ref() {
                    if token.is_usable() {
                        warn!("Token refresh failed, using existing token: {}", e);
                        return Ok(token.access_token.clone());
                    }
                }

                Err(AuthError::token_fetch(format!(
                    "Failed to obtain auth token: {}",
                    e
                )))
            }
        }
    }
}
