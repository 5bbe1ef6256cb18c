//! Pub/Sub REST subscriber client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use vtrans_gcp::{service_account_provider, TokenCache, PUBSUB_SCOPE};

use crate::error::{PubsubError, PubsubResult};
use crate::types::{
    AcknowledgeRequest, ModifyAckDeadlineRequest, PullRequest, PullResponse, ReceivedMessage,
};

const PUBSUB_BASE: &str = "https://pubsub.googleapis.com/v1";

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// GCP project ID
    pub project_id: String,
    /// Short subscription name within the project
    pub subscription: String,
    /// Request timeout. Pull requests are held open server-side while the
    /// subscription is idle, so this stays well above the connect timeout.
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl SubscriberConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PubsubResult<Self> {
        let project_id = std::env::var("PUBSUB_PROJECT_ID")
            .or_else(|_| std::env::var("GCP_PROJECT_ID"))
            .map_err(|_| {
                PubsubError::config_error("PUBSUB_PROJECT_ID or GCP_PROJECT_ID must be set")
            })?;

        if project_id.is_empty() {
            return Err(PubsubError::config_error(
                "PUBSUB_PROJECT_ID or GCP_PROJECT_ID cannot be empty",
            ));
        }

        Ok(Self {
            project_id,
            subscription: std::env::var("PUBSUB_SUBSCRIPTION")
                .unwrap_or_else(|_| "transcoder-events-sub".to_string()),
            timeout: Duration::from_secs(
                std::env::var("PUBSUB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(90),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("PUBSUB_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }
}

/// REST client for one pull subscription.
pub struct SubscriberClient {
    http: reqwest::Client,
    subscription_path: String,
    token_cache: Arc<TokenCache>,
}

impl Clone for SubscriberClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            subscription_path: self.subscription_path.clone(),
            token_cache: Arc::clone(&self.token_cache),
        }
    }
}

impl SubscriberClient {
    /// Create a new subscriber client.
    pub async fn new(config: SubscriberConfig) -> PubsubResult<Self> {
        let provider =
            service_account_provider().map_err(|e| PubsubError::auth_error(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vtrans-pubsub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PubsubError::Network)?;

        let subscription_path = format!(
            "projects/{}/subscriptions/{}",
            config.project_id, config.subscription
        );

        Ok(Self {
            http,
            subscription_path,
            token_cache: Arc::new(TokenCache::new(provider, PUBSUB_SCOPE)),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> PubsubResult<Self> {
        Self::new(SubscriberConfig::from_env()?).await
    }

    /// Full resource path of the subscription.
    pub fn subscription_path(&self) -> &str {
        &self.subscription_path
    }

    /// Pull up to `max_messages` leased messages.
    pub async fn pull(&self, max_messages: u32) -> PubsubResult<Vec<ReceivedMessage>> {
        let url = format!("{}/{}:pull", PUBSUB_BASE, self.subscription_path);
        let request = PullRequest { max_messages };

        let response = self
            .send_with_auth_retry(|token| self.http.post(&url).bearer_auth(token).json(&request))
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Self::handle_error_response(&url, response).await);
        }

        let pulled: PullResponse = response.json().await?;
        if !pulled.received_messages.is_empty() {
            debug!(
                "Pulled {} messages from {}",
                pulled.received_messages.len(),
                self.subscription_path
            );
        }

        Ok(pulled.received_messages)
    }

    /// Acknowledge settled messages. A no-op for an empty batch.
    pub async fn acknowledge(&self, ack_ids: &[String]) -> PubsubResult<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }

        let url = format!("{}/{}:acknowledge", PUBSUB_BASE, self.subscription_path);
        let request = AcknowledgeRequest {
            ack_ids: ack_ids.to_vec(),
        };

        let response = self
            .send_with_auth_retry(|token| self.http.post(&url).bearer_auth(token).json(&request))
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(&url, response).await);
        }

        debug!("Acknowledged {} messages", ack_ids.len());
        Ok(())
    }

    /// Return messages to the subscription for redelivery by zeroing their
    /// ack deadline. A no-op for an empty batch.
    pub async fn nack(&self, ack_ids: &[String]) -> PubsubResult<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/{}:modifyAckDeadline",
            PUBSUB_BASE, self.subscription_path
        );
        let request = ModifyAckDeadlineRequest {
            ack_ids: ack_ids.to_vec(),
            ack_deadline_seconds: 0,
        };

        let response = self
            .send_with_auth_retry(|token| self.http.post(&url).bearer_auth(token).json(&request))
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(&url, response).await);
        }

        debug!("Nacked {} messages for redelivery", ack_ids.len());
        Ok(())
    }

    async fn get_token(&self) -> PubsubResult<String> {
        self.token_cache
            .get_token()
            .await
            .map_err(|e| PubsubError::auth_error(e.to_string()))
    }

    /// Send a request, retrying exactly once with a fresh token when the
    /// server reports the cached token as expired.
    async fn send_with_auth_retry<F>(&self, build: F) -> PubsubResult<reqwest::Response>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let token = self.get_token().await?;
        let response = build(&token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !vtrans_gcp::is_token_expiry_response(&body) {
            return Err(PubsubError::from_http_status(
                StatusCode::UNAUTHORIZED.as_u16(),
                body,
            ));
        }

        self.token_cache.invalidate().await;
        let token = self.get_token().await?;
        Ok(build(&token).send().await?)
    }

    async fn handle_error_response(url: &str, response: reqwest::Response) -> PubsubError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        PubsubError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}
