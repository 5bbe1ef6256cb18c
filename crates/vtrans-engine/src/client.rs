//! Transcoder REST client.
//!
//! The engine exposes two calls this backend needs: create a job against a
//! template and read a job back. Everything else (template management, ad-hoc
//! job configs) is out of scope here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use reqwest::StatusCode;
use tracing::{info, info_span, Instrument};

use vtrans_gcp::{service_account_provider, TokenCache, CLOUD_PLATFORM_SCOPE};
use vtrans_models::{JobId, VideoId};

use crate::error::{EngineError, EngineResult};
use crate::types::{CreateJobRequest, Job, JobHandle, JobView};

const TRANSCODER_BASE: &str = "https://transcoder.googleapis.com/v1";

// =============================================================================
// Configuration
// =============================================================================

/// Transcoder client configuration.
#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    /// GCP project ID
    pub project_id: String,
    /// Engine location, e.g. "us-central1"
    pub location: String,
    /// Job template applied to every submission
    pub template_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl TranscoderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> EngineResult<Self> {
        let project_id = std::env::var("TRANSCODER_PROJECT_ID")
            .or_else(|_| std::env::var("GCP_PROJECT_ID"))
            .map_err(|_| {
                EngineError::config_error("TRANSCODER_PROJECT_ID or GCP_PROJECT_ID must be set")
            })?;

        if project_id.is_empty() {
            return Err(EngineError::config_error(
                "TRANSCODER_PROJECT_ID or GCP_PROJECT_ID cannot be empty",
            ));
        }

        Ok(Self {
            project_id,
            location: std::env::var("TRANSCODER_LOCATION")
                .unwrap_or_else(|_| "us-central1".to_string()),
            template_id: std::env::var("TRANSCODER_TEMPLATE")
                .unwrap_or_else(|_| "preset/web-hd".to_string()),
            timeout: Duration::from_secs(
                std::env::var("TRANSCODER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("TRANSCODER_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// REST client for the transcoding engine.
pub struct TranscoderClient {
    http: reqwest::Client,
    base_url: String,
    template_id: String,
    token_cache: Arc<TokenCache>,
}

impl Clone for TranscoderClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            template_id: self.template_id.clone(),
            token_cache: Arc::clone(&self.token_cache),
        }
    }
}

impl TranscoderClient {
    /// Create a new transcoder client.
    pub async fn new(config: TranscoderConfig) -> EngineResult<Self> {
        let provider =
            service_account_provider().map_err(|e| EngineError::auth_error(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vtrans-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EngineError::Network)?;

        let base_url = format!(
            "{}/projects/{}/locations/{}",
            TRANSCODER_BASE, config.project_id, config.location
        );

        Ok(Self {
            http,
            base_url,
            template_id: config.template_id,
            token_cache: Arc::new(TokenCache::new(provider, CLOUD_PLATFORM_SCOPE)),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> EngineResult<Self> {
        Self::new(TranscoderConfig::from_env()?).await
    }

    /// Submit a transcoding job for a stored upload. The engine writes
    /// renditions under `output_uri` according to the configured template.
    ///
    /// The returned handle carries whatever resource name the engine gave
    /// back, including an empty one. Deciding what to do about a nameless
    /// job belongs to the submission workflow, not this client.
    pub async fn create_job(
        &self,
        video_id: &VideoId,
        input_uri: &str,
        output_uri: &str,
    ) -> EngineResult<JobHandle> {
        let url = format!("{}/jobs", self.base_url);
        let request = CreateJobRequest {
            input_uri: input_uri.to_string(),
            output_uri: output_uri.to_string(),
            template_id: self.template_id.clone(),
        };

        let job = self
            .execute_request("create_job", async {
                let response = self
                    .send_with_auth_retry(|token| {
                        self.http.post(&url).bearer_auth(token).json(&request)
                    })
                    .await?;

                match response.status() {
                    StatusCode::OK | StatusCode::CREATED => {
                        let job: Job = response.json().await?;
                        Ok(job)
                    }
                    status => Err(Self::handle_error_response(status, &url, response).await),
                }
            })
            .await?;

        info!(
            video_id = %video_id,
            job = %job.name,
            "Created transcoding job"
        );

        Ok(JobHandle { name: job.name })
    }

    /// Fetch the engine's current view of a job.
    pub async fn get_job(&self, job_id: &JobId) -> EngineResult<JobView> {
        let url = format!("{}/jobs/{}", self.base_url, job_id.as_str());

        let job = self
            .execute_request("get_job", async {
                let response = self
                    .send_with_auth_retry(|token| self.http.get(&url).bearer_auth(token))
                    .await?;

                match response.status() {
                    StatusCode::OK => {
                        let job: Job = response.json().await?;
                        Ok(job)
                    }
                    StatusCode::NOT_FOUND => Err(EngineError::job_not_found(job_id.as_str())),
                    status => Err(Self::handle_error_response(status, &url, response).await),
                }
            })
            .await?;

        Ok(job.into_view())
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn get_token(&self) -> EngineResult<String> {
        self.token_cache
            .get_token()
            .await
            .map_err(|e| EngineError::auth_error(e.to_string()))
    }

    /// Send a request, retrying exactly once with a fresh token when the
    /// server reports the cached token as expired.
    async fn send_with_auth_retry<F>(&self, build: F) -> EngineResult<reqwest::Response>
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
            return Err(EngineError::from_http_status(
                StatusCode::UNAUTHORIZED.as_u16(),
                body,
            ));
        }

        self.token_cache.invalidate().await;
        let token = self.get_token().await?;
        Ok(build(&token).send().await?)
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(&self, operation: &'static str, fut: F) -> EngineResult<T>
    where
        F: std::future::Future<Output = EngineResult<T>>,
    {
        let span = info_span!("transcoder_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis();

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        counter!(
            "transcoder_requests_total",
            "operation" => operation,
            "status" => status.to_string()
        )
        .increment(1);
        tracing::debug!(operation, status, latency_ms, "Transcoder request finished");

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> EngineError {
        let body = response.text().await.unwrap_or_default();
        EngineError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

// =============================================================================
// Tests
// =============================================================================
