//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum messages handled concurrently
    pub max_in_flight: usize,
    /// Messages requested per pull
    pub pull_batch: usize,
    /// Backoff when the subscription is empty
    pub idle_backoff: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            pull_batch: 10,
            idle_backoff: Duration::from_millis(2000),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_in_flight: std::env::var("WORKER_MAX_IN_FLIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            pull_batch: std::env::var("WORKER_PULL_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_backoff: Duration::from_millis(
                std::env::var("WORKER_IDLE_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
