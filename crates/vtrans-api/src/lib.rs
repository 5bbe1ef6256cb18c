//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart video upload feeding the job submitter
//! - On-demand job status queries through the poll adapter
//! - The Pub/Sub push delivery endpoint
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
