//! Pull-subscription worker.
//!
//! This crate provides:
//! - Batched pulls from the engine's notification subscription
//! - Bounded-concurrency message handling
//! - Ack/nack settlement driven by reconcile outcomes
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod listener;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use listener::PushListener;
