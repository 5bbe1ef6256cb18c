//! Cloud Transcoder API client.
//!
//! Thin REST client for the transcoding engine: create a job for a stored
//! upload and fetch the current state of a job. Authentication goes through
//! the shared token cache in `vtrans-gcp`.

pub mod client;
pub mod error;
pub mod types;

pub use client::{TranscoderClient, TranscoderConfig};
pub use error::{EngineError, EngineResult};
pub use types::{Job, JobHandle, JobView};
