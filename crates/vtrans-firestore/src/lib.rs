//! Firestore persistence for video records.
//!
//! This crate provides:
//! - REST API client with token caching and retry
//! - Typed Firestore value conversions
//! - Video record repository with conditional (CAS) status updates

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod types;
pub mod video_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use retry::RetryConfig;
pub use video_repo::{VersionedRecord, VideoRepository};
