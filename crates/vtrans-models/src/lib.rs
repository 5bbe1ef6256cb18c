//! Shared domain types for the vtrans backend.
//!
//! This crate provides:
//! - Video and job identifiers
//! - Video record and lifecycle status
//! - Engine-reported job states
//! - Two-part timestamps and the transcode duration calculation

pub mod job;
pub mod time;
pub mod video;

pub use job::{JobId, JobState};
pub use time::{transcode_duration, DurationError, TimeOffset};
pub use video::{VideoId, VideoRecord, VideoStatus};
