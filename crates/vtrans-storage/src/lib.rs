//! Object storage for uploaded videos.
//!
//! Speaks the S3 API against a GCS interoperability endpoint (or any
//! S3-compatible store). Owns the key-to-URL mapping: the public URL
//! recorded on upload and the `gs://` URI handed to the transcoder.

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
