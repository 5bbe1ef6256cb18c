//! Pub/Sub pull subscriber.
//!
//! The transcoding engine publishes a message per job state change. This
//! crate pulls those messages over the Pub/Sub REST API, decodes the
//! base64 payloads, and settles them (ack, or nack for redelivery).

pub mod client;
pub mod error;
pub mod notification;
pub mod types;

pub use client::{SubscriberClient, SubscriberConfig};
pub use error::{PubsubError, PubsubResult};
pub use notification::JobNotification;
pub use types::{PubsubMessage, ReceivedMessage};
