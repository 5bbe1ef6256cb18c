//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Subscriber error: {0}")]
    Pubsub(#[from] vtrans_pubsub::PubsubError),
}
