//! Lifecycle error types.

use thiserror::Error;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Job creation failed; compensating cleanup already ran.
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Engine error: {0}")]
    Engine(#[from] vtrans_engine::EngineError),

    #[error("Storage error: {0}")]
    Storage(#[from] vtrans_storage::StorageError),

    #[error("Persistence error: {0}")]
    Firestore(#[from] vtrans_firestore::FirestoreError),
}

impl LifecycleError {
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn record_not_found(msg: impl Into<String>) -> Self {
        Self::RecordNotFound(msg.into())
    }
}
