//! Application state.

use std::sync::Arc;

use vtrans_engine::TranscoderClient;
use vtrans_firestore::{FirestoreClient, VideoRepository};
use vtrans_lifecycle::{JobSubmitter, NotificationHandler, PollAdapter, StatusReconciler};
use vtrans_storage::StorageClient;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<StorageClient>,
    pub firestore: Arc<FirestoreClient>,
    pub records: Arc<VideoRepository>,
    pub submitter: Arc<JobSubmitter>,
    pub poller: Arc<PollAdapter>,
    pub notifications: Arc<NotificationHandler>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = Arc::new(StorageClient::from_env().await?);
        let firestore = Arc::new(FirestoreClient::from_env().await?);
        let engine = Arc::new(TranscoderClient::from_env().await?);

        let records = Arc::new(VideoRepository::new((*firestore).clone()));
        let reconciler = Arc::new(StatusReconciler::new(records.clone()));

        let submitter = Arc::new(JobSubmitter::new(
            records.clone(),
            storage.clone(),
            engine.clone(),
        ));
        let poller = Arc::new(PollAdapter::new(engine, reconciler.clone()));
        let notifications = Arc::new(NotificationHandler::new(reconciler));

        Ok(Self {
            config,
            storage,
            firestore,
            records,
            submitter,
            poller,
            notifications,
        })
    }
}
