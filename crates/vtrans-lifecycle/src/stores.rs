//! Collaborator traits and adapters over the concrete clients.
//!
//! The lifecycle workflows only see these traits. Production wires in the
//! storage, Firestore and engine clients through the impls below; scenario
//! tests substitute in-memory doubles.

use async_trait::async_trait;

use vtrans_engine::{EngineResult, JobHandle, JobView, TranscoderClient};
use vtrans_firestore::{FirestoreResult, VersionedRecord, VideoRepository};
use vtrans_models::{JobId, VideoId, VideoRecord, VideoStatus};
use vtrans_storage::{StorageClient, StorageResult};

/// Object storage operations the lifecycle needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Idempotent delete.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// `gs://` URI handed to the engine.
    fn object_uri(&self, key: &str) -> String;

    /// Public URL stored on the record.
    fn public_url(&self, key: &str) -> String;
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.upload_bytes(data, key, content_type).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_object(key).await
    }

    fn object_uri(&self, key: &str) -> String {
        StorageClient::object_uri(self, key)
    }

    fn public_url(&self, key: &str) -> String {
        StorageClient::public_url(self, key)
    }
}

/// Record persistence operations the lifecycle needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, record: &VideoRecord) -> FirestoreResult<()>;

    async fn get(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>>;

    /// Lookup by the engine's job ID, the join key between the two
    /// observation channels. Returns the record plus its version.
    async fn find_by_job(&self, job_id: &JobId) -> FirestoreResult<Option<VersionedRecord>>;

    /// Persist the job assignment and flip the record to `Processing`.
    async fn assign_job(&self, id: &VideoId, job_id: &JobId) -> FirestoreResult<()>;

    /// Single conditional write: the status (and optionally the duration)
    /// apply only while the record still carries `version`.
    async fn apply_status(
        &self,
        id: &VideoId,
        version: Option<&str>,
        status: VideoStatus,
        duration_seconds: Option<f64>,
    ) -> FirestoreResult<()>;

    /// Idempotent delete.
    async fn delete(&self, id: &VideoId) -> FirestoreResult<()>;
}

#[async_trait]
impl RecordStore for VideoRepository {
    async fn create(&self, record: &VideoRecord) -> FirestoreResult<()> {
        VideoRepository::create(self, record).await
    }

    async fn get(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>> {
        VideoRepository::get(self, id).await
    }

    async fn find_by_job(&self, job_id: &JobId) -> FirestoreResult<Option<VersionedRecord>> {
        VideoRepository::find_by_job(self, job_id).await
    }

    async fn assign_job(&self, id: &VideoId, job_id: &JobId) -> FirestoreResult<()> {
        VideoRepository::assign_job(self, id, job_id).await
    }

    async fn apply_status(
        &self,
        id: &VideoId,
        version: Option<&str>,
        status: VideoStatus,
        duration_seconds: Option<f64>,
    ) -> FirestoreResult<()> {
        VideoRepository::apply_status(self, id, version, status, duration_seconds).await
    }

    async fn delete(&self, id: &VideoId) -> FirestoreResult<()> {
        VideoRepository::delete(self, id).await
    }
}

/// Engine operations the lifecycle needs.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    async fn create_job(
        &self,
        video_id: &VideoId,
        input_uri: &str,
        output_uri: &str,
    ) -> EngineResult<JobHandle>;

    async fn get_job(&self, job_id: &JobId) -> EngineResult<JobView>;
}

#[async_trait]
impl TranscodeEngine for TranscoderClient {
    async fn create_job(
        &self,
        video_id: &VideoId,
        input_uri: &str,
        output_uri: &str,
    ) -> EngineResult<JobHandle> {
        TranscoderClient::create_job(self, video_id, input_uri, output_uri).await
    }

    async fn get_job(&self, job_id: &JobId) -> EngineResult<JobView> {
        TranscoderClient::get_job(self, job_id).await
    }
}
