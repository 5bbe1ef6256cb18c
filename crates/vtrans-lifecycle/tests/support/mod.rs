//! In-memory doubles for the collaborator traits, plus a fixture that
//! wires them into the lifecycle services the way the binaries do.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::RwLock;

use vtrans_engine::{EngineError, EngineResult, JobHandle, JobView};
use vtrans_firestore::{FirestoreError, FirestoreResult, VersionedRecord};
use vtrans_lifecycle::{
    JobSubmitter, NotificationHandler, ObjectStore, PollAdapter, RecordStore, StatusReconciler,
    TranscodeEngine,
};
use vtrans_models::{JobId, JobState, TimeOffset, VideoId, VideoRecord, VideoStatus};
use vtrans_storage::{StorageError, StorageResult};

/// Resource name the stub engine hands out by default; its short ID is
/// `job-42`.
pub const JOB_NAME: &str = "projects/itest/locations/us-central1/jobs/job-42";

struct StoredDoc {
    record: VideoRecord,
    version: u64,
}

/// Record store over a map, with the same version-keyed conditional write
/// the real repository performs and flags to inject failures.
pub struct MemoryRecords {
    docs: RwLock<HashMap<String, StoredDoc>>,
    versions: AtomicU64,
    pub fail_assign: AtomicBool,
    pub fail_apply: AtomicBool,
    pub fail_delete: AtomicBool,
    pub apply_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl MemoryRecords {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            docs: RwLock::new(HashMap::new()),
            versions: AtomicU64::new(0),
            fail_assign: AtomicBool::new(false),
            fail_apply: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            apply_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        })
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn stored(&self, id: &VideoId) -> Option<VideoRecord> {
        self.docs
            .read()
            .await
            .get(id.as_str())
            .map(|doc| doc.record.clone())
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn create(&self, record: &VideoRecord) -> FirestoreResult<()> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(record.id.as_str()) {
            return Err(FirestoreError::AlreadyExists(record.id.to_string()));
        }
        docs.insert(
            record.id.to_string(),
            StoredDoc {
                record: record.clone(),
                version: self.next_version(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>> {
        Ok(self.stored(id).await)
    }

    async fn find_by_job(&self, job_id: &JobId) -> FirestoreResult<Option<VersionedRecord>> {
        let docs = self.docs.read().await;
        Ok(docs
            .values()
            .find(|doc| doc.record.job_id.as_ref() == Some(job_id))
            .map(|doc| VersionedRecord {
                record: doc.record.clone(),
                update_time: Some(doc.version.to_string()),
            }))
    }

    async fn assign_job(&self, id: &VideoId, job_id: &JobId) -> FirestoreResult<()> {
        if self.fail_assign.load(Ordering::SeqCst) {
            return Err(FirestoreError::request_failed("injected assign failure"));
        }
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id.as_str())
            .ok_or_else(|| FirestoreError::not_found(id.as_str()))?;
        doc.record.job_id = Some(job_id.clone());
        doc.record.status = VideoStatus::Processing;
        doc.version = self.next_version();
        Ok(())
    }

    async fn apply_status(
        &self,
        id: &VideoId,
        version: Option<&str>,
        status: VideoStatus,
        duration_seconds: Option<f64>,
    ) -> FirestoreResult<()> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(FirestoreError::request_failed("injected write failure"));
        }
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(id.as_str())
            .ok_or_else(|| FirestoreError::not_found(id.as_str()))?;
        if let Some(expected) = version {
            if expected != doc.version.to_string() {
                return Err(FirestoreError::PreconditionFailed(format!(
                    "expected version {expected}, found {}",
                    doc.version
                )));
            }
        }
        doc.record.status = status;
        if duration_seconds.is_some() {
            doc.record.process_duration_seconds = duration_seconds;
        }
        doc.version = self.next_version();
        Ok(())
    }

    async fn delete(&self, id: &VideoId) -> FirestoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(FirestoreError::request_failed("injected delete failure"));
        }
        self.docs.write().await.remove(id.as_str());
        Ok(())
    }
}

/// Object store over a map, with failure injection for deletes.
pub struct MemoryObjects {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    pub fail_delete: AtomicBool,
    pub delete_calls: AtomicUsize,
}

impl MemoryObjects {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: RwLock::new(HashMap::new()),
            fail_delete: AtomicBool::new(false),
            delete_calls: AtomicUsize::new(0),
        })
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::delete_failed("injected delete failure"));
        }
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn object_uri(&self, key: &str) -> String {
        format!("gs://test-bucket/{key}")
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{key}")
    }
}

/// Engine double. Job creation returns the configured resource name, or
/// fails when none is set; polls return the configured view, or a
/// not-found error when none is set.
pub struct StubEngine {
    create_name: RwLock<Option<String>>,
    view: RwLock<Option<JobView>>,
    pub created: AtomicUsize,
}

impl StubEngine {
    pub fn with_job(name: &str) -> Arc<Self> {
        Arc::new(Self {
            create_name: RwLock::new(Some(name.to_string())),
            view: RwLock::new(None),
            created: AtomicUsize::new(0),
        })
    }

    pub async fn set_create_name(&self, name: &str) {
        *self.create_name.write().await = Some(name.to_string());
    }

    pub async fn fail_create(&self) {
        *self.create_name.write().await = None;
    }

    pub async fn set_view(
        &self,
        state: JobState,
        start: Option<TimeOffset>,
        end: Option<TimeOffset>,
    ) {
        *self.view.write().await = Some(JobView {
            state,
            start_time: start,
            end_time: end,
            error_message: None,
        });
    }
}

#[async_trait]
impl TranscodeEngine for StubEngine {
    async fn create_job(
        &self,
        _video_id: &VideoId,
        _input_uri: &str,
        _output_uri: &str,
    ) -> EngineResult<JobHandle> {
        self.created.fetch_add(1, Ordering::SeqCst);
        match &*self.create_name.read().await {
            Some(name) => Ok(JobHandle { name: name.clone() }),
            None => Err(EngineError::ServerError(500, "engine unavailable".into())),
        }
    }

    async fn get_job(&self, job_id: &JobId) -> EngineResult<JobView> {
        match &*self.view.read().await {
            Some(view) => Ok(view.clone()),
            None => Err(EngineError::job_not_found(job_id.as_str())),
        }
    }
}

/// Wrapper that lets a rival write land just before the first conditional
/// status update, forcing the version precondition to fail once.
pub struct ConflictOnFirstWrite {
    inner: Arc<MemoryRecords>,
    rival_status: VideoStatus,
    conflicted: AtomicBool,
}

impl ConflictOnFirstWrite {
    pub fn new(inner: Arc<MemoryRecords>, rival_status: VideoStatus) -> Arc<Self> {
        Arc::new(Self {
            inner,
            rival_status,
            conflicted: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl RecordStore for ConflictOnFirstWrite {
    async fn create(&self, record: &VideoRecord) -> FirestoreResult<()> {
        self.inner.create(record).await
    }

    async fn get(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>> {
        self.inner.get(id).await
    }

    async fn find_by_job(&self, job_id: &JobId) -> FirestoreResult<Option<VersionedRecord>> {
        self.inner.find_by_job(job_id).await
    }

    async fn assign_job(&self, id: &VideoId, job_id: &JobId) -> FirestoreResult<()> {
        self.inner.assign_job(id, job_id).await
    }

    async fn apply_status(
        &self,
        id: &VideoId,
        version: Option<&str>,
        status: VideoStatus,
        duration_seconds: Option<f64>,
    ) -> FirestoreResult<()> {
        if !self.conflicted.swap(true, Ordering::SeqCst) {
            // Unconditional rival write; bumps the version out from under
            // the caller's precondition.
            self.inner
                .apply_status(id, None, self.rival_status, None)
                .await?;
        }
        self.inner
            .apply_status(id, version, status, duration_seconds)
            .await
    }

    async fn delete(&self, id: &VideoId) -> FirestoreResult<()> {
        self.inner.delete(id).await
    }
}

/// The three doubles plus constructors for the services under test.
pub struct Fixture {
    pub records: Arc<MemoryRecords>,
    pub objects: Arc<MemoryObjects>,
    pub engine: Arc<StubEngine>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            records: MemoryRecords::new(),
            objects: MemoryObjects::new(),
            engine: StubEngine::with_job(JOB_NAME),
        }
    }

    pub fn submitter(&self) -> JobSubmitter {
        JobSubmitter::new(
            self.records.clone(),
            self.objects.clone(),
            self.engine.clone(),
        )
    }

    pub fn reconciler(&self) -> Arc<StatusReconciler> {
        Arc::new(StatusReconciler::new(self.records.clone()))
    }

    pub fn poller(&self) -> PollAdapter {
        PollAdapter::new(self.engine.clone(), self.reconciler())
    }

    pub fn handler(&self) -> NotificationHandler {
        NotificationHandler::new(self.reconciler())
    }

    /// Store an object and its freshly uploaded record.
    pub async fn seed_uploaded(&self, id: &str, key: &str) -> VideoId {
        let video_id = VideoId::from(id);
        self.objects
            .put(key, b"test-bytes".to_vec(), "video/mp4")
            .await
            .expect("seed object");
        let record = VideoRecord::new(video_id.clone(), self.objects.public_url(key), key);
        self.records.create(&record).await.expect("seed record");
        video_id
    }

    /// Seed a record that already carries a job assignment.
    pub async fn seed_submitted(&self, id: &str, key: &str, job: &str) -> (VideoId, JobId) {
        let video_id = self.seed_uploaded(id, key).await;
        let job_id = JobId::from(job);
        self.records
            .assign_job(&video_id, &job_id)
            .await
            .expect("seed assignment");
        (video_id, job_id)
    }
}

pub fn encode(raw: &str) -> String {
    BASE64.encode(raw)
}

/// Base64 payload shaped like an engine notification.
pub fn push_payload(
    job_name: &str,
    state: &str,
    start: Option<(i64, i32)>,
    end: Option<(i64, i32)>,
) -> String {
    let mut job = serde_json::json!({ "name": job_name, "state": state });
    if let Some((seconds, nanos)) = start {
        job["startTime"] = serde_json::json!({ "seconds": seconds, "nanos": nanos });
    }
    if let Some((seconds, nanos)) = end {
        job["endTime"] = serde_json::json!({ "seconds": seconds, "nanos": nanos });
    }
    encode(&serde_json::json!({ "job": job }).to_string())
}
