//! Video record repository.
//!
//! One Firestore document per uploaded video, document ID = video ID.
//! Status updates go through a conditional write keyed on the document's
//! `updateTime` so concurrent observers never lose an update.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use vtrans_models::{JobId, VideoId, VideoRecord, VideoStatus};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};

/// Collection holding one document per uploaded video.
pub const VIDEOS_COLLECTION: &str = "videos";

/// A record together with the document version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedRecord {
    pub record: VideoRecord,
    /// Document `updateTime`, passed back as the precondition for a
    /// conditional status update
    pub update_time: Option<String>,
}

/// Repository for video records.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Create the record. Fails when the video ID already exists.
    pub async fn create(&self, record: &VideoRecord) -> FirestoreResult<()> {
        self.client
            .create_document(
                VIDEOS_COLLECTION,
                record.id.as_str(),
                Self::record_fields(record),
            )
            .await?;
        debug!(video_id = %record.id, "Created video record");
        Ok(())
    }

    /// Fetch a record by video ID.
    pub async fn get(&self, id: &VideoId) -> FirestoreResult<Option<VideoRecord>> {
        let doc = self
            .client
            .with_retry("get_video", || {
                self.client.get_document(VIDEOS_COLLECTION, id.as_str())
            })
            .await?;

        doc.map(|d| Self::document_to_record(&d)).transpose()
    }

    /// Look a record up by its transcoding job ID, the join key between
    /// the polling and push channels. Returns the record with the version
    /// it was read at.
    pub async fn find_by_job(&self, job_id: &JobId) -> FirestoreResult<Option<VersionedRecord>> {
        let query = StructuredQuery::field_equals(
            VIDEOS_COLLECTION,
            "job_id",
            job_id.as_str().to_firestore_value(),
            1,
        );

        let docs = self
            .client
            .with_retry("find_by_job", || self.client.run_query("", query.clone()))
            .await?;

        match docs.first() {
            Some(doc) => Ok(Some(VersionedRecord {
                record: Self::document_to_record(doc)?,
                update_time: doc.update_time.clone(),
            })),
            None => Ok(None),
        }
    }

    /// Persist the job assignment: sets `job_id` and flips the status to
    /// `processing` in one write.
    pub async fn assign_job(&self, id: &VideoId, job_id: &JobId) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "job_id".to_string(),
            job_id.as_str().to_firestore_value(),
        );
        fields.insert(
            "status".to_string(),
            VideoStatus::Processing.as_str().to_firestore_value(),
        );
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        let mask = vec![
            "job_id".to_string(),
            "status".to_string(),
            "updated_at".to_string(),
        ];

        self.client
            .update_document(VIDEOS_COLLECTION, id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Conditionally persist a status (and optionally the duration) in a
    /// single write. The write only applies while the document still has
    /// the given `update_time`; a concurrent writer surfaces as
    /// `PreconditionFailed` and the caller re-reads and re-decides.
    pub async fn apply_status(
        &self,
        id: &VideoId,
        update_time: Option<&str>,
        status: VideoStatus,
        duration_seconds: Option<f64>,
    ) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        let mut mask = vec!["status".to_string(), "updated_at".to_string()];

        fields.insert(
            "status".to_string(),
            status.as_str().to_firestore_value(),
        );
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        if let Some(duration) = duration_seconds {
            fields.insert(
                "process_duration_seconds".to_string(),
                duration.to_firestore_value(),
            );
            mask.push("process_duration_seconds".to_string());
        }

        self.client
            .update_document_with_precondition(
                VIDEOS_COLLECTION,
                id.as_str(),
                fields,
                Some(mask),
                update_time,
            )
            .await?;
        Ok(())
    }

    /// Delete the record. Idempotent: deleting a missing record succeeds.
    pub async fn delete(&self, id: &VideoId) -> FirestoreResult<()> {
        self.client
            .delete_document(VIDEOS_COLLECTION, id.as_str())
            .await
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    fn record_fields(record: &VideoRecord) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), record.id.as_str().to_firestore_value());
        fields.insert(
            "storage_url".to_string(),
            record.storage_url.to_firestore_value(),
        );
        fields.insert(
            "storage_key".to_string(),
            record.storage_key.to_firestore_value(),
        );
        fields.insert(
            "status".to_string(),
            record.status.as_str().to_firestore_value(),
        );
        if let Some(job_id) = &record.job_id {
            fields.insert("job_id".to_string(), job_id.as_str().to_firestore_value());
        }
        if let Some(duration) = record.process_duration_seconds {
            fields.insert(
                "process_duration_seconds".to_string(),
                duration.to_firestore_value(),
            );
        }
        fields.insert(
            "created_at".to_string(),
            record.created_at.to_firestore_value(),
        );
        fields.insert(
            "updated_at".to_string(),
            record.updated_at.to_firestore_value(),
        );
        fields
    }

    fn document_to_record(doc: &Document) -> FirestoreResult<VideoRecord> {
        let fields = doc
            .fields
            .as_ref()
            .ok_or_else(|| FirestoreError::invalid_response("Document has no fields"))?;

        let get_string = |name: &str| -> FirestoreResult<String> {
            fields
                .get(name)
                .and_then(String::from_firestore_value)
                .ok_or_else(|| {
                    FirestoreError::invalid_response(format!("Missing field: {}", name))
                })
        };

        let now = Utc::now();
        let timestamp = |name: &str| -> DateTime<Utc> {
            fields
                .get(name)
                .and_then(DateTime::<Utc>::from_firestore_value)
                .unwrap_or(now)
        };

        Ok(VideoRecord {
            id: VideoId::from_string(get_string("id")?),
            storage_url: get_string("storage_url")?,
            storage_key: get_string("storage_key")?,
            status: VideoStatus::parse(&get_string("status")?),
            job_id: fields
                .get("job_id")
                .and_then(String::from_firestore_value)
                .map(JobId::from_string),
            process_duration_seconds: fields
                .get("process_duration_seconds")
                .and_then(f64::from_firestore_value),
            created_at: timestamp("created_at"),
            updated_at: timestamp("updated_at"),
        })
    }
}
