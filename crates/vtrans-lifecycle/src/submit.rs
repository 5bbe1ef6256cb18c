//! Job submission with compensating cleanup.

use std::sync::Arc;

use tracing::{error, info, warn};

use vtrans_models::{JobId, VideoId, VideoRecord, VideoStatus};

use crate::error::{LifecycleError, LifecycleResult};
use crate::stores::{ObjectStore, RecordStore, TranscodeEngine};

/// Creates transcoding jobs and unwinds partial state when creation fails.
pub struct JobSubmitter {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    engine: Arc<dyn TranscodeEngine>,
}

impl JobSubmitter {
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        engine: Arc<dyn TranscodeEngine>,
    ) -> Self {
        Self {
            records,
            objects,
            engine,
        }
    }

    /// Submit the uploaded object behind `video_id` to the engine.
    ///
    /// On success the record carries the job ID and `Processing` status.
    /// On any failure past the upload (an engine error, a handle that
    /// names no job, or the assignment write failing) the stored object
    /// and the record are both removed before the error returns, so no
    /// orphaned upload outlives a failed submission. Once the assignment
    /// is persisted the record is never auto-deleted; a job that later
    /// fails becomes a terminal `Failed` record instead.
    pub async fn submit(
        &self,
        video_id: &VideoId,
        input_uri: &str,
        output_uri: &str,
    ) -> LifecycleResult<JobId> {
        let record = self
            .records
            .get(video_id)
            .await?
            .ok_or_else(|| LifecycleError::record_not_found(video_id.as_str()))?;

        if record.status != VideoStatus::Uploaded || record.job_id.is_some() {
            // Not a creation failure; there is nothing to unwind.
            return Err(LifecycleError::submission(format!(
                "Video {} is not awaiting submission (status: {})",
                video_id, record.status
            )));
        }

        let handle = match self
            .engine
            .create_job(video_id, input_uri, output_uri)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Job creation for video {} failed: {}", video_id, e);
                self.compensate(&record).await;
                return Err(LifecycleError::submission(format!(
                    "Job creation failed: {}",
                    e
                )));
            }
        };

        let job_id = match handle.job_id() {
            Some(job_id) => job_id,
            None => {
                // The engine reported success but named no job. Nothing
                // could ever be reconciled against this record.
                warn!(
                    "Engine returned a handle without a job ID for video {}",
                    video_id
                );
                self.compensate(&record).await;
                return Err(LifecycleError::submission("Engine returned no job ID"));
            }
        };

        if let Err(e) = self.records.assign_job(video_id, &job_id).await {
            warn!(
                "Failed to persist job {} for video {}: {}",
                job_id, video_id, e
            );
            self.compensate(&record).await;
            return Err(LifecycleError::submission(format!(
                "Failed to persist job assignment: {}",
                e
            )));
        }

        info!("Submitted video {} as transcoding job {}", video_id, job_id);
        Ok(job_id)
    }

    /// Compensating cleanup: delete the stored object, then the record.
    /// Both deletions are always attempted; a failure is logged for
    /// operator follow-up and never escalated past this point.
    async fn compensate(&self, record: &VideoRecord) {
        if let Err(e) = self.objects.delete(&record.storage_key).await {
            error!(
                "Compensation for video {} failed to delete object {}: {}",
                record.id, record.storage_key, e
            );
        }

        if let Err(e) = self.records.delete(&record.id).await {
            error!(
                "Compensation for video {} failed to delete record: {}",
                record.id, e
            );
        }
    }
}
