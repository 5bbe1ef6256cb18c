//! Video upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use vtrans_models::{JobId, VideoId, VideoRecord};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use crate::validation::sanitize_filename;

/// Successful upload response.
#[derive(Serialize)]
pub struct UploadResponse {
    pub id: VideoId,
    pub url: String,
    pub job_id: JobId,
}

/// `POST /api/upload`
///
/// Accepts a multipart form with the file in a `video` field, stores the
/// object, creates the record and submits the transcoding job. A failed
/// submission has already cleaned up the object and record by the time
/// the error reaches the caller.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("video") {
            continue;
        }

        let filename = sanitize_filename(field.file_name().unwrap_or(""));
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        upload = Some((filename, content_type, data.to_vec()));
        break;
    }

    let Some((filename, content_type, data)) = upload else {
        metrics::record_upload("rejected");
        return Err(ApiError::bad_request("No file uploaded"));
    };

    let video_id = VideoId::new();
    let key = format!("{}-{}", video_id, filename);
    let size = data.len();

    state.storage.upload_bytes(data, &key, &content_type).await?;

    let record = VideoRecord::new(video_id.clone(), state.storage.public_url(&key), &key);
    state.records.create(&record).await?;

    let input_uri = state.storage.object_uri(&key);
    let output_uri = format!("gs://{}/output/{}/", state.storage.bucket(), video_id);

    let job_id = match state
        .submitter
        .submit(&video_id, &input_uri, &output_uri)
        .await
    {
        Ok(job_id) => job_id,
        Err(e) => {
            metrics::record_upload("failed");
            return Err(e.into());
        }
    };

    metrics::record_upload("submitted");
    info!(
        "Upload {} accepted ({} bytes) and submitted as job {}",
        video_id, size, job_id
    );

    Ok(Json(UploadResponse {
        id: video_id,
        url: record.storage_url,
        job_id,
    }))
}
