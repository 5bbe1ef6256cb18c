//! Job status handler.

use axum::extract::{Path, State};
use axum::Json;

use vtrans_lifecycle::StatusSnapshot;
use vtrans_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::is_valid_job_id;

/// `GET /api/jobs/{job_id}/status`
///
/// Queries the engine for the job's current state, reconciles it into the
/// record and returns the stored view. The snapshot carries whether this
/// poll's observation was applied or discarded as stale.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusSnapshot>> {
    if !is_valid_job_id(&job_id) {
        return Err(ApiError::validation("Invalid job ID"));
    }

    let snapshot = state.poller.poll(&JobId::from_string(job_id)).await?;
    Ok(Json(snapshot))
}
