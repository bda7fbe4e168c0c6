//! Preview render handlers.
//!
//! A preview is a regular queued job with `preview_for` set and settings
//! clamped to a single fast front view. Clients poll it by the preview id,
//! not the job id.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use packshot_models::{clamp_for_preview, Job, JobId, JobStatus, ProductRef};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Create preview request body.
#[derive(Debug, Deserialize)]
pub struct CreatePreviewRequest {
    #[serde(default)]
    pub product: Option<ProductRef>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

/// Create preview response.
#[derive(Serialize)]
pub struct CreatePreviewResponse {
    #[serde(rename = "previewId")]
    pub preview_id: String,
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub status: JobStatus,
}

/// POST /api/preview
pub async fn create_preview(
    State(state): State<AppState>,
    Json(request): Json<CreatePreviewRequest>,
) -> ApiResult<Json<CreatePreviewResponse>> {
    let product = request
        .product
        .filter(|p| p.glb_link().is_some())
        .ok_or_else(|| ApiError::bad_request("Product GLB link is required"))?;

    let settings = request
        .settings
        .ok_or_else(|| ApiError::bad_request("Render settings are required"))?;

    let glb_url = product
        .glb_link()
        .map(str::to_string)
        .unwrap_or_default();

    let preview_id = JobId::new_preview();
    let job_id = JobId::new_preview();

    let file_path = state
        .storage
        .write_manifest(&job_id, std::slice::from_ref(&glb_url))
        .await?;

    let mut job = Job::new_preview(
        vec![product],
        clamp_for_preview(&settings),
        file_path,
        vec![glb_url],
        preview_id.as_str(),
    );
    job.id = job_id;

    let response = CreatePreviewResponse {
        preview_id: preview_id.to_string(),
        job_id: job.id.to_string(),
        status: job.status,
    };
    state.store.put(job);

    metrics::record_job_enqueued(true);
    metrics::set_queue_depth(state.store.queued_len());
    info!(preview_id = %response.preview_id, job_id = %response.job_id, "Preview job submitted");

    Ok(Json(response))
}

/// Preview status response.
#[derive(Serialize)]
pub struct PreviewStatusResponse {
    pub status: JobStatus,
    pub progress: u8,
    #[serde(rename = "previewUrl", skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// GET /api/preview/:preview_id/status
///
/// Resolves by the preview id via the secondary index. A completed job is
/// reported with synthetic full progress and the artifact aliased as
/// `previewUrl`.
pub async fn get_preview_status(
    State(state): State<AppState>,
    Path(preview_id): Path<String>,
) -> ApiResult<Json<PreviewStatusResponse>> {
    let job = state
        .store
        .find_by_preview_id(&preview_id)
        .ok_or_else(|| ApiError::not_found("Preview job not found"))?;

    let response = if job.status == JobStatus::Completed {
        PreviewStatusResponse {
            status: job.status,
            progress: 100,
            preview_url: job.download_url,
        }
    } else {
        PreviewStatusResponse {
            status: job.status,
            progress: job.progress,
            preview_url: None,
        }
    };

    Ok(Json(response))
}
