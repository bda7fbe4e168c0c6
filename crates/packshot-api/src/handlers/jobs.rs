//! Render job handlers: enqueue, list, dispatch, status and result upload.

use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use packshot_models::{Job, JobId, JobStatus, ProductRef};
use packshot_store::StatusUpdate;

use crate::auth::WorkerAuth;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

// ============================================================================
// Enqueue
// ============================================================================

/// Submit job request body.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub products: Vec<ProductRef>,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
}

/// Submit job response.
#[derive(Serialize)]
pub struct SubmitJobResponse {
    pub job: Job,
    pub message: String,
}

/// POST /api/jobs
///
/// Validates the batch, writes the input manifest, then stores the queued
/// job. The manifest write happens first: a job must never be dispatchable
/// before its manifest exists.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<Json<SubmitJobResponse>> {
    if request.products.is_empty() {
        return Err(ApiError::bad_request("Products array is required"));
    }

    let settings = request
        .settings
        .ok_or_else(|| ApiError::bad_request("Render settings are required"))?;

    let missing: Vec<&str> = request
        .products
        .iter()
        .filter(|p| p.glb_link().is_none())
        .map(ProductRef::label)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Some products are missing GLB files: {}",
            missing.join(", ")
        )));
    }

    let glb_urls: Vec<String> = request
        .products
        .iter()
        .filter_map(|p| p.glb_link().map(str::to_string))
        .collect();

    let job_id = JobId::new();
    let file_path = state.storage.write_manifest(&job_id, &glb_urls).await?;

    let mut job = Job::new(request.products, settings, file_path, glb_urls);
    job.id = job_id;
    state.store.put(job.clone());

    metrics::record_job_enqueued(false);
    metrics::set_queue_depth(state.store.queued_len());
    info!(job_id = %job.id, products = job.products.len(), "Render job submitted");

    Ok(Json(SubmitJobResponse {
        job,
        message: "Render job submitted successfully".to_string(),
    }))
}

// ============================================================================
// List
// ============================================================================

/// Jobs list response.
#[derive(Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
}

/// GET /api/jobs
///
/// All jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Json<ListJobsResponse> {
    let mut jobs = state.store.list();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(ListJobsResponse { jobs })
}

// ============================================================================
// Dispatch
// ============================================================================

/// Dispatch response handed to a polling render worker.
///
/// The manifest reference is duplicated across the legacy `file_path` key and
/// the `glb_urls` array, and the settings across `options` and `settings`,
/// for backward-compatible worker consumption.
#[derive(Serialize)]
pub struct DispatchResponse {
    pub job_id: String,
    pub file_path: String,
    pub glb_urls: Vec<String>,
    pub options: serde_json::Value,
    pub settings: serde_json::Value,
}

/// GET /api/jobs/next
///
/// Atomically claims the oldest queued job for the polling worker. An empty
/// queue is a normal outcome: responds `{"status":"no_jobs"}`, not an error.
pub async fn claim_next_job(
    State(state): State<AppState>,
    _auth: WorkerAuth,
) -> ApiResult<Response> {
    let Some(job) = state.store.claim_next() else {
        return Ok(Json(serde_json::json!({ "status": "no_jobs" })).into_response());
    };

    metrics::record_job_dispatched();
    metrics::set_queue_depth(state.store.queued_len());
    info!(job_id = %job.id, "Dispatched job to render worker");

    Ok(Json(DispatchResponse {
        job_id: job.id.to_string(),
        file_path: job.file_path,
        glb_urls: job.glb_urls,
        options: job.settings.clone(),
        settings: job.settings,
    })
    .into_response())
}

// ============================================================================
// Status
// ============================================================================

/// PUT /api/jobs/:job_id/status
///
/// Partial worker update: only provided fields are applied. The server
/// trusts the worker's state reports fully.
pub async fn update_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    _auth: WorkerAuth,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<serde_json::Value>> {
    let job = state
        .store
        .apply_update(&JobId::from_string(job_id), &update)?;

    match update.status {
        Some(JobStatus::Completed) => metrics::record_job_completed(),
        Some(JobStatus::Failed) => {
            warn!(job_id = %job.id, "Worker reported job failure");
            metrics::record_job_failed();
        }
        _ => {}
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Job status response for client polling.
#[derive(Serialize)]
pub struct JobStatusResponse {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(rename = "downloadUrl", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub settings: serde_json::Value,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// GET /api/jobs/:job_id/status
///
/// Read-only projection for client polling; no mutation.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state
        .store
        .get(&JobId::from_string(&job_id))
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    Ok(Json(JobStatusResponse {
        id: job.id.to_string(),
        status: job.status,
        progress: job.progress,
        download_url: job.download_url,
        settings: job.settings,
        created_at: job.created_at,
    }))
}

// ============================================================================
// Result upload
// ============================================================================

/// Upload response.
#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
}

/// POST /api/jobs/:job_id/upload
///
/// Persists the uploaded artifact, then marks the job completed in a single
/// store write so a concurrent status poll never sees a half-finished job.
pub async fn upload_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    _auth: WorkerAuth,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let job_id = JobId::from_string(job_id);
    if state.store.get(&job_id).is_none() {
        return Err(ApiError::not_found("Job not found"));
    }

    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
            file = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let stored_name = state
        .storage
        .store_artifact(&job_id, filename.as_deref(), &bytes)
        .await?;
    let download_url = format!("/downloads/{stored_name}");

    let job = state.store.mark_completed(&job_id, &download_url)?;

    metrics::record_job_completed();
    info!(job_id = %job.id, size = bytes.len(), "Render artifact uploaded");

    Ok(Json(UploadResponse {
        message: "Upload successful".to_string(),
        download_url,
    }))
}
