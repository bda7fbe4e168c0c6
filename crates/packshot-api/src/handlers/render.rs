//! Delegated render controls: cancel and clear-finished.
//!
//! These routes do not touch the local job store. They authenticate the
//! caller, resolve the tenant from the session, and forward the request to
//! the render-prep worker, relaying its response verbatim.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::auth::SessionUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Cancel request body.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(rename = "jobId", default)]
    pub job_id: String,
}

/// POST /api/render/cancel
pub async fn cancel_render(
    State(state): State<AppState>,
    user: SessionUser,
    Json(request): Json<CancelRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if request.job_id.trim().is_empty() {
        return Err(ApiError::bad_request("jobId is required"));
    }

    info!(job_id = %request.job_id, client = %user.client, "Forwarding render cancel");
    let response = state.prep.cancel_job(&request.job_id, &user.client).await?;
    Ok(Json(response))
}

/// POST /api/render/jobs/clear-finished
pub async fn clear_finished(
    State(state): State<AppState>,
    user: SessionUser,
) -> ApiResult<Json<serde_json::Value>> {
    info!(client = %user.client, "Forwarding clear-finished");
    let response = state.prep.clear_finished(&user.client).await?;
    Ok(Json(response))
}
