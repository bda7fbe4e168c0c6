//! Artifact download handler.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use packshot_storage::{is_valid_artifact_name, StorageError};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body served while an artifact has not landed on disk yet.
///
/// Returning 200 with placeholder text instead of 404 keeps client download
/// flows alive during the window between completion and artifact visibility.
const PLACEHOLDER_BODY: &str = "Render artifact is not available yet. Please try again shortly.";

/// GET /downloads/:filename
///
/// Streams the artifact bytes as an attachment. A missing artifact is a
/// soft-fail: 200 with a plain-text placeholder, by design.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    if !is_valid_artifact_name(&filename) {
        return Err(ApiError::bad_request("Invalid file name"));
    }

    match state.storage.read_artifact(&filename).await {
        Ok(bytes) => {
            debug!(filename = %filename, size = bytes.len(), "Serving render artifact");
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response())
        }
        Err(StorageError::NotFound(_)) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
            PLACEHOLDER_BODY,
        )
            .into_response()),
        Err(e) => Err(ApiError::Storage(e)),
    }
}
