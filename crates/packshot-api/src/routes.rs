//! API routes.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::downloads::download_artifact;
use crate::handlers::jobs::{
    claim_next_job, get_job_status, list_jobs, submit_job, update_job_status, upload_result,
};
use crate::handlers::preview::{create_preview, get_preview_status};
use crate::handlers::render::{cancel_render, clear_finished};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        // Enqueue + list
        .route("/jobs", post(submit_job).get(list_jobs))
        // Worker dispatch poll
        .route("/jobs/next", get(claim_next_job))
        // Worker updates + client polling
        .route(
            "/jobs/:job_id/status",
            put(update_job_status).get(get_job_status),
        )
        // Worker result upload
        .route("/jobs/:job_id/upload", post(upload_result));

    let preview_routes = Router::new()
        .route("/preview", post(create_preview))
        .route("/preview/:preview_id/status", get(get_preview_status));

    // Delegated controls, session-authenticated
    let render_routes = Router::new()
        .route("/render/cancel", post(cancel_render))
        .route("/render/jobs/clear-finished", post(clear_finished));

    let download_routes = Router::new().route("/downloads/:filename", get(download_artifact));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let api_routes = Router::new()
        .merge(job_routes)
        .merge(preview_routes)
        .merge(render_routes);

    Router::new()
        .nest("/api", api_routes)
        .merge(download_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
