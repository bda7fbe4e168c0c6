//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "packshot_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "packshot_http_request_duration_seconds";

    // Queue metrics
    pub const QUEUE_DEPTH: &str = "packshot_queue_depth";
    pub const JOBS_ENQUEUED_TOTAL: &str = "packshot_jobs_enqueued_total";
    pub const JOBS_DISPATCHED_TOTAL: &str = "packshot_jobs_dispatched_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "packshot_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "packshot_jobs_failed_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update the queued-jobs gauge.
pub fn set_queue_depth(depth: usize) {
    gauge!(names::QUEUE_DEPTH).set(depth as f64);
}

/// Record job enqueued.
pub fn record_job_enqueued(preview: bool) {
    let labels = [("kind", if preview { "preview" } else { "render" })];
    counter!(names::JOBS_ENQUEUED_TOTAL, &labels).increment(1);
}

/// Record job handed to a worker.
pub fn record_job_dispatched() {
    counter!(names::JOBS_DISPATCHED_TOTAL).increment(1);
}

/// Record job completed.
pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

/// Record job failed.
pub fn record_job_failed() {
    counter!(names::JOBS_FAILED_TOTAL).increment(1);
}

/// Middleware recording request counts and latency.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Replace job/preview id path segments so metrics labels stay low-cardinality.
fn sanitize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("job_") || segment.starts_with("preview_") {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
