//! Axum HTTP API server for the render job queue.
//!
//! This crate provides:
//! - Client-facing enqueue, status polling and download endpoints
//! - Worker-facing dispatch, status update and result upload endpoints
//! - Authenticated proxying of cancel/clear-finished to the prep worker
//! - Request logging, metrics and CORS

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
