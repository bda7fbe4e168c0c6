//! Session and worker authentication.
//!
//! Two distinct callers reach this API:
//! - Dashboard users, whose bearer tokens are verified against the external
//!   auth service, which also resolves the tenant (`client`) name.
//! - Render workers, which present a shared secret on the dispatch, status
//!   update and upload routes when `WORKER_API_TOKEN` is configured. When the
//!   token is unset those routes stay open for legacy workers.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Tenant fallback when a profile has no client assigned.
const SHARED_CLIENT: &str = "Shared";

/// Authenticated dashboard user with resolved tenant.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub client: String,
}

/// Session payload returned by the auth service.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    client: Option<String>,
}

/// Client for the external auth service's session endpoint.
pub struct SessionClient {
    http: Client,
    base_url: Option<String>,
}

impl SessionClient {
    /// Create from the `AUTH_SERVICE_URL` environment variable.
    ///
    /// The URL may be absent in deployments that never use the proxied
    /// cancel/clear routes; verification then fails with a config error.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            base_url: std::env::var("AUTH_SERVICE_URL").ok().filter(|s| !s.is_empty()),
        })
    }

    /// Verify a bearer token and resolve the caller's tenant.
    pub async fn verify(&self, token: &str) -> Result<SessionUser, ApiError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| ApiError::internal("AUTH_SERVICE_URL not configured"))?;

        let url = format!("{}/session", base.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::internal(format!("Auth service unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(ApiError::unauthorized("Invalid session"));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::internal(format!("Invalid auth service response: {e}")))?;

        let client = session
            .client
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| SHARED_CLIENT.to_string());

        debug!(user_id = %session.user_id, client = %client, "Resolved session");
        Ok(SessionUser {
            user_id: session.user_id,
            client,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))
}

/// Axum extractor for an authenticated dashboard user.
#[axum::async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state.sessions.verify(token).await
    }
}

/// Marker extractor enforcing the worker shared secret, when configured.
#[derive(Debug, Clone, Copy)]
pub struct WorkerAuth;

#[axum::async_trait]
impl FromRequestParts<AppState> for WorkerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.worker_token.as_deref() else {
            return Ok(WorkerAuth);
        };

        let token = bearer_token(parts)?;
        if token != expected {
            return Err(ApiError::unauthorized("Invalid worker token"));
        }

        Ok(WorkerAuth)
    }
}
