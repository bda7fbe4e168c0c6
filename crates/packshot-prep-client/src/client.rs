//! Render-prep worker HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{PrepError, PrepResult};

/// Configuration for the prep worker client.
#[derive(Debug, Clone)]
pub struct PrepClientConfig {
    /// Base URL of the prep worker
    pub base_url: String,
    /// Bearer token for worker calls
    pub api_token: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for PrepClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            api_token: String::new(),
            timeout: Duration::from_millis(15_000),
        }
    }
}

impl PrepClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("RENDER_PREP_WORKER_URL")
                .unwrap_or_else(|_| "http://localhost:8100".to_string()),
            api_token: std::env::var("RENDER_WORKER_API_TOKEN").unwrap_or_default(),
            timeout: Duration::from_millis(
                std::env::var("RENDER_PREP_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15_000),
            ),
        }
    }
}

/// Client for the external render-prep worker.
pub struct PrepClient {
    http: Client,
    config: PrepClientConfig,
}

impl PrepClient {
    /// Create a new prep client.
    pub fn new(config: PrepClientConfig) -> PrepResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(PrepError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> PrepResult<Self> {
        Self::new(PrepClientConfig::from_env())
    }

    /// Ask the worker to cancel a render job for a tenant.
    pub async fn cancel_job(&self, job_id: &str, client: &str) -> PrepResult<Value> {
        self.post(
            "/jobs/render/cancel",
            &json!({ "jobId": job_id, "client": client }),
        )
        .await
    }

    /// Ask the worker to clear all finished jobs for a tenant.
    pub async fn clear_finished(&self, client: &str) -> PrepResult<Value> {
        self.post("/jobs/render/clear-finished", &json!({ "client": client }))
            .await
    }

    async fn post(&self, path: &str, body: &Value) -> PrepResult<Value> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        debug!(url = %url, "Forwarding request to prep worker");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or_else(|_| json!({}));

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("prep worker request failed")
                .to_string();
            warn!(status = %status, message = %message, "Prep worker error");
            return Err(PrepError::upstream(status.as_u16(), message));
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> PrepClient {
        PrepClient::new(PrepClientConfig {
            base_url,
            api_token: "worker-token".to_string(),
            timeout: Duration::from_secs(2),
        })
        .expect("client")
    }

    #[test]
    fn test_config_defaults() {
        let config = PrepClientConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(15_000));
    }

    #[tokio::test]
    async fn test_cancel_forwards_job_and_tenant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs/render/cancel"))
            .and(header("Authorization", "Bearer worker-token"))
            .and(body_json(serde_json::json!({
                "jobId": "job_abc",
                "client": "Acme"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let response = client.cancel_job("job_abc", "Acme").await.expect("cancel");
        assert_eq!(response, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_clear_finished_relays_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs/render/clear-finished"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"cleared": 3})),
            )
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let response = client.clear_finished("Acme").await.expect("clear");
        assert_eq!(response["cleared"], 3);
    }

    #[tokio::test]
    async fn test_upstream_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/jobs/render/cancel"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": "job already running"})),
            )
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client
            .cancel_job("job_abc", "Acme")
            .await
            .expect_err("upstream failure");

        match err {
            PrepError::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "job already running");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
