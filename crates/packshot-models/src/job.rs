//! Render job definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ProductRef;

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(format!("job_{}", Uuid::new_v4()))
    }

    /// Generate a new random preview job ID.
    pub fn new_preview() -> Self {
        Self(format!("preview_{}", Uuid::new_v4()))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state.
///
/// Transitions are forward-only: `Queued -> Processing -> Completed`, with
/// `Failed` reachable from either non-terminal state. A terminal job is never
/// claimed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting in queue
    #[default]
    Queued,
    /// Job has been claimed by a render worker
    Processing,
    /// Job completed successfully, artifact available
    Completed,
    /// Job failed
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A render job and its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Lifecycle state
    #[serde(default)]
    pub status: JobStatus,

    /// Progress percentage (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Render inputs, set once at creation
    pub products: Vec<ProductRef>,

    /// Renderer configuration, opaque to the queue
    pub settings: serde_json::Value,

    /// Path to the input manifest written at enqueue time
    pub file_path: String,

    /// Render-source URLs extracted from the products
    #[serde(default)]
    pub glb_urls: Vec<String>,

    /// Result artifact URL; present iff the job is completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    /// Creation timestamp; dispatch order key
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,

    /// When a worker claimed the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,

    /// Preview id this job renders a preview for, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_for: Option<String>,
}

impl Job {
    /// Create a new queued render job.
    pub fn new(
        products: Vec<ProductRef>,
        settings: serde_json::Value,
        file_path: impl Into<String>,
        glb_urls: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            progress: 0,
            products,
            settings,
            file_path: file_path.into(),
            glb_urls,
            download_url: None,
            created_at: now,
            updated_at: now,
            claimed_at: None,
            preview_for: None,
        }
    }

    /// Create a new queued preview job linked to `preview_for`.
    pub fn new_preview(
        products: Vec<ProductRef>,
        settings: serde_json::Value,
        file_path: impl Into<String>,
        glb_urls: Vec<String>,
        preview_for: impl Into<String>,
    ) -> Self {
        let mut job = Self::new(products, settings, file_path, glb_urls);
        job.id = JobId::new_preview();
        job.preview_for = Some(preview_for.into());
        job
    }

    /// Mark the job as claimed by a worker.
    pub fn claim(&mut self) {
        self.status = JobStatus::Processing;
        self.progress = 0;
        self.claimed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark the job as completed with its artifact URL.
    pub fn complete(&mut self, download_url: impl Into<String>) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.download_url = Some(download_url.into());
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed.
    pub fn fail(&mut self) {
        self.status = JobStatus::Failed;
        self.updated_at = Utc::now();
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_prefixes() {
        assert!(JobId::new().as_str().starts_with("job_"));
        assert!(JobId::new_preview().as_str().starts_with("preview_"));
    }

    #[test]
    fn test_job_creation() {
        let job = Job::new(
            vec![ProductRef::with_glb("https://cdn.example.com/a.glb")],
            serde_json::json!({"resolution": "1080p"}),
            "/jobs/x/urls.txt",
            vec!["https://cdn.example.com/a.glb".to_string()],
        );

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.download_url.is_none());
        assert!(job.preview_for.is_none());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = Job::new(
            vec![ProductRef::with_glb("https://cdn.example.com/a.glb")],
            serde_json::json!({}),
            "/jobs/x/urls.txt",
            vec![],
        );

        job.claim();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.claimed_at.is_some());

        job.complete("/downloads/render.zip");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.download_url.as_deref(), Some("/downloads/render.zip"));
        assert!(job.is_terminal());
    }

    #[test]
    fn test_status_wire_shape() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Queued).unwrap(),
            "\"queued\""
        );
        assert_eq!(
            serde_json::from_str::<JobStatus>("\"processing\"").unwrap(),
            JobStatus::Processing
        );
    }

    #[test]
    fn test_job_wire_shape_is_camel_case() {
        let job = Job::new(
            vec![],
            serde_json::json!({}),
            "/jobs/x/urls.txt",
            vec![],
        );
        let value = serde_json::to_value(&job).unwrap();
        assert!(value.get("filePath").is_some());
        assert!(value.get("createdAt").is_some());
        // Absent optionals are skipped entirely
        assert!(value.get("downloadUrl").is_none());
    }
}
