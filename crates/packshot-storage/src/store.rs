//! Manifest and artifact file operations.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use packshot_models::JobId;

use crate::error::{StorageError, StorageResult};

/// Check that a client-supplied file name is safe to resolve on disk.
///
/// Rejects empty names, path separators, parent references and anything but
/// a conservative character set.
pub fn is_valid_artifact_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 128 || name.contains("..") {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Filesystem-backed store for job manifests and render artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from the `DATA_DIR` environment variable.
    pub fn from_env() -> Self {
        let root = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        Self::new(root)
    }

    /// The storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the input manifest for a job: one render-source URL per line.
    ///
    /// Returns the public manifest path (`/jobs/<id>/urls.txt`). The write
    /// completes before the caller stores the job, so a job is never
    /// dispatchable without its manifest.
    pub async fn write_manifest(&self, job_id: &JobId, urls: &[String]) -> StorageResult<String> {
        let dir = self.root.join("jobs").join(job_id.as_str());
        fs::create_dir_all(&dir).await?;

        let path = dir.join("urls.txt");
        fs::write(&path, urls.join("\n")).await?;

        debug!(job_id = %job_id, path = %path.display(), "Wrote job manifest");
        Ok(format!("/jobs/{}/urls.txt", job_id))
    }

    /// Persist an uploaded render artifact, keyed by job id.
    ///
    /// The stored name keeps the uploaded file's extension (default `zip`).
    /// Returns the stored file name.
    pub async fn store_artifact(
        &self,
        job_id: &JobId,
        uploaded_name: Option<&str>,
        bytes: &[u8],
    ) -> StorageResult<String> {
        let extension = uploaded_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("zip");

        let name = format!("{}.{}", job_id, extension);
        let dir = self.root.join("downloads");
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&name), bytes).await?;

        debug!(job_id = %job_id, name = %name, size = bytes.len(), "Stored render artifact");
        Ok(name)
    }

    /// Read a stored artifact's bytes.
    pub async fn read_artifact(&self, name: &str) -> StorageResult<Vec<u8>> {
        if !is_valid_artifact_name(name) {
            return Err(StorageError::invalid_name(name));
        }

        let path = self.root.join("downloads").join(name);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(name))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Read a job's manifest back as URLs.
    pub async fn read_manifest(&self, job_id: &JobId) -> StorageResult<Vec<String>> {
        let path = self.root.join("jobs").join(job_id.as_str()).join("urls.txt");
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(text.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(job_id.as_str()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (ArtifactStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        (ArtifactStore::new(dir.path()), dir)
    }

    #[test]
    fn test_artifact_name_validation() {
        assert!(is_valid_artifact_name("job_abc123.zip"));
        assert!(is_valid_artifact_name("render-output.png"));

        assert!(!is_valid_artifact_name(""));
        assert!(!is_valid_artifact_name("../etc/passwd"));
        assert!(!is_valid_artifact_name("a/b.zip"));
        assert!(!is_valid_artifact_name("a\\b.zip"));
        assert!(!is_valid_artifact_name("has space.zip"));
        assert!(!is_valid_artifact_name(&"a".repeat(200)));
    }

    #[tokio::test]
    async fn test_manifest_roundtrip() {
        let (store, _dir) = test_store();
        let job_id = JobId::from_string("job_manifest_test");

        let urls = vec![
            "https://cdn.example.com/a.glb".to_string(),
            "https://cdn.example.com/b.glb".to_string(),
        ];
        let path = store.write_manifest(&job_id, &urls).await.expect("write");
        assert_eq!(path, "/jobs/job_manifest_test/urls.txt");

        let read_back = store.read_manifest(&job_id).await.expect("read");
        assert_eq!(read_back, urls);
    }

    #[tokio::test]
    async fn test_artifact_roundtrip() {
        let (store, _dir) = test_store();
        let job_id = JobId::from_string("job_artifact_test");

        let name = store
            .store_artifact(&job_id, Some("render.zip"), b"zipbytes")
            .await
            .expect("store");
        assert_eq!(name, "job_artifact_test.zip");

        let bytes = store.read_artifact(&name).await.expect("read");
        assert_eq!(bytes, b"zipbytes");
    }

    #[tokio::test]
    async fn test_artifact_extension_fallback() {
        let (store, _dir) = test_store();
        let job_id = JobId::from_string("job_ext_test");

        let name = store
            .store_artifact(&job_id, None, b"data")
            .await
            .expect("store");
        assert_eq!(name, "job_ext_test.zip");
    }

    #[tokio::test]
    async fn test_missing_artifact_is_not_found() {
        let (store, _dir) = test_store();
        let err = store.read_artifact("nope.zip").await.expect_err("missing");
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (store, _dir) = test_store();
        let err = store
            .read_artifact("../secrets.txt")
            .await
            .expect_err("traversal");
        assert!(matches!(err, StorageError::InvalidName(_)));
    }
}
