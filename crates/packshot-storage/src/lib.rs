//! Local filesystem storage for the render queue.
//!
//! Two kinds of files live under the data directory:
//! - `jobs/<job_id>/urls.txt` — the input manifest, one GLB URL per line,
//!   written before the job becomes dispatchable
//! - `downloads/<name>` — uploaded render artifacts, keyed by job id

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::{is_valid_artifact_name, ArtifactStore};
