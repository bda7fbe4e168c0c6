//! The job record store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use packshot_models::{Job, JobId, JobStatus};

use crate::error::{StoreError, StoreResult};

/// Partial status update reported by a render worker.
///
/// Only the provided fields are applied; a progress value outside 0-100 is
/// silently ignored. The server trusts the worker's state reports fully.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// A stored job plus its insertion sequence number.
///
/// The sequence number breaks `created_at` ties so dispatch order stays
/// stable under same-millisecond enqueues.
struct Entry {
    job: Job,
    seq: u64,
}

struct Inner {
    jobs: HashMap<JobId, Entry>,
    next_seq: u64,
}

/// In-process map from job id to job, with a secondary preview index.
///
/// One instance per process, shared across handlers via `Arc`.
pub struct JobStore {
    inner: Mutex<Inner>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                jobs: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-operation; the map itself is
        // still usable, so recover the guard rather than propagating.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or overwrite a job.
    pub fn put(&self, job: Job) {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(job.id.clone(), Entry { job, seq });
    }

    /// Look up a job by id.
    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.lock().jobs.get(id).map(|e| e.job.clone())
    }

    /// All jobs, in no particular order.
    pub fn list(&self) -> Vec<Job> {
        self.lock().jobs.values().map(|e| e.job.clone()).collect()
    }

    /// Remove a job. Returns whether it was present.
    pub fn delete(&self, id: &JobId) -> bool {
        self.lock().jobs.remove(id).is_some()
    }

    /// Find the job flagged as a preview for `preview_id`.
    pub fn find_by_preview_id(&self, preview_id: &str) -> Option<Job> {
        self.lock()
            .jobs
            .values()
            .find(|e| e.job.preview_for.as_deref() == Some(preview_id))
            .map(|e| e.job.clone())
    }

    /// Atomically claim the oldest queued job for a render worker.
    ///
    /// Selects strictly by ascending `created_at` (insertion order breaks
    /// ties), transitions the job to `processing` with progress reset, and
    /// returns the claimed snapshot. Returns `None` when no job is queued,
    /// which is a normal poll outcome, not an error.
    pub fn claim_next(&self) -> Option<Job> {
        let mut inner = self.lock();

        let id = inner
            .jobs
            .values()
            .filter(|e| e.job.status == JobStatus::Queued)
            .min_by_key(|e| (e.job.created_at, e.seq))
            .map(|e| e.job.id.clone())?;

        let entry = inner.jobs.get_mut(&id)?;
        entry.job.claim();
        debug!(job_id = %id, "Claimed job for dispatch");
        Some(entry.job.clone())
    }

    /// Apply a partial worker update under a single lock acquisition.
    ///
    /// Returns the updated job, or `NotFound` for an unknown id.
    pub fn apply_update(&self, id: &JobId, update: &StatusUpdate) -> StoreResult<Job> {
        let mut inner = self.lock();
        let entry = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        if let Some(status) = update.status {
            entry.job.status = status;
        }
        if let Some(progress) = update.progress {
            if (0..=100).contains(&progress) {
                entry.job.progress = progress as u8;
            }
        }
        if let Some(url) = &update.download_url {
            entry.job.download_url = Some(url.clone());
        }
        entry.job.updated_at = Utc::now();

        Ok(entry.job.clone())
    }

    /// Mark a job completed in one atomic write.
    ///
    /// Sets status, progress and download URL together so no intermediate
    /// state is ever visible to a status poll.
    pub fn mark_completed(&self, id: &JobId, download_url: impl Into<String>) -> StoreResult<Job> {
        let mut inner = self.lock();
        let entry = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        entry.job.complete(download_url);
        Ok(entry.job.clone())
    }

    /// Number of jobs currently queued.
    pub fn queued_len(&self) -> usize {
        self.lock()
            .jobs
            .values()
            .filter(|e| e.job.status == JobStatus::Queued)
            .count()
    }

    /// Total number of jobs in the store.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().jobs.is_empty()
    }

    /// Remove all completed/failed jobs. Returns how many were evicted.
    pub fn remove_finished(&self) -> usize {
        let mut inner = self.lock();
        let before = inner.jobs.len();
        inner.jobs.retain(|_, e| !e.job.is_terminal());
        before - inner.jobs.len()
    }

    /// Evict terminal jobs whose last update is older than `ttl`.
    pub fn evict_finished_older_than(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut inner = self.lock();
        let before = inner.jobs.len();
        inner
            .jobs
            .retain(|_, e| !(e.job.is_terminal() && e.job.updated_at < cutoff));
        before - inner.jobs.len()
    }

    /// Processing jobs claimed before `cutoff` duration ago.
    ///
    /// These are candidates for manual intervention; the store never requeues
    /// them on its own.
    pub fn stale_processing(&self, older_than: Duration) -> Vec<Job> {
        let cutoff = Utc::now() - older_than;
        self.lock()
            .jobs
            .values()
            .filter(|e| {
                e.job.status == JobStatus::Processing
                    && claimed_before(&e.job, cutoff)
            })
            .map(|e| e.job.clone())
            .collect()
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn claimed_before(job: &Job, cutoff: DateTime<Utc>) -> bool {
    job.claimed_at.map(|t| t < cutoff).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use packshot_models::ProductRef;
    use serde_json::json;

    fn make_job(glb: &str) -> Job {
        Job::new(
            vec![ProductRef::with_glb(glb)],
            json!({"resolution": "1080p"}),
            "/jobs/test/urls.txt",
            vec![glb.to_string()],
        )
    }

    #[test]
    fn test_put_get_delete() {
        let store = JobStore::new();
        let job = make_job("https://cdn.example.com/a.glb");
        let id = job.id.clone();

        store.put(job);
        assert!(store.get(&id).is_some());
        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_fifo_claim_order() {
        let store = JobStore::new();

        let mut first = make_job("https://cdn.example.com/a.glb");
        first.created_at = Utc::now() - Duration::seconds(30);
        let mut second = make_job("https://cdn.example.com/b.glb");
        second.created_at = Utc::now() - Duration::seconds(20);
        let third = make_job("https://cdn.example.com/c.glb");

        let (a, b, c) = (first.id.clone(), second.id.clone(), third.id.clone());
        // Insert out of order; dispatch must still go oldest-first.
        store.put(third);
        store.put(first);
        store.put(second);

        assert_eq!(store.claim_next().map(|j| j.id), Some(a));
        assert_eq!(store.claim_next().map(|j| j.id), Some(b));
        assert_eq!(store.claim_next().map(|j| j.id), Some(c));
        assert!(store.claim_next().is_none());
    }

    #[test]
    fn test_insertion_order_breaks_created_at_ties() {
        let store = JobStore::new();
        let now = Utc::now();

        let mut first = make_job("https://cdn.example.com/a.glb");
        first.created_at = now;
        let mut second = make_job("https://cdn.example.com/b.glb");
        second.created_at = now;

        let (a, b) = (first.id.clone(), second.id.clone());
        store.put(first);
        store.put(second);

        assert_eq!(store.claim_next().map(|j| j.id), Some(a));
        assert_eq!(store.claim_next().map(|j| j.id), Some(b));
    }

    #[test]
    fn test_claimed_job_is_processing() {
        let store = JobStore::new();
        store.put(make_job("https://cdn.example.com/a.glb"));

        let claimed = store.claim_next().expect("one job queued");
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.progress, 0);
        assert!(claimed.claimed_at.is_some());

        // The stored copy reflects the claim too.
        let stored = store.get(&claimed.id).expect("still stored");
        assert_eq!(stored.status, JobStatus::Processing);
    }

    #[test]
    fn test_terminal_jobs_never_reclaimed() {
        let store = JobStore::new();
        store.put(make_job("https://cdn.example.com/a.glb"));

        let claimed = store.claim_next().expect("claim");
        store
            .mark_completed(&claimed.id, "/downloads/a.zip")
            .expect("complete");

        assert!(store.claim_next().is_none());
    }

    #[tokio::test]
    async fn test_claim_exclusivity_under_concurrency() {
        let store = Arc::new(JobStore::new());
        store.put(make_job("https://cdn.example.com/a.glb"));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.claim_next() }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("task").is_some() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_apply_update_partial() {
        let store = JobStore::new();
        let job = make_job("https://cdn.example.com/a.glb");
        let id = job.id.clone();
        store.put(job);

        let updated = store
            .apply_update(
                &id,
                &StatusUpdate {
                    progress: Some(42),
                    ..StatusUpdate::default()
                },
            )
            .expect("update");

        assert_eq!(updated.progress, 42);
        assert_eq!(updated.status, JobStatus::Queued);
    }

    #[test]
    fn test_apply_update_ignores_out_of_range_progress() {
        let store = JobStore::new();
        let job = make_job("https://cdn.example.com/a.glb");
        let id = job.id.clone();
        store.put(job);

        let updated = store
            .apply_update(
                &id,
                &StatusUpdate {
                    progress: Some(250),
                    ..StatusUpdate::default()
                },
            )
            .expect("update");
        assert_eq!(updated.progress, 0);

        let updated = store
            .apply_update(
                &id,
                &StatusUpdate {
                    progress: Some(-3),
                    ..StatusUpdate::default()
                },
            )
            .expect("update");
        assert_eq!(updated.progress, 0);
    }

    #[test]
    fn test_apply_update_unknown_job() {
        let store = JobStore::new();
        let err = store
            .apply_update(&JobId::from_string("job_missing"), &StatusUpdate::default())
            .expect_err("unknown id");
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_preview_index() {
        let store = JobStore::new();
        let job = Job::new_preview(
            vec![ProductRef::with_glb("https://cdn.example.com/a.glb")],
            json!({}),
            "/jobs/p/urls.txt",
            vec![],
            "preview_abc",
        );
        let id = job.id.clone();
        store.put(job);
        store.put(make_job("https://cdn.example.com/b.glb"));

        let found = store.find_by_preview_id("preview_abc").expect("indexed");
        assert_eq!(found.id, id);
        assert!(store.find_by_preview_id("preview_other").is_none());
    }

    #[test]
    fn test_remove_finished() {
        let store = JobStore::new();
        store.put(make_job("https://cdn.example.com/a.glb"));
        let claimed = store.claim_next().expect("claim");
        store
            .mark_completed(&claimed.id, "/downloads/a.zip")
            .expect("complete");
        store.put(make_job("https://cdn.example.com/b.glb"));

        assert_eq!(store.remove_finished(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_eviction_respects_ttl() {
        let store = JobStore::new();
        store.put(make_job("https://cdn.example.com/a.glb"));
        let claimed = store.claim_next().expect("claim");
        store
            .mark_completed(&claimed.id, "/downloads/a.zip")
            .expect("complete");

        // Freshly finished: a long TTL keeps it.
        assert_eq!(store.evict_finished_older_than(Duration::hours(1)), 0);
        // Zero TTL evicts anything terminal.
        assert_eq!(store.evict_finished_older_than(Duration::zero()), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_stale_processing_detection() {
        let store = JobStore::new();
        let mut job = make_job("https://cdn.example.com/a.glb");
        job.claim();
        job.claimed_at = Some(Utc::now() - Duration::hours(2));
        let id = job.id.clone();
        store.put(job);

        let stale = store.stale_processing(Duration::minutes(30));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, id);

        assert!(store.stale_processing(Duration::hours(3)).is_empty());
    }
}
