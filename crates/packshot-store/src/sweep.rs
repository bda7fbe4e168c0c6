//! Background retention sweep.
//!
//! The store has no eviction of its own, so without this sweep memory grows
//! with every job ever submitted. The sweep periodically:
//! - evicts completed/failed jobs older than a TTL
//! - logs processing jobs whose worker has gone quiet past a threshold
//!
//! Stuck jobs are reported, never requeued; reclaiming them is an operator
//! decision.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{info, warn};

use crate::store::JobStore;

/// Retention sweep configuration.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Interval between sweep runs
    pub interval: Duration,
    /// How long finished jobs are kept before eviction
    pub finished_ttl: Duration,
    /// How long a processing job may go without updates before it is
    /// reported as stalled
    pub stale_after: Duration,
    /// Whether the sweep runs at all
    pub enabled: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            finished_ttl: Duration::from_secs(6 * 3600),
            stale_after: Duration::from_secs(1800),
            enabled: true,
        }
    }
}

impl RetentionConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            interval: env_secs("RETENTION_INTERVAL_SECS", defaults.interval),
            finished_ttl: env_secs("FINISHED_JOB_TTL_SECS", defaults.finished_ttl),
            stale_after: env_secs("STALE_PROCESSING_SECS", defaults.stale_after),
            enabled: std::env::var("ENABLE_RETENTION_SWEEP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Periodic retention sweeper over the job store.
pub struct RetentionSweeper {
    store: Arc<JobStore>,
    config: RetentionConfig,
}

impl RetentionSweeper {
    pub fn new(store: Arc<JobStore>, config: RetentionConfig) -> Self {
        Self { store, config }
    }

    /// Run the sweep loop indefinitely. Spawn as a background task.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Retention sweep is disabled");
            return;
        }

        info!(
            interval_secs = self.config.interval.as_secs(),
            finished_ttl_secs = self.config.finished_ttl.as_secs(),
            "Starting retention sweeper"
        );

        let mut ticker = interval(self.config.interval);

        loop {
            ticker.tick().await;
            self.sweep_once();
        }
    }

    /// Run a single sweep cycle.
    pub fn sweep_once(&self) {
        let ttl = chrono::Duration::from_std(self.config.finished_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(6));
        let evicted = self.store.evict_finished_older_than(ttl);
        if evicted > 0 {
            info!(evicted, "Evicted finished jobs past retention TTL");
        }

        let stale_after = chrono::Duration::from_std(self.config.stale_after)
            .unwrap_or_else(|_| chrono::Duration::minutes(30));
        for job in self.store.stale_processing(stale_after) {
            warn!(
                job_id = %job.id,
                claimed_at = ?job.claimed_at,
                progress = job.progress,
                "Processing job has gone quiet; worker may have stalled"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use packshot_models::{Job, ProductRef};
    use serde_json::json;

    #[test]
    fn test_sweep_evicts_expired_finished_jobs() {
        let store = Arc::new(JobStore::new());
        let mut job = Job::new(
            vec![ProductRef::with_glb("https://cdn.example.com/a.glb")],
            json!({}),
            "/jobs/x/urls.txt",
            vec![],
        );
        job.complete("/downloads/a.zip");
        job.updated_at = chrono::Utc::now() - chrono::Duration::hours(12);
        store.put(job);

        let sweeper = RetentionSweeper::new(
            Arc::clone(&store),
            RetentionConfig {
                finished_ttl: Duration::from_secs(3600),
                ..RetentionConfig::default()
            },
        );
        sweeper.sweep_once();

        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_keeps_active_jobs() {
        let store = Arc::new(JobStore::new());
        store.put(Job::new(
            vec![ProductRef::with_glb("https://cdn.example.com/a.glb")],
            json!({}),
            "/jobs/x/urls.txt",
            vec![],
        ));

        let sweeper = RetentionSweeper::new(Arc::clone(&store), RetentionConfig::default());
        sweeper.sweep_once();

        assert_eq!(store.len(), 1);
    }
}
