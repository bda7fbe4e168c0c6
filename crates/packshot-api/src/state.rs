//! Application state.

use std::sync::Arc;

use packshot_prep_client::PrepClient;
use packshot_storage::ArtifactStore;
use packshot_store::JobStore;

use crate::auth::SessionClient;
use crate::config::ApiConfig;

/// Shared application state.
///
/// The job store is constructed exactly once here and injected into every
/// handler; cross-request coordination between the enqueue caller, the
/// dispatch-polling worker and the status-polling client depends on it.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<JobStore>,
    pub storage: Arc<ArtifactStore>,
    pub prep: Arc<PrepClient>,
    pub sessions: Arc<SessionClient>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = ArtifactStore::new(&config.data_dir);
        let prep = PrepClient::from_env()?;
        let sessions = SessionClient::from_env()?;

        Ok(Self {
            config,
            store: Arc::new(JobStore::new()),
            storage: Arc::new(storage),
            prep: Arc::new(prep),
            sessions: Arc::new(sessions),
        })
    }
}
