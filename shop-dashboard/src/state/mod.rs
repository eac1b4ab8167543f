//! Application state shared by every handler

use crate::config::ShopConfig;
use crate::service::JobService;
use crate::store::JobStore;
use std::sync::Arc;

/// Application state for the HTTP layer
///
/// Cheap to clone: everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ShopConfig>,
    store: Arc<dyn JobStore>,
    jobs: JobService,
}

impl AppState {
    /// Build state around an already-opened store
    #[must_use]
    pub fn new(config: ShopConfig, store: Arc<dyn JobStore>) -> Self {
        let jobs = JobService::new(Arc::clone(&store), config.jobs.completion_delay());
        Self {
            config: Arc::new(config),
            store,
            jobs,
        }
    }

    /// Effective configuration
    #[must_use]
    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    /// Shared job store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Job mutation service
    #[must_use]
    pub const fn jobs(&self) -> &JobService {
        &self.jobs
    }
}
