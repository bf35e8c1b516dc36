//! Web server shared state.

use std::sync::Arc;

use crate::output::ArtifactStore;
use crate::scheduler::RefreshScheduler;

/// State shared by all request handlers.
#[derive(Clone)]
pub struct WebState {
    /// Scheduler running (or joining) refreshes.
    pub scheduler: Arc<RefreshScheduler>,
    /// Where the generated artifacts are served from.
    pub store: ArtifactStore,
}

impl WebState {
    pub fn new(scheduler: Arc<RefreshScheduler>, store: ArtifactStore) -> Self {
        Self { scheduler, store }
    }
}
