//! Shared application state.

use std::sync::Arc;

use docsage_core::DocSageConfig;
use docsage_runtime::Orchestrator;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn config(&self) -> &DocSageConfig {
        self.orchestrator.config()
    }
}
