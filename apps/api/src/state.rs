use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobStore;
use crate::llm_client::ProviderGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Ordered backend fallback plus its availability/diagnostic record.
    pub gateway: Arc<ProviderGateway>,
    /// Pluggable job registry. Default: InMemoryJobStore.
    pub jobs: Arc<dyn JobStore>,
}
