//! Application state shared by the handlers.

use cache::ResultCache;
use config::Config;
use engine::Orchestrator;
use llm::GatewayRegistry;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: Arc<Config>,
    /// Present when a Prometheus recorder has been installed.
    pub metrics: Option<PrometheusHandle>
}

impl AppState {
    /// Connects the cache and registers the configured providers.
    pub async fn new(config: Config) -> Self {
        let cache = Arc::new(ResultCache::from_config(&config.cache).await);
        let registry = GatewayRegistry::from_config(&config.providers);
        let orchestrator = Orchestrator::from_config(&config.analysis, registry, cache);

        Self::with_orchestrator(config, orchestrator)
    }

    /// Wraps an existing orchestrator (useful for testing).
    #[must_use]
    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            config: Arc::new(config),
            metrics: None
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
