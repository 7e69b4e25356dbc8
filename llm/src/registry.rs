use crate::claude::ClaudeGateway;
use crate::gemini::GeminiGateway;
use config::ProvidersConfig;
use dv_core::{ModelGateway, Provider};
use errors::RunError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Gateways available to the engine, resolved once at startup.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: BTreeMap<Provider, Arc<dyn ModelGateway>>
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one gateway per provider that has credentials.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let mut registry = Self::new();

        if let Some(gemini) = GeminiGateway::from_config(&config.gemini) {
            registry.register(Arc::new(gemini));
        }
        if let Some(claude) = ClaudeGateway::from_config(&config.claude) {
            registry.register(Arc::new(claude));
        }

        tracing::info!(
            providers = ?registry.configured(),
            "Model gateways registered"
        );
        registry
    }

    /// Adds or replaces the gateway of its provider.
    pub fn register(&mut self, gateway: Arc<dyn ModelGateway>) {
        self.gateways.insert(gateway.provider(), gateway);
    }

    pub fn with(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.register(gateway);
        self
    }

    pub fn get(&self, provider: Provider) -> Result<Arc<dyn ModelGateway>, RunError> {
        self.gateways
            .get(&provider)
            .cloned()
            .ok_or_else(|| RunError::ProviderNotConfigured {
                provider: provider.to_string(),
                reason: "no API key configured".to_string()
            })
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.gateways.contains_key(&provider)
    }

    pub fn configured(&self) -> Vec<Provider> {
        self.gateways.keys().copied().collect()
    }
}
