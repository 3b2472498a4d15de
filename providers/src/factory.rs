//! Builds the configured provider adapters.

use std::sync::Arc;

use tracing::info;

use crate::config::ProvidersConfig;
use crate::flat_json::FlatJsonProvider;
use crate::nested_json::NestedJsonProvider;
use crate::provider::RateProvider;
use crate::xml::XmlProvider;

pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the wire-format adapters in dispatch order: flat JSON, XML,
    /// nested JSON. Disabled providers are included; the engine filters them.
    pub fn build(config: &ProvidersConfig) -> Vec<Arc<dyn RateProvider>> {
        let providers: Vec<Arc<dyn RateProvider>> = vec![
            Arc::new(FlatJsonProvider::new(config.json.clone())),
            Arc::new(XmlProvider::new(config.xml.clone())),
            Arc::new(NestedJsonProvider::new(config.nested.clone())),
        ];

        for provider in &providers {
            info!(
                provider = provider.name(),
                enabled = provider.is_available(),
                timeout_ms = provider.timeout().as_millis() as u64,
                "Registered provider"
            );
        }

        providers
    }
}
