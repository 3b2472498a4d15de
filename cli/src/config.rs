//! Application configuration file.

use std::path::Path;

use anyhow::Context;
use ratecompare_engine::EngineConfig;
use ratecompare_providers::ProvidersConfig;
use serde::Deserialize;

/// Top-level configuration: `{"engine": {...}, "providers": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub providers: ProvidersConfig,
}

impl AppConfig {
    /// Load defaults, then the optional file, then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.engine.apply_env();
        config.providers.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.engine
            .validate()
            .map_err(|e| anyhow::anyhow!("engine: {e}"))?;
        self.providers
            .validate()
            .map_err(|e| anyhow::anyhow!("providers: {e}"))?;
        Ok(())
    }
}
