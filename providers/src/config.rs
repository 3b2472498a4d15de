//! Provider configuration.

use serde::Deserialize;
use std::time::Duration;

use ratecompare_common::duration_ms;

/// Settings owned by a single provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Provider name reported on offers.
    pub name: String,
    /// Static enablement; disabled providers are never dispatched.
    pub enabled: bool,
    /// Base URL, e.g. `http://localhost:5001`.
    pub base_url: String,
    /// Path of the conversion endpoint.
    pub endpoint: String,
    /// Path of the health endpoint.
    pub health_endpoint: String,
    /// Per-call timeout.
    #[serde(with = "duration_ms", rename = "timeoutMs")]
    pub timeout: Duration,
    /// Optional API key sent as `X-API-Key`.
    pub api_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            base_url: String::new(),
            endpoint: "/".to_string(),
            health_endpoint: "/health".to_string(),
            timeout: Duration::from_secs(5),
            api_key: None,
        }
    }
}

impl ProviderSettings {
    /// Settings with the given name, base URL and endpoint; other fields default.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Full URL of the conversion endpoint.
    pub fn offer_url(&self) -> String {
        join_url(&self.base_url, &self.endpoint)
    }

    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_endpoint)
    }

    /// Override fields from `<PREFIX>_URL`, `_ENABLED`, `_TIMEOUT_MS`, `_API_KEY`.
    pub fn apply_env(&mut self, prefix: &str) {
        if let Ok(url) = std::env::var(format!("{prefix}_URL")) {
            self.base_url = url;
        }

        if let Ok(enabled) = std::env::var(format!("{prefix}_ENABLED")) {
            if let Ok(enabled) = enabled.parse() {
                self.enabled = enabled;
            }
        }

        if let Ok(timeout) = std::env::var(format!("{prefix}_TIMEOUT_MS")) {
            if let Ok(ms) = timeout.parse() {
                self.timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(key) = std::env::var(format!("{prefix}_API_KEY")) {
            self.api_key = Some(key).filter(|k| !k.is_empty());
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Provider name cannot be empty".to_string());
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "Provider {} base URL must be http(s), got {:?}",
                self.name, self.base_url
            ));
        }

        if self.timeout.is_zero() {
            return Err(format!("Provider {} timeout cannot be zero", self.name));
        }

        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Settings for the three wire-format adapters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    /// Flat JSON provider.
    pub json: ProviderSettings,
    /// XML provider.
    pub xml: ProviderSettings,
    /// Nested JSON provider.
    pub nested: ProviderSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            json: ProviderSettings::new("json-api", "http://localhost:5001", "/api/rate"),
            xml: ProviderSettings::new("xml-api", "http://localhost:5002", "/api/exchange"),
            nested: ProviderSettings::new("nested-api", "http://localhost:5003", "/api/convert"),
        }
    }
}

impl ProvidersConfig {
    /// Load configuration from environment variables over defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `RATECOMPARE_{JSON,XML,NESTED}_*` overrides.
    pub fn apply_env(&mut self) {
        self.json.apply_env("RATECOMPARE_JSON");
        self.xml.apply_env("RATECOMPARE_XML");
        self.nested.apply_env("RATECOMPARE_NESTED");
    }

    /// Validate every provider's settings.
    pub fn validate(&self) -> Result<(), String> {
        self.json.validate()?;
        self.xml.validate()?;
        self.nested.validate()?;

        let names = [&self.json.name, &self.xml.name, &self.nested.name];
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(format!("Duplicate provider name {name}"));
            }
        }

        Ok(())
    }
}
