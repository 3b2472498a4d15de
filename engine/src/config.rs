//! Engine configuration.

use ratecompare_common::duration_ms;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the comparison engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Return `NoProvidersAvailable` instead of an empty completed result
    /// when every provider is disabled.
    pub fail_on_no_providers: bool,
    /// Upper bound for a whole comparison; per-provider deadlines never
    /// exceed it.
    #[serde(with = "duration_ms", rename = "overallTimeoutMs")]
    pub overall_timeout: Duration,
    /// Largest amount accepted for conversion.
    pub max_amount: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fail_on_no_providers: false,
            overall_timeout: Duration::from_secs(10),
            max_amount: Decimal::from(1_000_000_000u64),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `RATECOMPARE_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(flag) = std::env::var("RATECOMPARE_FAIL_ON_NO_PROVIDERS") {
            if let Ok(flag) = flag.parse() {
                self.fail_on_no_providers = flag;
            }
        }

        if let Ok(timeout) = std::env::var("RATECOMPARE_OVERALL_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.overall_timeout = Duration::from_millis(ms);
            }
        }

        if let Ok(max) = std::env::var("RATECOMPARE_MAX_AMOUNT") {
            if let Ok(max) = max.parse() {
                self.max_amount = max;
            }
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.overall_timeout.is_zero() {
            return Err("Overall timeout cannot be zero".to_string());
        }

        if self.max_amount <= Decimal::ZERO {
            return Err("Maximum amount must be positive".to_string());
        }

        Ok(())
    }
}
