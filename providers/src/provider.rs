//! Provider adapter contract.

use async_trait::async_trait;
use ratecompare_common::{CurrencyRequest, Deadline, Offer};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// Trait for currency conversion providers.
///
/// `get_offer` and `health_check` never fail: every error path is turned
/// into a failed [`Offer`] or `false`, so callers can treat all providers
/// the same way.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Whether the provider is enabled by configuration. Says nothing about
    /// liveness.
    fn is_available(&self) -> bool;

    /// Configured per-call timeout.
    fn timeout(&self) -> Duration;

    /// Ask the provider to convert `request`, settling by `deadline`.
    async fn get_offer(&self, request: &CurrencyRequest, deadline: Deadline) -> Offer;

    /// Check whether the provider answers its health endpoint by `deadline`.
    async fn health_check(&self, deadline: Deadline) -> bool;
}

/// Normalized numbers extracted from a provider payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub converted_amount: Decimal,
    pub exchange_rate: Decimal,
}

impl Quote {
    /// Quote from a rate: `converted = amount * rate`.
    pub fn from_rate(amount: Decimal, rate: Decimal) -> ProviderResult<Self> {
        let converted_amount = amount.checked_mul(rate).ok_or_else(|| {
            ProviderError::Malformed(format!("rate {rate} out of range for amount {amount}"))
        })?;
        Ok(Self {
            converted_amount,
            exchange_rate: rate,
        })
    }

    /// Quote from a total: `rate = total / amount`.
    pub fn from_total(amount: Decimal, total: Decimal) -> ProviderResult<Self> {
        let exchange_rate = total.checked_div(amount).ok_or_else(|| {
            ProviderError::Malformed(format!("total {total} out of range for amount {amount}"))
        })?;
        Ok(Self {
            converted_amount: total,
            exchange_rate,
        })
    }
}

/// Fold a provider call outcome into an offer.
pub fn into_offer(provider: &str, result: ProviderResult<Quote>, elapsed: Duration) -> Offer {
    match result {
        Ok(quote) => {
            debug!(
                provider,
                converted_amount = %quote.converted_amount,
                exchange_rate = %quote.exchange_rate,
                duration_ms = elapsed.as_millis() as u64,
                "Provider returned offer"
            );
            Offer::success(provider, quote.converted_amount, quote.exchange_rate, elapsed)
        }
        Err(e) => {
            warn!(
                provider,
                category = e.category(),
                error = %e,
                duration_ms = elapsed.as_millis() as u64,
                "Provider failed to return offer"
            );
            Offer::failure(provider, e.offer_message(), elapsed)
        }
    }
}
