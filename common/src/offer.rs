//! Normalized outcome of asking one provider for a conversion.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::time::{self, Timestamp};

/// Fractional digits kept on converted amounts.
pub const AMOUNT_SCALE: u32 = 6;

/// Fractional digits kept on exchange rates.
pub const RATE_SCALE: u32 = 8;

/// Failure categories. A failed offer's message is `"<category>: <detail>"`.
pub mod category {
    pub const TIMEOUT: &str = "timeout";
    pub const CANCELLED: &str = "cancelled";
    pub const TRANSPORT: &str = "transport error";
    pub const MALFORMED: &str = "malformed response";
    pub const REJECTED: &str = "business rejection";
    pub const INTERNAL: &str = "internal error";
}

/// One provider attempt, successful or not.
///
/// A successful offer always has `converted_amount >= 0` and
/// `exchange_rate > 0`. A failed offer always carries a non-empty error
/// message and zero amount and rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    provider_name: String,
    converted_amount: Decimal,
    exchange_rate: Decimal,
    is_successful: bool,
    error_message: Option<String>,
    response_time: Timestamp,
    #[serde(with = "time::duration_ms")]
    response_duration: Duration,
}

impl Offer {
    /// Successful offer. Values breaking the success invariant turn the offer
    /// into a business rejection instead.
    pub fn success(
        provider_name: impl Into<String>,
        converted_amount: Decimal,
        exchange_rate: Decimal,
        response_duration: Duration,
    ) -> Self {
        let provider_name = provider_name.into();
        let rounded_rate = exchange_rate
            .round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);

        if rounded_rate <= Decimal::ZERO {
            return Self::failure(
                provider_name,
                format!(
                    "{}: exchange rate {exchange_rate} rounds to {rounded_rate}",
                    category::REJECTED
                ),
                response_duration,
            );
        }
        if converted_amount < Decimal::ZERO {
            return Self::failure(
                provider_name,
                format!(
                    "{}: negative converted amount {converted_amount}",
                    category::REJECTED
                ),
                response_duration,
            );
        }

        Self {
            provider_name,
            converted_amount: converted_amount
                .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero),
            exchange_rate: rounded_rate,
            is_successful: true,
            error_message: None,
            response_time: time::now(),
            response_duration,
        }
    }

    /// Failed offer with a human-readable error message.
    pub fn failure(
        provider_name: impl Into<String>,
        error_message: impl Into<String>,
        response_duration: Duration,
    ) -> Self {
        let mut error_message = error_message.into();
        if error_message.trim().is_empty() {
            error_message = format!("{}: unspecified provider failure", category::INTERNAL);
        }

        Self {
            provider_name: provider_name.into(),
            converted_amount: Decimal::ZERO,
            exchange_rate: Decimal::ZERO,
            is_successful: false,
            error_message: Some(error_message),
            response_time: time::now(),
            response_duration,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn converted_amount(&self) -> Decimal {
        self.converted_amount
    }

    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }

    pub fn is_successful(&self) -> bool {
        self.is_successful
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Category prefix of a failed offer's message.
    pub fn failure_category(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .map(|m| m.split_once(':').map_or(m, |(category, _)| category))
    }

    /// Whether the attempt failed by running out of time.
    pub fn is_timeout(&self) -> bool {
        self.failure_category() == Some(category::TIMEOUT)
    }

    /// Wall-clock time the attempt settled.
    pub fn response_time(&self) -> Timestamp {
        self.response_time
    }

    pub fn response_duration(&self) -> Duration {
        self.response_duration
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_message {
            None => write!(
                f,
                "{}: {} @ {}",
                self.provider_name, self.converted_amount, self.exchange_rate
            ),
            Some(error) => write!(f, "{}: failed ({})", self.provider_name, error),
        }
    }
}
