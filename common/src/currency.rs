//! Currency codes and the validated conversion request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ValidationError, ValidationResult};

/// ISO 4217 style currency code: exactly three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code, trimming whitespace and upper-casing.
    pub fn parse(code: &str) -> ValidationResult<Self> {
        let normalized = code.trim().to_ascii_uppercase();
        if normalized.len() != 3 || !normalized.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrencyCode(code.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn gbp() -> Self {
        Self("GBP".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// A validated request to convert `amount` from `source_currency` into
/// `target_currency`.
///
/// Fields are only reachable through accessors; once built the request does
/// not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRequest {
    source_currency: CurrencyCode,
    target_currency: CurrencyCode,
    amount: Decimal,
}

impl CurrencyRequest {
    /// Create a request from already parsed codes.
    pub fn new(
        source_currency: CurrencyCode,
        target_currency: CurrencyCode,
        amount: Decimal,
    ) -> ValidationResult<Self> {
        if source_currency == target_currency {
            return Err(ValidationError::SameCurrency(source_currency));
        }
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        Ok(Self {
            source_currency,
            target_currency,
            amount,
        })
    }

    /// Create a request from raw currency strings.
    pub fn parse(source: &str, target: &str, amount: Decimal) -> ValidationResult<Self> {
        Self::new(CurrencyCode::parse(source)?, CurrencyCode::parse(target)?, amount)
    }

    pub fn source_currency(&self) -> &CurrencyCode {
        &self.source_currency
    }

    pub fn target_currency(&self) -> &CurrencyCode {
        &self.target_currency
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Currency pair label, e.g. `USD/EUR`.
    pub fn pair(&self) -> String {
        format!("{}/{}", self.source_currency, self.target_currency)
    }

    /// Reject amounts above `max`.
    pub fn ensure_within(&self, max: Decimal) -> ValidationResult<()> {
        if self.amount > max {
            return Err(ValidationError::AmountExceedsLimit {
                amount: self.amount,
                max,
            });
        }
        Ok(())
    }
}

impl fmt::Display for CurrencyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.pair())
    }
}

/// Wire shape accepted from the boundary before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCurrencyRequest {
    source_currency: String,
    target_currency: String,
    amount: Decimal,
}

impl<'de> Deserialize<'de> for CurrencyRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawCurrencyRequest::deserialize(deserializer)?;
        CurrencyRequest::parse(&raw.source_currency, &raw.target_currency, raw.amount)
            .map_err(serde::de::Error::custom)
    }
}
