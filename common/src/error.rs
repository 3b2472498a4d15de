//! Validation errors raised before any provider is contacted.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::CurrencyCode;

/// Errors produced while constructing a conversion request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Currency code is not three ASCII letters.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),

    /// Source and target currency are identical.
    #[error("Source and target currency must differ (both {0})")]
    SameCurrency(CurrencyCode),

    /// Amount is zero or negative.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount is above the configured ceiling.
    #[error("Amount {amount} exceeds maximum {max}")]
    AmountExceedsLimit { amount: Decimal, max: Decimal },
}

impl ValidationError {
    /// Stable error code for the calling boundary.
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::InvalidCurrencyCode(_) => "INVALID_CURRENCY_CODE",
            ValidationError::SameCurrency(_) => "SAME_CURRENCY",
            ValidationError::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            ValidationError::AmountExceedsLimit { .. } => "AMOUNT_EXCEEDS_LIMIT",
        }
    }

    /// Name of the request field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidCurrencyCode(_) => "currency",
            ValidationError::SameCurrency(_) => "targetCurrency",
            ValidationError::NonPositiveAmount(_) | ValidationError::AmountExceedsLimit { .. } => {
                "amount"
            }
        }
    }
}

/// Result type alias for request validation.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
