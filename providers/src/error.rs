//! Provider error taxonomy.
//!
//! These errors never leave an adapter: every one of them is folded into a
//! failed [`Offer`](ratecompare_common::Offer) whose message starts with the
//! error's category.

use ratecompare_common::category;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while asking a provider for an offer.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider did not answer before its deadline.
    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The caller cancelled the request while it was in flight.
    #[error("request cancelled before the provider answered")]
    Cancelled,

    /// Connection-level failure.
    #[error("{0}")]
    Transport(String),

    /// Provider answered with a non-success HTTP status.
    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    /// Payload could not be parsed for this wire format.
    #[error("{0}")]
    Malformed(String),

    /// Payload was well-formed but signals a domain rejection.
    #[error("{0}")]
    Rejected(String),

    /// Failure inside the adapter itself.
    #[error("{0}")]
    Internal(String),
}

impl ProviderError {
    /// Human-readable category used as the failed offer's message prefix.
    pub fn category(&self) -> &'static str {
        match self {
            ProviderError::Timeout(_) => category::TIMEOUT,
            ProviderError::Cancelled => category::CANCELLED,
            ProviderError::Transport(_) | ProviderError::HttpStatus { .. } => category::TRANSPORT,
            ProviderError::Malformed(_) => category::MALFORMED,
            ProviderError::Rejected(_) => category::REJECTED,
            ProviderError::Internal(_) => category::INTERNAL,
        }
    }

    /// Message stored on the failed offer.
    pub fn offer_message(&self) -> String {
        format!("{}: {}", self.category(), self)
    }

    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }

    /// Classify a `reqwest` failure. `budget` is the time the call was given.
    pub fn from_reqwest(err: reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(budget)
        } else if let Some(status) = err.status() {
            ProviderError::HttpStatus {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;
