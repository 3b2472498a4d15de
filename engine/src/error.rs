//! Engine error types.

use ratecompare_common::ValidationError;
use thiserror::Error;

/// Errors surfaced by the comparison engine before or instead of a result.
///
/// Provider failures are never reported here; they become failed offers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request rejected before any provider was contacted.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// No provider is enabled and the engine is configured to fail fast.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// Engine or provider configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Stable error code for the calling boundary.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Validation(e) => e.error_code(),
            EngineError::NoProvidersAvailable => "NO_PROVIDERS_AVAILABLE",
            EngineError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
