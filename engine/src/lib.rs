//! RateCompare engine
//!
//! Sends one conversion request to every enabled provider concurrently and
//! selects the offer with the highest converted amount.
//!
//! # Features
//!
//! - Per-provider deadlines capped by an overall comparison deadline
//! - Failure isolation: every dispatched provider yields exactly one offer
//! - Cooperative cancellation through `CancellationToken`
//! - Concurrent health aggregation
//!
//! # Example
//!
//! ```rust,ignore
//! use ratecompare_engine::{ComparisonEngine, EngineConfig};
//! use ratecompare_providers::{ProviderFactory, ProvidersConfig};
//! use ratecompare_common::CurrencyRequest;
//!
//! let providers = ProviderFactory::build(&ProvidersConfig::from_env());
//! let engine = ComparisonEngine::new(providers, EngineConfig::from_env());
//!
//! let request = CurrencyRequest::parse("USD", "EUR", dec!(1000))?;
//! let result = engine.compare(request).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod metrics;

pub use config::EngineConfig;
pub use engine::ComparisonEngine;
pub use error::{EngineError, EngineResult};
pub use metrics::{EngineMetrics, MetricsSnapshot, ProviderStats};
