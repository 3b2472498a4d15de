//! RateCompare Provider Adapters
//!
//! One adapter per provider wire format, all behind the [`RateProvider`]
//! contract:
//!
//! - [`FlatJsonProvider`]: `{from, to, value}` in, `{rate}` out
//! - [`XmlProvider`]: `<XML><From/><To/><Amount/></XML>` in, `<XML><Result/></XML>` out
//! - [`NestedJsonProvider`]: `{exchange: {...}}` in, `{statusCode, message, data: {total}}` out
//!
//! Adapters never return errors to their caller. Transport failures,
//! malformed payloads, business rejections and timeouts all become failed
//! offers tagged with the provider's name.
//!
//! # Example
//!
//! ```rust,ignore
//! use ratecompare_providers::{ProviderFactory, ProvidersConfig};
//!
//! let providers = ProviderFactory::build(&ProvidersConfig::from_env());
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod flat_json;
pub mod http;
pub mod nested_json;
pub mod provider;
pub mod xml;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(test)]
mod test_server;

pub use config::{ProviderSettings, ProvidersConfig};
pub use error::{ProviderError, ProviderResult};
pub use factory::ProviderFactory;
pub use flat_json::FlatJsonProvider;
pub use nested_json::NestedJsonProvider;
pub use provider::{into_offer, Quote, RateProvider};
pub use xml::XmlProvider;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockBehavior, MockRateProvider};
