//! Flat JSON provider.
//!
//! Request:  `{"from": "USD", "to": "EUR", "value": 1000}`
//! Response: `{"rate": 0.92}`

use async_trait::async_trait;
use ratecompare_common::{CurrencyRequest, Deadline, Offer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::http::HttpTransport;
use crate::provider::{into_offer, Quote, RateProvider};

#[derive(Debug, Serialize)]
struct RateRequest<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    value: Decimal,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    rate: Option<Decimal>,
}

/// Provider speaking the flat `{from, to, value}` / `{rate}` format.
pub struct FlatJsonProvider {
    http: HttpTransport,
}

impl FlatJsonProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            http: HttpTransport::new(settings),
        }
    }

    async fn fetch_quote(
        &self,
        request: &CurrencyRequest,
        deadline: Deadline,
    ) -> ProviderResult<Quote> {
        let body = RateRequest {
            from: request.source_currency().code(),
            to: request.target_currency().code(),
            value: request.amount(),
        };

        let raw = self.http.post_json(&body, deadline).await?;
        parse_response(&raw, request.amount())
    }
}

fn parse_response(raw: &str, amount: Decimal) -> ProviderResult<Quote> {
    let response: RateResponse = serde_json::from_str(raw)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {e}")))?;

    let rate = response
        .rate
        .ok_or_else(|| ProviderError::Malformed("missing rate".to_string()))?;

    if rate <= Decimal::ZERO {
        return Err(ProviderError::Rejected(format!("non-positive rate {rate}")));
    }

    Quote::from_rate(amount, rate)
}

#[async_trait]
impl RateProvider for FlatJsonProvider {
    fn name(&self) -> &str {
        &self.http.settings().name
    }

    fn is_available(&self) -> bool {
        self.http.settings().enabled
    }

    fn timeout(&self) -> Duration {
        self.http.settings().timeout
    }

    async fn get_offer(&self, request: &CurrencyRequest, deadline: Deadline) -> Offer {
        let started = Instant::now();
        let result = self.fetch_quote(request, deadline).await;
        into_offer(self.name(), result, started.elapsed())
    }

    async fn health_check(&self, deadline: Deadline) -> bool {
        self.http.health(deadline).await
    }
}
