//! Nested JSON provider.
//!
//! Request:  `{"exchange": {"sourceCurrency": "USD", "targetCurrency": "EUR", "quantity": 1000}}`
//! Response: `{"statusCode": 200, "message": "OK", "data": {"total": 920.5}}`
//!
//! The embedded `statusCode` is authoritative: a 200 HTTP response carrying
//! any other application status is a rejection.

use async_trait::async_trait;
use ratecompare_common::{CurrencyRequest, Deadline, Offer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::http::HttpTransport;
use crate::provider::{into_offer, Quote, RateProvider};

const STATUS_OK: i64 = 200;

#[derive(Debug, Serialize)]
struct ExchangeEnvelope<'a> {
    exchange: ExchangeBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeBody<'a> {
    source_currency: &'a str,
    target_currency: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    quantity: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
    status_code: Option<i64>,
    message: Option<String>,
    data: Option<ExchangeData>,
}

#[derive(Debug, Deserialize)]
struct ExchangeData {
    total: Option<Decimal>,
}

fn parse_response(raw: &str, amount: Decimal) -> ProviderResult<Quote> {
    let response: ExchangeResponse = serde_json::from_str(raw)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {e}")))?;

    let status_code = response
        .status_code
        .ok_or_else(|| ProviderError::Malformed("missing statusCode".to_string()))?;

    if status_code != STATUS_OK {
        let message = response
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "no message".to_string());
        return Err(ProviderError::Rejected(format!(
            "provider status {status_code}: {message}"
        )));
    }

    let total = response
        .data
        .and_then(|d| d.total)
        .ok_or_else(|| ProviderError::Malformed("missing data.total".to_string()))?;

    if total <= Decimal::ZERO {
        return Err(ProviderError::Rejected(format!("non-positive total {total}")));
    }

    Quote::from_total(amount, total)
}

/// Provider speaking the enveloped `{exchange: {...}}` / `{statusCode, data}` format.
pub struct NestedJsonProvider {
    http: HttpTransport,
}

impl NestedJsonProvider {
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
        let body = ExchangeEnvelope {
            exchange: ExchangeBody {
                source_currency: request.source_currency().code(),
                target_currency: request.target_currency().code(),
                quantity: request.amount(),
            },
        };

        let raw = self.http.post_json(&body, deadline).await?;
        parse_response(&raw, request.amount())
    }
}

#[async_trait]
impl RateProvider for NestedJsonProvider {
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
