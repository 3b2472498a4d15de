//! XML provider.
//!
//! Request:  `<XML><From>USD</From><To>EUR</To><Amount>1000.00</Amount></XML>`
//! Response: `<XML><Result>920.50</Result></XML>`
//!
//! The provider returns a converted total; the rate is derived from it and
//! the two-decimal amount that was actually sent.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use ratecompare_common::{CurrencyRequest, Deadline, Offer};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::http::HttpTransport;
use crate::provider::{into_offer, Quote, RateProvider};

#[derive(Debug, Serialize)]
#[serde(rename = "XML")]
struct XmlRequest<'a> {
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "XML")]
struct XmlResponse {
    #[serde(rename = "Result")]
    result: Option<String>,
}

const ROOT: &str = "XML";

/// Amount as sent on the wire: two fractional digits, midpoint away from zero.
fn wire_amount(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn encode_request(request: &CurrencyRequest, amount: Decimal) -> ProviderResult<String> {
    let document = XmlRequest {
        from: request.source_currency().code(),
        to: request.target_currency().code(),
        amount: amount.to_string(),
    };
    quick_xml::se::to_string(&document)
        .map_err(|e| ProviderError::Internal(format!("failed to encode XML request: {e}")))
}

/// Name of the document's first element.
fn root_element(raw: &str) -> ProviderResult<String> {
    let mut reader = Reader::from_str(raw);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => {
                return Err(ProviderError::Malformed("empty XML document".to_string()));
            }
            Ok(_) => {}
            Err(e) => return Err(ProviderError::Malformed(format!("invalid XML body: {e}"))),
        }
    }
}

fn parse_response(raw: &str, amount: Decimal) -> ProviderResult<Quote> {
    let root = root_element(raw)?;
    if root != ROOT {
        return Err(ProviderError::Malformed(format!(
            "unexpected root element <{root}>, expected <{ROOT}>"
        )));
    }

    let response: XmlResponse = quick_xml::de::from_str(raw)
        .map_err(|e| ProviderError::Malformed(format!("invalid XML body: {e}")))?;

    let text = response
        .result
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ProviderError::Malformed("missing or empty Result element".to_string()))?;

    let total = Decimal::from_str(&text)
        .map_err(|_| ProviderError::Malformed(format!("unparsable Result {text:?}")))?;

    if total <= Decimal::ZERO {
        return Err(ProviderError::Rejected(format!("non-positive result {total}")));
    }

    Quote::from_total(amount, total)
}

/// Provider speaking the `<XML>` request/response format.
pub struct XmlProvider {
    http: HttpTransport,
}

impl XmlProvider {
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
        let amount = wire_amount(request.amount());
        if amount <= Decimal::ZERO {
            return Err(ProviderError::Rejected(format!(
                "amount {} rounds to {amount} at two decimal places",
                request.amount()
            )));
        }

        let document = encode_request(request, amount)?;
        let raw = self.http.post_xml(document, deadline).await?;
        parse_response(&raw, amount)
    }
}

#[async_trait]
impl RateProvider for XmlProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{serve, Canned};
    use rust_decimal_macros::dec;

    fn request(amount: Decimal) -> CurrencyRequest {
        CurrencyRequest::parse("USD", "EUR", amount).unwrap()
    }

    #[test]
    fn test_wire_amount() {
        assert_eq!(wire_amount(dec!(1000)).to_string(), "1000.00");
        assert_eq!(wire_amount(dec!(12.345)).to_string(), "12.35");
        assert_eq!(wire_amount(dec!(12.344)).to_string(), "12.34");
        assert_eq!(wire_amount(dec!(0.5)).to_string(), "0.50");
        assert_eq!(wire_amount(dec!(0.004)), Decimal::ZERO);
    }

    #[test]
    fn test_encode_request() {
        let xml = encode_request(&request(dec!(1000)), wire_amount(dec!(1000))).unwrap();
        assert_eq!(
            xml,
            "<XML><From>USD</From><To>EUR</To><Amount>1000.00</Amount></XML>"
        );
    }

    #[test]
    fn test_parse_response() {
        let quote = parse_response("<XML><Result>920.50</Result></XML>", dec!(1000)).unwrap();
        assert_eq!(quote.converted_amount, dec!(920.50));
        assert_eq!(quote.exchange_rate, dec!(0.9205));

        for bad in [
            "<XML></XML>",
            "<XML><Result></Result></XML>",
            "<XML><Result>abc</Result></XML>",
            "<XML><Result>12,5</Result></XML>",
            "<XML><Result>1</Wrong></XML>",
            "<html><Result>920</Result></html>",
            "<Result>920</Result>",
            "",
        ] {
            assert!(
                matches!(parse_response(bad, dec!(1000)), Err(ProviderError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }

        assert!(matches!(
            parse_response("<XML><Result>0</Result></XML>", dec!(1000)),
            Err(ProviderError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_get_offer_success() {
        let server = serve(Canned::ok("<XML><Result>1250.00</Result></XML>").xml()).await;
        let provider = XmlProvider::new(server.settings("xml-api").with_api_key("k-123"));

        let offer = provider
            .get_offer(&request(dec!(1000)), Deadline::after(Duration::from_secs(5)))
            .await;

        assert!(offer.is_successful(), "{offer}");
        assert_eq!(offer.converted_amount(), dec!(1250));
        assert_eq!(offer.exchange_rate(), dec!(1.25));

        assert_eq!(
            server.last_body().await.as_deref(),
            Some("<XML><From>USD</From><To>EUR</To><Amount>1000.00</Amount></XML>")
        );
        assert_eq!(server.last_api_key().await.as_deref(), Some("k-123"));
        assert_eq!(server.last_content_type().await.as_deref(), Some("application/xml"));
    }

    #[tokio::test]
    async fn test_rate_derived_from_sent_amount() {
        let server = serve(Canned::ok("<XML><Result>24.70</Result></XML>").xml()).await;
        let provider = XmlProvider::new(server.settings("xml-api"));

        let offer = provider
            .get_offer(&request(dec!(12.345)), Deadline::after(Duration::from_secs(5)))
            .await;

        assert!(offer.is_successful(), "{offer}");
        assert_eq!(offer.exchange_rate(), dec!(2));
        assert!(server.last_body().await.unwrap().contains("<Amount>12.35</Amount>"));
    }

    #[tokio::test]
    async fn test_amount_below_wire_precision_is_rejected() {
        let server = serve(Canned::ok("<XML><Result>1</Result></XML>").xml()).await;
        let provider = XmlProvider::new(server.settings("xml-api"));

        let offer = provider
            .get_offer(&request(dec!(0.004)), Deadline::after(Duration::from_secs(5)))
            .await;

        assert!(!offer.is_successful());
        assert!(offer.error_message().unwrap().starts_with("business rejection"));
        assert_eq!(server.last_body().await, None);
    }

    #[tokio::test]
    async fn test_get_offer_malformed() {
        let server = serve(Canned::ok("<XML><Result>n/a</Result></XML>").xml()).await;
        let provider = XmlProvider::new(server.settings("xml-api"));

        let offer = provider
            .get_offer(&request(dec!(10)), Deadline::after(Duration::from_secs(5)))
            .await;

        assert!(!offer.is_successful());
        assert!(offer.error_message().unwrap().starts_with("malformed response"));
    }

    #[tokio::test]
    async fn test_get_offer_http_error() {
        let server = serve(Canned::status(404, "").xml()).await;
        let provider = XmlProvider::new(server.settings("xml-api"));

        let offer = provider
            .get_offer(&request(dec!(10)), Deadline::after(Duration::from_secs(5)))
            .await;

        assert_eq!(offer.error_message(), Some("transport error: HTTP status 404"));
    }
}
