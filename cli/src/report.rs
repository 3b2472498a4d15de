//! Output rendering for the command line.

use std::collections::BTreeMap;
use std::fmt::Write;

use clap::ValueEnum;
use ratecompare_common::ComparisonResult;

/// How results are printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// Human-readable summary.
    Text,
}

pub fn render_comparison(
    result: &ComparisonResult,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(comparison_text(result)),
    }
}

pub fn render_health(
    report: &BTreeMap<String, bool>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for (name, healthy) in report {
                let state = if *healthy { "healthy" } else { "unhealthy" };
                let _ = writeln!(out, "{name:<16} {state}");
            }
            Ok(out)
        }
    }
}

fn comparison_text(result: &ComparisonResult) -> String {
    let input = result.input();
    let mut out = String::new();

    let _ = writeln!(out, "Comparison {} ({:?})", result.id(), result.status());
    let _ = writeln!(out, "Request:  {} {}", input.amount(), input.pair());
    if let Some(error) = result.error() {
        let _ = writeln!(out, "Error:    {error}");
    }

    match result.best_offer() {
        Some(best) => {
            let _ = writeln!(
                out,
                "Best:     {} -> {} {} (rate {})",
                best.provider_name(),
                best.converted_amount(),
                input.target_currency(),
                best.exchange_rate()
            );
            let _ = writeln!(out, "Savings:  {} {}", result.savings(), input.target_currency());
        }
        None => {
            let _ = writeln!(out, "Best:     no successful offer");
        }
    }

    let _ = writeln!(out);
    for offer in result.successful_offers() {
        let _ = writeln!(
            out,
            "  ok    {:<16} {:>20} {:>14}  {}ms",
            offer.provider_name(),
            offer.converted_amount(),
            offer.exchange_rate(),
            offer.response_duration().as_millis()
        );
    }
    for offer in result.failed_offers() {
        let _ = writeln!(
            out,
            "  fail  {:<16} {}",
            offer.provider_name(),
            offer.error_message().unwrap_or_default()
        );
    }

    let _ = writeln!(
        out,
        "\n{} succeeded, {} failed in {}ms",
        result.successful_count(),
        result.failed_count(),
        result.processing_duration().as_millis()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratecompare_common::{CurrencyRequest, Offer};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn result() -> ComparisonResult {
        let request = CurrencyRequest::parse("USD", "EUR", dec!(100)).unwrap();
        ComparisonResult::completed(
            request,
            vec![
                Offer::success("json-api", dec!(92), dec!(0.92), Duration::from_millis(12)),
                Offer::failure(
                    "xml-api",
                    "timeout: no response within 5000ms",
                    Duration::from_secs(5),
                ),
                Offer::success("nested-api", dec!(91), dec!(0.91), Duration::from_millis(30)),
            ],
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_text_summary() {
        let text = render_comparison(&result(), OutputFormat::Text).unwrap();

        assert!(text.contains("Request:  100 USD/EUR"));
        assert!(text.contains("Best:     json-api -> 92"));
        assert!(text.contains("Savings:  1 EUR"));
        assert!(text.contains("timeout: no response within 5000ms"));
        assert!(text.contains("2 succeeded, 1 failed"));
    }

    #[test]
    fn test_json_output() {
        let json = render_comparison(&result(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["bestOffer"]["providerName"], "json-api");
        assert_eq!(value["allOffers"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_health_text() {
        let report = BTreeMap::from([
            ("json-api".to_string(), true),
            ("xml-api".to_string(), false),
        ]);
        let text = render_health(&report, OutputFormat::Text).unwrap();

        assert!(text.contains("json-api         healthy"));
        assert!(text.contains("xml-api          unhealthy"));
    }
}
