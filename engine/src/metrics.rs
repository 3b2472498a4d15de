//! Metrics collection for comparison runs.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use ratecompare_common::Offer;

/// Per-provider counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderStats {
    /// Calls dispatched.
    pub attempts: u64,
    /// Successful offers.
    pub successes: u64,
    /// Failed offers, timeouts included.
    pub failures: u64,
    /// Failed offers caused by a timeout.
    pub timeouts: u64,
    /// Sum of response durations.
    pub total_latency: Duration,
}

impl ProviderStats {
    /// Mean response duration.
    pub fn average_latency(&self) -> Duration {
        if self.attempts == 0 {
            return Duration::ZERO;
        }
        self.total_latency / self.attempts as u32
    }
}

/// Engine metrics.
pub struct EngineMetrics {
    /// Comparisons started.
    pub comparisons_total: AtomicU64,
    /// Comparisons finished with `Completed`.
    pub comparisons_completed: AtomicU64,
    /// Comparisons finished with `Failed`.
    pub comparisons_failed: AtomicU64,
    /// Requests rejected during validation.
    pub validation_rejections: AtomicU64,
    /// Requests rejected because no provider was enabled.
    pub no_provider_rejections: AtomicU64,
    /// Successful offers.
    pub offers_succeeded: AtomicU64,
    /// Failed offers.
    pub offers_failed: AtomicU64,
    /// Failed offers caused by a timeout.
    pub offers_timed_out: AtomicU64,
    providers: DashMap<String, ProviderStats>,
}

impl EngineMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            comparisons_total: AtomicU64::new(0),
            comparisons_completed: AtomicU64::new(0),
            comparisons_failed: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            no_provider_rejections: AtomicU64::new(0),
            offers_succeeded: AtomicU64::new(0),
            offers_failed: AtomicU64::new(0),
            offers_timed_out: AtomicU64::new(0),
            providers: DashMap::new(),
        }
    }

    pub fn comparison_started(&self) {
        self.comparisons_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn comparison_completed(&self) {
        self.comparisons_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn comparison_failed(&self) {
        self.comparisons_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn validation_rejected(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn no_providers_rejected(&self) {
        self.no_provider_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one settled provider attempt.
    pub fn record_offer(&self, offer: &Offer) {
        let timed_out = offer.is_timeout();

        if offer.is_successful() {
            self.offers_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.offers_failed.fetch_add(1, Ordering::Relaxed);
            if timed_out {
                self.offers_timed_out.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut stats = self
            .providers
            .entry(offer.provider_name().to_string())
            .or_default();
        stats.attempts += 1;
        stats.total_latency += offer.response_duration();
        if offer.is_successful() {
            stats.successes += 1;
        } else {
            stats.failures += 1;
            if timed_out {
                stats.timeouts += 1;
            }
        }
    }

    /// Counters for one provider.
    pub fn provider_stats(&self, provider: &str) -> Option<ProviderStats> {
        self.providers.get(provider).map(|s| s.clone())
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut providers: Vec<(String, ProviderStats)> = self
            .providers
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        providers.sort_by(|a, b| a.0.cmp(&b.0));

        MetricsSnapshot {
            comparisons_total: self.comparisons_total.load(Ordering::Relaxed),
            comparisons_completed: self.comparisons_completed.load(Ordering::Relaxed),
            comparisons_failed: self.comparisons_failed.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            no_provider_rejections: self.no_provider_rejections.load(Ordering::Relaxed),
            offers_succeeded: self.offers_succeeded.load(Ordering::Relaxed),
            offers_failed: self.offers_failed.load(Ordering::Relaxed),
            offers_timed_out: self.offers_timed_out.load(Ordering::Relaxed),
            providers,
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();

        let counters = [
            (
                "comparisons_total",
                "Total comparisons started",
                snapshot.comparisons_total,
            ),
            (
                "comparisons_completed",
                "Comparisons that completed",
                snapshot.comparisons_completed,
            ),
            (
                "comparisons_failed",
                "Comparisons that failed",
                snapshot.comparisons_failed,
            ),
            (
                "validation_rejections",
                "Requests rejected by validation",
                snapshot.validation_rejections,
            ),
            (
                "no_provider_rejections",
                "Requests rejected with no providers",
                snapshot.no_provider_rejections,
            ),
            (
                "offers_succeeded",
                "Successful provider offers",
                snapshot.offers_succeeded,
            ),
            (
                "offers_failed",
                "Failed provider offers",
                snapshot.offers_failed,
            ),
            (
                "offers_timed_out",
                "Provider offers that timed out",
                snapshot.offers_timed_out,
            ),
        ];
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP ratecompare_{name} {help}");
            let _ = writeln!(out, "# TYPE ratecompare_{name} counter");
            let _ = writeln!(out, "ratecompare_{name} {value}\n");
        }

        let _ = writeln!(out, "# HELP ratecompare_provider_attempts Provider calls by outcome");
        let _ = writeln!(out, "# TYPE ratecompare_provider_attempts counter");
        for (name, stats) in &snapshot.providers {
            let _ = writeln!(
                out,
                "ratecompare_provider_attempts{{provider=\"{name}\",outcome=\"success\"}} {}",
                stats.successes
            );
            let _ = writeln!(
                out,
                "ratecompare_provider_attempts{{provider=\"{name}\",outcome=\"failure\"}} {}",
                stats.failures
            );
            let _ = writeln!(
                out,
                "ratecompare_provider_attempts{{provider=\"{name}\",outcome=\"timeout\"}} {}",
                stats.timeouts
            );
        }

        out
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the engine metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub comparisons_total: u64,
    pub comparisons_completed: u64,
    pub comparisons_failed: u64,
    pub validation_rejections: u64,
    pub no_provider_rejections: u64,
    pub offers_succeeded: u64,
    pub offers_failed: u64,
    pub offers_timed_out: u64,
    /// Per-provider counters, ordered by provider name.
    pub providers: Vec<(String, ProviderStats)>,
}
