//! Provider health aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use ratecompare_common::Deadline;
use ratecompare_providers::RateProvider;
use tracing::{debug, instrument, warn};

use crate::engine::ComparisonEngine;

impl ComparisonEngine {
    /// Probe every registered provider concurrently.
    ///
    /// Disabled providers report `false` without being contacted. A probe
    /// that times out or panics reports `false`.
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> BTreeMap<String, bool> {
        let overall = Deadline::after(self.config().overall_timeout);

        let probes: Vec<_> = self
            .providers()
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let deadline = Deadline::after(provider.timeout()).min(overall);
                tokio::spawn(probe(provider, deadline))
            })
            .collect();

        let mut report = BTreeMap::new();
        for (joined, provider) in join_all(probes).await.into_iter().zip(self.providers()) {
            let healthy = joined.unwrap_or_else(|e| {
                warn!(provider = provider.name(), error = %e, "Health probe aborted");
                false
            });
            report.insert(provider.name().to_string(), healthy);
        }

        debug!(
            healthy = report.values().filter(|h| **h).count(),
            total = report.len(),
            "Health check finished"
        );
        report
    }
}

async fn probe(provider: Arc<dyn RateProvider>, deadline: Deadline) -> bool {
    if !provider.is_available() {
        return false;
    }

    let until = tokio::time::Instant::from_std(deadline.instant());
    match tokio::time::timeout_at(until, provider.health_check(deadline)).await {
        Ok(healthy) => healthy,
        Err(_) => {
            warn!(provider = provider.name(), "Health probe timed out");
            false
        }
    }
}
