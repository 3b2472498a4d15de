//! Fan-out orchestrator: ask every enabled provider concurrently and pick the
//! best offer.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::FutureExt;
use ratecompare_common::{category, ComparisonResult, CurrencyRequest, Deadline, Offer};
use ratecompare_providers::{ProviderError, RateProvider};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::metrics::EngineMetrics;

/// The comparison engine.
pub struct ComparisonEngine {
    providers: Vec<Arc<dyn RateProvider>>,
    config: EngineConfig,
    metrics: Arc<EngineMetrics>,
}

impl ComparisonEngine {
    /// Create an engine over `providers`, dispatched in the given order.
    pub fn new(providers: Vec<Arc<dyn RateProvider>>, config: EngineConfig) -> Self {
        Self {
            providers,
            config,
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Create an engine after validating its configuration.
    pub fn try_new(
        providers: Vec<Arc<dyn RateProvider>>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self::new(providers, config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// All registered providers, enabled or not.
    pub fn providers(&self) -> &[Arc<dyn RateProvider>] {
        &self.providers
    }

    /// Providers enabled by configuration, in dispatch order.
    pub fn available_providers(&self) -> Vec<Arc<dyn RateProvider>> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .cloned()
            .collect()
    }

    /// Compare every enabled provider's offer for `request`.
    pub async fn compare(&self, request: CurrencyRequest) -> EngineResult<ComparisonResult> {
        self.compare_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Compare with an external cancellation signal.
    ///
    /// Cancelling `cancel` resolves every in-flight provider call to a
    /// cancelled offer and marks the result `Failed`.
    #[instrument(
        skip(self, request, cancel),
        fields(pair = %request.pair(), amount = %request.amount())
    )]
    pub async fn compare_with_cancel(
        &self,
        request: CurrencyRequest,
        cancel: CancellationToken,
    ) -> EngineResult<ComparisonResult> {
        let started = Instant::now();

        if let Err(e) = request.ensure_within(self.config.max_amount) {
            self.metrics.validation_rejected();
            warn!(error = %e, "Rejected request");
            return Err(e.into());
        }

        let providers = self.available_providers();
        if providers.is_empty() {
            if self.config.fail_on_no_providers {
                self.metrics.no_providers_rejected();
                warn!("No providers available");
                return Err(EngineError::NoProvidersAvailable);
            }
            self.metrics.comparison_started();
            self.metrics.comparison_completed();
            info!("No providers available, returning empty result");
            return Ok(ComparisonResult::completed(
                request,
                Vec::new(),
                started.elapsed(),
            ));
        }

        self.metrics.comparison_started();

        if cancel.is_cancelled() {
            self.metrics.comparison_failed();
            warn!("Request cancelled before dispatch");
            return Ok(ComparisonResult::failed(
                request,
                Vec::new(),
                "request cancelled before dispatch",
                started.elapsed(),
            ));
        }

        // Cancels in-flight provider tasks if this future is dropped.
        let run = cancel.child_token();
        let _guard = run.clone().drop_guard();

        let overall = Deadline::after(self.config.overall_timeout);
        let (dispatched, tasks): (Vec<Instant>, Vec<_>) = providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let request = request.clone();
                let deadline = Deadline::after(provider.timeout()).min(overall);
                let cancel = run.child_token();
                let dispatched = Instant::now();
                (dispatched, tokio::spawn(call_provider(provider, request, deadline, cancel)))
            })
            .unzip();

        debug!(dispatched = tasks.len(), "Dispatched provider calls");

        let offers: Vec<Offer> = join_all(tasks)
            .await
            .into_iter()
            .zip(providers.iter().zip(dispatched))
            .map(|(joined, (provider, dispatched))| match joined {
                Ok(offer) => offer,
                Err(e) => {
                    error!(provider = provider.name(), error = %e, "Provider task aborted");
                    let reason = if e.is_panic() { "panicked" } else { "was aborted" };
                    Offer::failure(
                        provider.name(),
                        ProviderError::Internal(format!("provider task {reason}")).offer_message(),
                        dispatched.elapsed(),
                    )
                }
            })
            .collect();

        for offer in &offers {
            self.metrics.record_offer(offer);
        }

        let interrupted = offers
            .iter()
            .any(|o| o.failure_category() == Some(category::CANCELLED));
        if interrupted {
            self.metrics.comparison_failed();
            warn!("Request cancelled while providers were in flight");
            return Ok(ComparisonResult::failed(
                request,
                offers,
                "request cancelled while providers were in flight",
                started.elapsed(),
            ));
        }

        let result = ComparisonResult::completed(request, offers, started.elapsed());
        self.metrics.comparison_completed();

        info!(
            comparison_id = %result.id(),
            successful = result.successful_count(),
            failed = result.failed_count(),
            best_provider = result.best_offer().map(|o| o.provider_name()).unwrap_or("none"),
            duration_ms = result.processing_duration().as_millis() as u64,
            "Comparison completed"
        );

        Ok(result)
    }
}

/// Run one provider call bounded by `deadline` and `cancel`. Always yields
/// an offer.
async fn call_provider(
    provider: Arc<dyn RateProvider>,
    request: CurrencyRequest,
    deadline: Deadline,
    cancel: CancellationToken,
) -> Offer {
    let started = Instant::now();
    let until = tokio::time::Instant::from_std(deadline.instant());

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(provider = provider.name(), "Provider call cancelled");
            Offer::failure(
                provider.name(),
                ProviderError::Cancelled.offer_message(),
                started.elapsed(),
            )
        }
        outcome = tokio::time::timeout_at(
            until,
            AssertUnwindSafe(provider.get_offer(&request, deadline)).catch_unwind(),
        ) => {
            match outcome {
                Ok(Ok(offer)) => offer,
                Ok(Err(_)) => {
                    error!(provider = provider.name(), "Provider task panicked");
                    Offer::failure(
                        provider.name(),
                        ProviderError::Internal("provider task panicked".to_string())
                            .offer_message(),
                        started.elapsed(),
                    )
                }
                Err(_) => {
                    warn!(
                        provider = provider.name(),
                        budget_ms = deadline.budget().as_millis() as u64,
                        "Provider call timed out"
                    );
                    Offer::failure(
                        provider.name(),
                        ProviderError::Timeout(deadline.budget()).offer_message(),
                        started.elapsed(),
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ratecompare_common::ComparisonStatus;
    use ratecompare_providers::{MockBehavior, MockRateProvider};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Answers immediately, cancelling `token` as it does.
    struct CancelsOnAnswer {
        token: CancellationToken,
    }

    #[async_trait]
    impl RateProvider for CancelsOnAnswer {
        fn name(&self) -> &str {
            "cancels-on-answer"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        async fn get_offer(&self, request: &CurrencyRequest, _deadline: Deadline) -> Offer {
            self.token.cancel();
            Offer::success(self.name(), request.amount(), dec!(1), Duration::ZERO)
        }

        async fn health_check(&self, _deadline: Deadline) -> bool {
            true
        }
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Never answers; records when its in-flight call is dropped.
    struct Abandoned {
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl RateProvider for Abandoned {
        fn name(&self) -> &str {
            "abandoned"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(30)
        }

        async fn get_offer(&self, _request: &CurrencyRequest, _deadline: Deadline) -> Offer {
            let _flag = SetOnDrop(Arc::clone(&self.dropped));
            std::future::pending::<Offer>().await
        }

        async fn health_check(&self, _deadline: Deadline) -> bool {
            true
        }
    }

    fn request() -> CurrencyRequest {
        CurrencyRequest::parse("USD", "EUR", dec!(1000)).unwrap()
    }

    fn engine(providers: Vec<Arc<MockRateProvider>>, config: EngineConfig) -> ComparisonEngine {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn RateProvider>)
            .collect();
        ComparisonEngine::new(providers, config)
    }

    #[tokio::test]
    async fn test_best_offer_and_savings() {
        let engine = engine(
            vec![
                Arc::new(MockRateProvider::new("a", dec!(0.100))),
                Arc::new(MockRateProvider::new("b", dec!(0.120))),
                Arc::new(MockRateProvider::new("c", dec!(0.090))),
            ],
            EngineConfig::default(),
        );

        let result = engine.compare(request()).await.unwrap();

        assert_eq!(result.status(), ComparisonStatus::Completed);
        assert_eq!(result.all_offers().len(), 3);
        let best = result.best_offer().unwrap();
        assert_eq!(best.provider_name(), "b");
        assert_eq!(best.converted_amount(), dec!(120));
        assert_eq!(result.savings(), dec!(30));
    }

    #[tokio::test]
    async fn test_tie_resolves_to_first_dispatched() {
        let engine = engine(
            vec![
                Arc::new(
                    MockRateProvider::new("slow", dec!(0.9)).with_delay(Duration::from_millis(80)),
                ),
                Arc::new(MockRateProvider::new("fast", dec!(0.9))),
            ],
            EngineConfig::default(),
        );

        let result = engine.compare(request()).await.unwrap();

        assert_eq!(result.best_offer().unwrap().provider_name(), "slow");
        let names: Vec<&str> = result.all_offers().iter().map(|o| o.provider_name()).collect();
        assert_eq!(names, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_affect_other_providers() {
        let engine = engine(
            vec![
                Arc::new(MockRateProvider::failing("broken", "connection refused")),
                Arc::new(MockRateProvider::with_behavior("panics", MockBehavior::Panic)),
                Arc::new(MockRateProvider::new("good", dec!(1.1))),
            ],
            EngineConfig::default(),
        );

        let result = engine.compare(request()).await.unwrap();

        assert_eq!(result.status(), ComparisonStatus::Completed);
        assert_eq!(result.successful_count(), 1);
        assert_eq!(result.best_offer().unwrap().provider_name(), "good");

        let offers = result.all_offers();
        assert_eq!(
            offers[0].error_message(),
            Some("transport error: connection refused")
        );
        assert_eq!(
            offers[1].error_message(),
            Some("internal error: provider task panicked")
        );
    }

    #[tokio::test]
    async fn test_hanging_provider_times_out() {
        let hanging = Arc::new(
            MockRateProvider::with_behavior("hangs", MockBehavior::Hang)
                .with_timeout(Duration::from_millis(100)),
        );
        let engine = engine(
            vec![hanging, Arc::new(MockRateProvider::new("good", dec!(0.5)))],
            EngineConfig::default(),
        );

        let started = Instant::now();
        let result = engine.compare(request()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.status(), ComparisonStatus::Completed);

        let timed_out = &result.all_offers()[0];
        assert!(!timed_out.is_successful());
        assert_eq!(timed_out.provider_name(), "hangs");
        assert_eq!(timed_out.error_message(), Some("timeout: no response within 100ms"));
        assert_eq!(result.best_offer().unwrap().provider_name(), "good");
        assert_eq!(engine.metrics().snapshot().offers_timed_out, 1);
    }

    #[tokio::test]
    async fn test_overall_timeout_caps_provider_timeout() {
        let config = EngineConfig {
            overall_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let engine = engine(
            vec![Arc::new(
                MockRateProvider::new("slow", dec!(1))
                    .with_delay(Duration::from_secs(5))
                    .with_timeout(Duration::from_secs(30)),
            )],
            config,
        );

        let started = Instant::now();
        let result = engine.compare(request()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(result.best_offer().is_none());
        assert!(result.all_offers()[0]
            .error_message()
            .unwrap()
            .starts_with("timeout"));
    }

    #[tokio::test]
    async fn test_providers_run_concurrently() {
        let delay = Duration::from_millis(200);
        let engine = engine(
            vec![
                Arc::new(MockRateProvider::new("a", dec!(1)).with_delay(delay)),
                Arc::new(MockRateProvider::new("b", dec!(1)).with_delay(delay)),
                Arc::new(MockRateProvider::new("c", dec!(1)).with_delay(delay)),
            ],
            EngineConfig::default(),
        );

        let started = Instant::now();
        let result = engine.compare(request()).await.unwrap();

        assert_eq!(result.successful_count(), 3);
        assert!(started.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_no_successful_offers_is_still_completed() {
        let engine = engine(
            vec![
                Arc::new(MockRateProvider::failing("a", "down")),
                Arc::new(MockRateProvider::failing("b", "down")),
            ],
            EngineConfig::default(),
        );

        let result = engine.compare(request()).await.unwrap();

        assert_eq!(result.status(), ComparisonStatus::Completed);
        assert!(result.best_offer().is_none());
        assert_eq!(result.failed_count(), 2);
        assert_eq!(result.savings(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_all_disabled_returns_empty_completed() {
        let a = Arc::new(MockRateProvider::new("a", dec!(1)).unavailable());
        let b = Arc::new(MockRateProvider::new("b", dec!(1)).unavailable());
        let engine = engine(vec![a.clone(), b.clone()], EngineConfig::default());

        let result = engine.compare(request()).await.unwrap();

        assert_eq!(result.status(), ComparisonStatus::Completed);
        assert!(result.all_offers().is_empty());
        assert!(result.best_offer().is_none());
        assert_eq!(a.offer_calls() + b.offer_calls(), 0);
    }

    #[tokio::test]
    async fn test_all_disabled_fails_fast_when_configured() {
        let a = Arc::new(MockRateProvider::new("a", dec!(1)).unavailable());
        let config = EngineConfig {
            fail_on_no_providers: true,
            ..Default::default()
        };
        let engine = engine(vec![a.clone()], config);

        let result = engine.compare(request()).await;

        assert!(matches!(result, Err(EngineError::NoProvidersAvailable)));
        assert_eq!(a.offer_calls(), 0);
        assert_eq!(engine.metrics().snapshot().no_provider_rejections, 1);
    }

    #[tokio::test]
    async fn test_disabled_provider_is_skipped() {
        let off = Arc::new(MockRateProvider::new("off", dec!(5)).unavailable());
        let on = Arc::new(MockRateProvider::new("on", dec!(1)));
        let engine = engine(vec![off.clone(), on.clone()], EngineConfig::default());

        let result = engine.compare(request()).await.unwrap();

        assert_eq!(result.all_offers().len(), 1);
        assert_eq!(result.best_offer().unwrap().provider_name(), "on");
        assert_eq!(off.offer_calls(), 0);
        assert_eq!(on.offer_calls(), 1);
    }

    #[tokio::test]
    async fn test_amount_above_limit_rejected_before_dispatch() {
        let a = Arc::new(MockRateProvider::new("a", dec!(1)));
        let config = EngineConfig {
            max_amount: dec!(500),
            ..Default::default()
        };
        let engine = engine(vec![a.clone()], config);

        let result = engine.compare(request()).await;

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(a.offer_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch_fails() {
        let a = Arc::new(MockRateProvider::new("a", dec!(1)));
        let engine = engine(vec![a.clone()], EngineConfig::default());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = engine.compare_with_cancel(request(), cancel).await.unwrap();

        assert_eq!(result.status(), ComparisonStatus::Failed);
        assert_eq!(result.error(), Some("request cancelled before dispatch"));
        assert!(result.all_offers().is_empty());
        assert_eq!(a.offer_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_resolves_every_offer() {
        let engine = engine(
            vec![
                Arc::new(MockRateProvider::with_behavior("hangs", MockBehavior::Hang)),
                Arc::new(MockRateProvider::new("slow", dec!(1)).with_delay(Duration::from_secs(5))),
            ],
            EngineConfig::default(),
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = engine.compare_with_cancel(request(), cancel).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.status(), ComparisonStatus::Failed);
        assert_eq!(result.all_offers().len(), 2);
        for offer in result.all_offers() {
            assert!(offer.error_message().unwrap().starts_with("cancelled"));
        }
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let engine = engine(
            vec![
                Arc::new(MockRateProvider::new("a", dec!(1))),
                Arc::new(MockRateProvider::failing("b", "down")),
            ],
            EngineConfig::default(),
        );

        engine.compare(request()).await.unwrap();
        engine.compare(request()).await.unwrap();

        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.comparisons_total, 2);
        assert_eq!(snapshot.comparisons_completed, 2);
        assert_eq!(snapshot.offers_succeeded, 2);
        assert_eq!(snapshot.offers_failed, 2);
        assert_eq!(engine.metrics().provider_stats("b").unwrap().failures, 2);
    }

    #[tokio::test]
    async fn test_panic_offer_carries_own_duration() {
        let engine = engine(
            vec![
                Arc::new(
                    MockRateProvider::with_behavior("panics", MockBehavior::Panic)
                        .with_delay(Duration::from_millis(20)),
                ),
                Arc::new(
                    MockRateProvider::new("slow", dec!(1)).with_delay(Duration::from_millis(400)),
                ),
            ],
            EngineConfig::default(),
        );

        let result = engine.compare(request()).await.unwrap();

        let panicked = &result.all_offers()[0];
        assert_eq!(
            panicked.error_message(),
            Some("internal error: provider task panicked")
        );
        assert!(panicked.response_duration() >= Duration::from_millis(20));
        assert!(panicked.response_duration() < Duration::from_millis(300));
        assert!(result.all_offers()[1].is_successful());
    }

    #[tokio::test]
    async fn test_cancel_after_all_settled_stays_completed() {
        let cancel = CancellationToken::new();
        let providers: Vec<Arc<dyn RateProvider>> = vec![Arc::new(CancelsOnAnswer {
            token: cancel.clone(),
        })];
        let engine = ComparisonEngine::new(providers, EngineConfig::default());

        let result = engine
            .compare_with_cancel(request(), cancel.clone())
            .await
            .unwrap();

        assert!(cancel.is_cancelled());
        assert_eq!(result.status(), ComparisonStatus::Completed);
        assert_eq!(result.error(), None);
        assert_eq!(result.successful_count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_comparison_cancels_in_flight_calls() {
        let dropped = Arc::new(AtomicBool::new(false));
        let providers: Vec<Arc<dyn RateProvider>> = vec![Arc::new(Abandoned {
            dropped: Arc::clone(&dropped),
        })];
        let engine = ComparisonEngine::new(providers, EngineConfig::default());
        let cancel = CancellationToken::new();

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            engine.compare_with_cancel(request(), cancel.clone()),
        )
        .await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!cancel.is_cancelled());
    }
}
