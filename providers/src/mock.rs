//! Mock provider for testing.

use async_trait::async_trait;
use ratecompare_common::{CurrencyRequest, Deadline, Offer};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::error::ProviderError;
use crate::provider::{into_offer, Quote, RateProvider};

/// What the mock does once its delay has elapsed.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer with this rate.
    Rate(Decimal),
    /// Answer with a failure.
    Fail(String),
    /// Never answer.
    Hang,
    /// Panic inside the call.
    Panic,
}

/// In-memory provider with scripted behavior and call counters.
pub struct MockRateProvider {
    name: String,
    available: bool,
    healthy: bool,
    behavior: MockBehavior,
    delay: Duration,
    timeout: Duration,
    offer_calls: AtomicUsize,
    health_calls: AtomicUsize,
}

impl MockRateProvider {
    /// Create a mock answering with `rate`.
    pub fn new(name: impl Into<String>, rate: Decimal) -> Self {
        Self::with_behavior(name, MockBehavior::Rate(rate))
    }

    /// Create a mock that always fails with `message`.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_behavior(name, MockBehavior::Fail(message.into()))
    }

    pub fn with_behavior(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            available: true,
            healthy: true,
            behavior,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            offer_calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Number of `get_offer` calls received.
    pub fn offer_calls(&self) -> usize {
        self.offer_calls.load(Ordering::SeqCst)
    }

    /// Number of `health_check` calls received.
    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    async fn settle(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behavior {
            MockBehavior::Hang => std::future::pending::<()>().await,
            MockBehavior::Panic => panic!("mock provider {} panicked", self.name),
            _ => {}
        }
    }
}

#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_offer(&self, request: &CurrencyRequest, _deadline: Deadline) -> Offer {
        self.offer_calls.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        self.settle().await;

        let result = match &self.behavior {
            MockBehavior::Rate(rate) => Quote::from_rate(request.amount(), *rate),
            MockBehavior::Fail(message) => Err(ProviderError::Transport(message.clone())),
            MockBehavior::Hang | MockBehavior::Panic => {
                Err(ProviderError::Internal("unreachable mock state".to_string()))
            }
        };
        into_offer(&self.name, result, started.elapsed())
    }

    async fn health_check(&self, _deadline: Deadline) -> bool {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.settle().await;
        self.healthy
    }
}
