//! Aggregate of every provider offer for one request, plus the best one.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::time::{self, Timestamp};
use crate::{CurrencyRequest, Offer};

/// Overall outcome of an orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonStatus {
    /// The run finished; individual providers may still have failed.
    Completed,
    /// The orchestrator itself failed.
    Failed,
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonStatus::Completed => write!(f, "Completed"),
            ComparisonStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Index of the successful offer with the greatest converted amount.
///
/// Ties keep the earliest offer in `offers`.
pub fn select_best(offers: &[Offer]) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;
    for (idx, offer) in offers.iter().enumerate() {
        if !offer.is_successful() {
            continue;
        }
        match best {
            Some((_, amount)) if offer.converted_amount() <= amount => {}
            _ => best = Some((idx, offer.converted_amount())),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Result of comparing all provider offers for a request.
///
/// Only derived views are computed on demand; the offers themselves are
/// fixed at construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    id: Uuid,
    status: ComparisonStatus,
    input: CurrencyRequest,
    best_offer: Option<Offer>,
    all_offers: Vec<Offer>,
    error: Option<String>,
    processed_at: Timestamp,
    #[serde(with = "time::duration_ms")]
    processing_duration: Duration,
}

impl ComparisonResult {
    /// Completed run over `offers` in dispatch order.
    pub fn completed(
        input: CurrencyRequest,
        offers: Vec<Offer>,
        processing_duration: Duration,
    ) -> Self {
        Self::assemble(
            ComparisonStatus::Completed,
            input,
            offers,
            None,
            processing_duration,
        )
    }

    /// Orchestrator-level failure. Offers gathered before the failure are kept.
    pub fn failed(
        input: CurrencyRequest,
        offers: Vec<Offer>,
        reason: impl Into<String>,
        processing_duration: Duration,
    ) -> Self {
        Self::assemble(
            ComparisonStatus::Failed,
            input,
            offers,
            Some(reason.into()),
            processing_duration,
        )
    }

    fn assemble(
        status: ComparisonStatus,
        input: CurrencyRequest,
        all_offers: Vec<Offer>,
        error: Option<String>,
        processing_duration: Duration,
    ) -> Self {
        let best_offer = select_best(&all_offers).map(|idx| all_offers[idx].clone());
        Self {
            id: Uuid::now_v7(),
            status,
            input,
            best_offer,
            all_offers,
            error,
            processed_at: time::now(),
            processing_duration,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> ComparisonStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == ComparisonStatus::Completed
    }

    pub fn input(&self) -> &CurrencyRequest {
        &self.input
    }

    pub fn best_offer(&self) -> Option<&Offer> {
        self.best_offer.as_ref()
    }

    pub fn all_offers(&self) -> &[Offer] {
        &self.all_offers
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn processed_at(&self) -> Timestamp {
        self.processed_at
    }

    pub fn processing_duration(&self) -> Duration {
        self.processing_duration
    }

    /// Successful offers, highest converted amount first.
    pub fn successful_offers(&self) -> Vec<&Offer> {
        let mut offers: Vec<&Offer> = self
            .all_offers
            .iter()
            .filter(|o| o.is_successful())
            .collect();
        offers.sort_by(|a, b| b.converted_amount().cmp(&a.converted_amount()));
        offers
    }

    /// Failed offers ordered by provider name.
    pub fn failed_offers(&self) -> Vec<&Offer> {
        let mut offers: Vec<&Offer> = self
            .all_offers
            .iter()
            .filter(|o| !o.is_successful())
            .collect();
        offers.sort_by(|a, b| a.provider_name().cmp(b.provider_name()));
        offers
    }

    pub fn successful_count(&self) -> usize {
        self.all_offers.iter().filter(|o| o.is_successful()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.all_offers.len() - self.successful_count()
    }

    /// Successful offer with the lowest converted amount.
    pub fn worst_offer(&self) -> Option<&Offer> {
        self.all_offers
            .iter()
            .filter(|o| o.is_successful())
            .min_by(|a, b| a.converted_amount().cmp(&b.converted_amount()))
    }

    /// Difference between the best and worst successful offer.
    pub fn savings(&self) -> Decimal {
        if self.successful_count() < 2 {
            return Decimal::ZERO;
        }
        match (self.best_offer(), self.worst_offer()) {
            (Some(best), Some(worst)) => best.converted_amount() - worst.converted_amount(),
            _ => Decimal::ZERO,
        }
    }

    /// Mean provider response time across all offers.
    pub fn average_response_duration(&self) -> Duration {
        if self.all_offers.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.all_offers.iter().map(|o| o.response_duration()).sum();
        total / self.all_offers.len() as u32
    }
}
