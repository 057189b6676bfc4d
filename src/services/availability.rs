//! Live availability classification for a single saved item.
//!
//! The rules favour keeping an item visible: only a positive signal from
//! upstream (not found, ended, out of stock) marks it unavailable, and a
//! failed lookup is kept apart from a real negative.

use crate::clients::{ItemDetails, ItemLookup, Marketplace};
use crate::domain::AvailabilityStatus;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Outcome of one check, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityCheck {
    Determined(AvailabilityStatus),
    /// The lookup itself failed. This is a measurement failure, not a fact
    /// about the listing.
    CheckFailed { reason: String },
}

impl AvailabilityCheck {
    /// The status written back to the catalog.
    #[must_use]
    pub const fn persisted_status(&self) -> AvailabilityStatus {
        match self {
            Self::Determined(status) => *status,
            Self::CheckFailed { .. } => AvailabilityStatus::UnknownAvailability,
        }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.persisted_status().is_available()
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::CheckFailed { .. })
    }
}

#[async_trait::async_trait]
pub trait AvailabilityChecker: Send + Sync {
    /// Classifies one upstream item.
    ///
    /// Implementations should report upstream trouble as
    /// [`AvailabilityCheck::CheckFailed`]; an `Err` is reserved for failures
    /// of the checker itself.
    async fn check(&self, upstream_item_id: &str) -> anyhow::Result<AvailabilityCheck>;
}

/// Classifies a successful lookup. Rules apply in order: not found, ended,
/// explicit stock data, then unknown.
#[must_use]
pub fn classify(lookup: &ItemLookup, now: DateTime<Utc>) -> AvailabilityStatus {
    match lookup {
        ItemLookup::NotFound { .. } => AvailabilityStatus::NotFound,
        ItemLookup::Found(details) => classify_details(details, now),
    }
}

fn classify_details(details: &ItemDetails, now: DateTime<Utc>) -> AvailabilityStatus {
    if details.end_date.is_some_and(|end| end < now) {
        return AvailabilityStatus::Ended;
    }

    // Multi-variation listings report one entry per variation; the most
    // available one wins.
    details
        .availability_statuses
        .iter()
        .map(String::as_str)
        .map(stock_status)
        .max_by_key(|status| stock_rank(*status))
        .unwrap_or(AvailabilityStatus::UnknownAvailability)
}

fn stock_status(raw: &str) -> AvailabilityStatus {
    match raw.trim().to_ascii_uppercase().as_str() {
        "OUT_OF_STOCK" => AvailabilityStatus::OutOfStock,
        "LIMITED_STOCK" => AvailabilityStatus::LimitedStock,
        _ => AvailabilityStatus::InStock,
    }
}

const fn stock_rank(status: AvailabilityStatus) -> u8 {
    match status {
        AvailabilityStatus::InStock => 2,
        AvailabilityStatus::LimitedStock => 1,
        _ => 0,
    }
}

/// Checker backed by the marketplace item details endpoint.
pub struct MarketplaceAvailabilityChecker {
    marketplace: Arc<dyn Marketplace>,
}

impl MarketplaceAvailabilityChecker {
    #[must_use]
    pub fn new(marketplace: Arc<dyn Marketplace>) -> Self {
        Self { marketplace }
    }
}

#[async_trait::async_trait]
impl AvailabilityChecker for MarketplaceAvailabilityChecker {
    async fn check(&self, upstream_item_id: &str) -> anyhow::Result<AvailabilityCheck> {
        match self.marketplace.item_details(upstream_item_id).await {
            Ok(lookup) => {
                let status = classify(&lookup, Utc::now());
                debug!(item_id = upstream_item_id, status = %status, "Classified item");
                Ok(AvailabilityCheck::Determined(status))
            }
            Err(e) => Ok(AvailabilityCheck::CheckFailed {
                reason: e.to_string(),
            }),
        }
    }
}
