//! Domain primitives shared by the feed, session and freshness subsystems.
//!
//! Newtypes keep user identifiers from being mixed with upstream item ids,
//! and the availability enum is the single source of truth for whether a
//! saved item is shown to its owner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of an authenticated user, as asserted by the auth layer in front
/// of this service.
///
/// # Examples
///
/// ```rust
/// use swipecart::domain::UserId;
///
/// let id = UserId::new("user-42");
/// assert_eq!(id.as_str(), "user-42");
/// assert_eq!(id.to_string(), "user-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Request-scoped identity threaded explicitly through service calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: UserId,
}

impl UserContext {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
        }
    }
}

/// Live availability of a saved listing.
///
/// Items are never deleted by the freshness pipeline; a non-active status
/// hides them from the owner while keeping the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    InStock,
    LimitedStock,
    OutOfStock,
    Ended,
    NotFound,
    UnknownAvailability,
}

impl AvailabilityStatus {
    pub const ALL: [Self; 6] = [
        Self::InStock,
        Self::LimitedStock,
        Self::OutOfStock,
        Self::Ended,
        Self::NotFound,
        Self::UnknownAvailability,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "IN_STOCK",
            Self::LimitedStock => "LIMITED_STOCK",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::Ended => "ENDED",
            Self::NotFound => "NOT_FOUND",
            Self::UnknownAvailability => "UNKNOWN_AVAILABILITY",
        }
    }

    /// Whether the upstream listing can still be bought.
    ///
    /// Unknown counts as available: missing stock data is not evidence that
    /// the listing is gone.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(
            self,
            Self::InStock | Self::LimitedStock | Self::UnknownAvailability
        )
    }

    /// Statuses that keep an item in its owner's active list. Includes
    /// `UNKNOWN_AVAILABILITY`: a failed or inconclusive check leaves the item
    /// visible rather than hiding it on uncertain data.
    #[must_use]
    pub fn active_statuses() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.is_available())
            .map(Self::as_str)
            .collect()
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvailabilityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown availability status: {s}"))
    }
}

/// Result of a single swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeOutcome {
    Accept,
    Reject,
    Skip,
}

impl SwipeOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for SwipeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_round_trips_through_str() {
        for status in AvailabilityStatus::ALL {
            assert_eq!(status.as_str().parse::<AvailabilityStatus>(), Ok(status));
        }
        assert!("SOLD".parse::<AvailabilityStatus>().is_err());
    }

    #[test]
    fn only_negative_evidence_is_unavailable() {
        assert!(AvailabilityStatus::InStock.is_available());
        assert!(AvailabilityStatus::LimitedStock.is_available());
        assert!(AvailabilityStatus::UnknownAvailability.is_available());
        assert!(!AvailabilityStatus::OutOfStock.is_available());
        assert!(!AvailabilityStatus::Ended.is_available());
        assert!(!AvailabilityStatus::NotFound.is_available());
    }

    #[test]
    fn active_statuses_match_availability() {
        let active = AvailabilityStatus::active_statuses();
        assert_eq!(
            active,
            vec!["IN_STOCK", "LIMITED_STOCK", "UNKNOWN_AVAILABILITY"]
        );
    }

    #[test]
    fn swipe_outcome_serializes_lowercase() {
        let json = serde_json::to_string(&SwipeOutcome::Accept).unwrap();
        assert_eq!(json, "\"accept\"");
    }
}
