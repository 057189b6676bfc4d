use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One upstream search call, with filters already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamQuery {
    pub query: String,
    pub condition: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub offset: u64,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceItem {
    pub item_id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub seller_score: Option<f64>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// A page of upstream results. This is also the cached payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceSearch {
    pub items: Vec<MarketplaceItem>,
    #[serde(default)]
    pub total: Option<u64>,
    /// Errors reported inside an otherwise successful response.
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl MarketplaceSearch {
    /// Whether the page may be stored in the search cache.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        !self.items.is_empty() && self.errors.is_empty()
    }
}

/// The subset of item details the availability classifier reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDetails {
    pub item_id: String,
    pub end_date: Option<DateTime<Utc>>,
    /// Every `estimatedAvailabilityStatus` the listing reports, in order.
    pub availability_statuses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemLookup {
    Found(ItemDetails),
    NotFound { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("Marketplace request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Marketplace API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected marketplace response: {0}")]
    Decode(String),

    #[error("Marketplace client is not configured: {0}")]
    NotConfigured(String),
}

/// Upstream listing source.
///
/// Implementations are network bound and may fail at any call; callers
/// decide how each failure is classified.
#[async_trait::async_trait]
pub trait Marketplace: Send + Sync {
    async fn search(&self, query: &UpstreamQuery) -> Result<MarketplaceSearch, MarketplaceError>;

    async fn item_details(&self, item_id: &str) -> Result<ItemLookup, MarketplaceError>;
}
