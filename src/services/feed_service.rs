//! Search feed: fingerprint, session and cache wired into one request path.

use crate::clients::MarketplaceItem;
use crate::domain::UserContext;
use crate::services::fingerprint::SearchFilters;
use crate::services::session_service::SessionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;
pub const MAX_QUERY_LENGTH: usize = 200;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Marketplace error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for FeedError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for FeedError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<SessionError> for FeedError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(msg) => Self::Validation(msg),
            other => Self::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedRequest {
    pub query: String,
    #[serde(flatten)]
    pub filters: SearchFilters,
    /// Items returned to the client from the upstream page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Position inside the current upstream page.
    #[serde(default)]
    pub start: u32,
    /// The client ran out of items: move the session to the next upstream page.
    #[serde(default)]
    pub advance: bool,
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl FeedRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: SearchFilters::default(),
            page_size: DEFAULT_PAGE_SIZE,
            start: 0,
            advance: false,
        }
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(FeedError::Validation("Query cannot be empty".to_string()));
        }
        if query.chars().count() > MAX_QUERY_LENGTH {
            return Err(FeedError::Validation(format!(
                "Query too long (max {MAX_QUERY_LENGTH} characters)"
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(FeedError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        for (name, price) in [
            ("min_price", self.filters.min_price),
            ("max_price", self.filters.max_price),
        ] {
            if price.is_some_and(|p| !p.is_finite() || p < 0.0) {
                return Err(FeedError::Validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.filters.min_price, self.filters.max_price)
            && min > max
        {
            return Err(FeedError::Validation(
                "min_price cannot exceed max_price".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPage {
    pub session_id: i32,
    pub fingerprint: String,
    /// Offset of the upstream page the items come from.
    pub offset: u64,
    pub start: u32,
    pub items: Vec<MarketplaceItem>,
    /// Items remaining in the upstream page after this slice.
    pub remaining_in_page: usize,
    pub from_cache: bool,
    pub items_seen: u64,
}

#[async_trait::async_trait]
pub trait FeedService: Send + Sync {
    async fn search(&self, user: &UserContext, request: FeedRequest)
    -> Result<FeedPage, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_is_rejected() {
        assert!(FeedRequest::new("   ").validate().is_err());
    }

    #[test]
    fn page_size_is_bounded() {
        let mut request = FeedRequest::new("camera");
        request.page_size = MAX_PAGE_SIZE + 1;
        assert!(request.validate().is_err());
        request.page_size = MAX_PAGE_SIZE;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let mut request = FeedRequest::new("camera");
        request.filters.min_price = Some(50.0);
        request.filters.max_price = Some(10.0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut request = FeedRequest::new("camera");
        request.filters.min_price = Some(-1.0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn deserializes_flat_query_params() {
        let request: FeedRequest = serde_json::from_str(
            r#"{"query": "vintage camera", "min_price": 10, "max_price": 200}"#,
        )
        .unwrap();
        assert_eq!(request.filters.min_price, Some(10.0));
        assert_eq!(request.page_size, DEFAULT_PAGE_SIZE);
        assert!(!request.advance);
    }
}
