use serde::{Deserialize, Serialize};

use crate::db::SavedItem;
use crate::services::{FeedRequest, SearchFilters};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Query string of `GET /api/feed`. Kept flat because url-encoded numbers
/// do not survive `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub query: String,
    pub condition: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub page_size: Option<u32>,
    pub start: Option<u32>,
    #[serde(default)]
    pub advance: bool,
}

impl From<FeedQuery> for FeedRequest {
    fn from(q: FeedQuery) -> Self {
        let mut request = Self::new(q.query);
        request.filters = SearchFilters {
            condition: q.condition,
            category: q.category,
            min_price: q.min_price,
            max_price: q.max_price,
        };
        if let Some(page_size) = q.page_size {
            request.page_size = page_size;
        }
        request.start = q.start.unwrap_or(0);
        request.advance = q.advance;
        request
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InteractionReceipt {
    pub recorded: usize,
}

#[derive(Debug, Serialize)]
pub struct ActiveItemsResponse {
    pub items: Vec<SavedItem>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub uptime_seconds: u64,
    pub version: &'static str,
}
