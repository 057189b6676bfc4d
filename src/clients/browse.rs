use super::marketplace::{
    ItemDetails, ItemLookup, Marketplace, MarketplaceError, MarketplaceItem, MarketplaceSearch,
    UpstreamQuery,
};
use crate::config::MarketplaceConfig;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

const SEARCH_PATH: &str = "/buy/browse/v1/item_summary/search";
const ITEM_PATH: &str = "/buy/browse/v1/item/";
const MARKETPLACE_HEADER: &str = "X-EBAY-C-MARKETPLACE-ID";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(rename = "itemSummaries", default)]
    item_summaries: Vec<ItemSummary>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    warnings: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ItemSummary {
    #[serde(rename = "itemId")]
    item_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    image: Option<Image>,
    #[serde(default)]
    price: Option<Amount>,
    #[serde(default)]
    seller: Option<Seller>,
    #[serde(default)]
    condition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    value: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Seller {
    #[serde(rename = "feedbackPercentage")]
    feedback_percentage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    #[serde(rename = "itemId")]
    item_id: String,
    #[serde(rename = "itemEndDate", default)]
    item_end_date: Option<String>,
    #[serde(rename = "estimatedAvailabilities", default)]
    estimated_availabilities: Vec<EstimatedAvailability>,
}

#[derive(Debug, Deserialize)]
struct EstimatedAvailability {
    #[serde(rename = "estimatedAvailabilityStatus")]
    estimated_availability_status: Option<String>,
}

impl From<ItemSummary> for MarketplaceItem {
    fn from(summary: ItemSummary) -> Self {
        let (price, currency) = summary
            .price
            .map_or((None, None), |p| {
                (p.value.and_then(|v| v.parse().ok()), p.currency)
            });

        Self {
            item_id: summary.item_id,
            title: summary.title,
            image_url: summary.image.and_then(|i| i.image_url),
            price,
            currency,
            seller_score: summary
                .seller
                .and_then(|s| s.feedback_percentage)
                .and_then(|v| v.parse().ok()),
            condition: summary.condition,
        }
    }
}

/// Client for the eBay Browse API.
#[derive(Clone)]
pub struct BrowseClient {
    client: Client,
    base_url: Url,
    marketplace_id: String,
    token: String,
}

impl BrowseClient {
    pub fn with_shared_client(
        client: Client,
        config: &MarketplaceConfig,
    ) -> Result<Self, MarketplaceError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| MarketplaceError::NotConfigured(format!("invalid base_url: {e}")))?;

        Ok(Self {
            client,
            base_url,
            marketplace_id: config.marketplace_id.clone(),
            token: config.api_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, MarketplaceError> {
        self.base_url
            .join(path)
            .map_err(|e| MarketplaceError::NotConfigured(format!("invalid endpoint {path}: {e}")))
    }

    fn authorized(&self, url: Url) -> Result<reqwest::RequestBuilder, MarketplaceError> {
        if self.token.is_empty() {
            return Err(MarketplaceError::NotConfigured(
                "marketplace.api_token is empty".to_string(),
            ));
        }

        Ok(self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(MARKETPLACE_HEADER, &self.marketplace_id))
    }
}

/// Builds the Browse API `filter` parameter.
fn build_filter(query: &UpstreamQuery) -> Option<String> {
    let mut parts = Vec::new();

    if query.min_price.is_some() || query.max_price.is_some() {
        let min = query.min_price.map(|p| format!("{p:.2}")).unwrap_or_default();
        let max = query.max_price.map(|p| format!("{p:.2}")).unwrap_or_default();
        parts.push(format!("price:[{min}..{max}]"));
        parts.push("priceCurrency:USD".to_string());
    }

    if let Some(condition) = &query.condition {
        parts.push(format!("conditions:{{{}}}", condition.to_uppercase()));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}

fn parse_end_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait::async_trait]
impl Marketplace for BrowseClient {
    async fn search(&self, query: &UpstreamQuery) -> Result<MarketplaceSearch, MarketplaceError> {
        let mut url = self.endpoint(SEARCH_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", &query.query)
                .append_pair("limit", &query.limit.to_string())
                .append_pair("offset", &query.offset.to_string());
            if let Some(filter) = build_filter(query) {
                pairs.append_pair("filter", &filter);
            }
            if let Some(category) = &query.category {
                pairs.append_pair("category_ids", category);
            }
        }

        debug!(query = %query.query, offset = query.offset, "Searching marketplace");

        let response = self.authorized(url)?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketplaceError::Decode(e.to_string()))?;

        Ok(MarketplaceSearch {
            items: body.item_summaries.into_iter().map(Into::into).collect(),
            total: body.total,
            errors: body.errors.into_iter().map(|m| m.message).collect(),
            warnings: body.warnings.into_iter().map(|m| m.message).collect(),
        })
    }

    async fn item_details(&self, item_id: &str) -> Result<ItemLookup, MarketplaceError> {
        let path = format!("{ITEM_PATH}{}", urlencoding::encode(item_id));
        let url = self.endpoint(&path)?;

        let response = self.authorized(url)?.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Ok(ItemLookup::NotFound {
                reason: if body.is_empty() {
                    "item not found".to_string()
                } else {
                    body
                },
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: ItemResponse = response
            .json()
            .await
            .map_err(|e| MarketplaceError::Decode(e.to_string()))?;

        Ok(ItemLookup::Found(ItemDetails {
            item_id: body.item_id,
            end_date: parse_end_date(body.item_end_date.as_deref()),
            availability_statuses: body
                .estimated_availabilities
                .into_iter()
                .filter_map(|a| a.estimated_availability_status)
                .collect(),
        }))
    }
}
