use crate::clients::{Marketplace, MarketplaceSearch, UpstreamQuery};
use crate::domain::UserContext;
use crate::services::feed_service::{FeedError, FeedPage, FeedRequest, FeedService};
use crate::services::fingerprint::KeyCodec;
use crate::services::search_cache::SearchResultCache;
use crate::services::session_service::SessionTracker;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct DefaultFeedService {
    codec: KeyCodec,
    cache: Arc<SearchResultCache>,
    sessions: Arc<dyn SessionTracker>,
    marketplace: Arc<dyn Marketplace>,
    upstream_page_size: u32,
}

impl DefaultFeedService {
    #[must_use]
    pub fn new(
        codec: KeyCodec,
        cache: Arc<SearchResultCache>,
        sessions: Arc<dyn SessionTracker>,
        marketplace: Arc<dyn Marketplace>,
        upstream_page_size: u32,
    ) -> Self {
        Self {
            codec,
            cache,
            sessions,
            marketplace,
            upstream_page_size,
        }
    }

    async fn fetch_upstream(&self, query: UpstreamQuery) -> Result<MarketplaceSearch, FeedError> {
        let result = self
            .marketplace
            .search(&query)
            .await
            .map_err(|e| FeedError::Upstream(e.to_string()))?;

        if result.items.is_empty() && !result.errors.is_empty() {
            return Err(FeedError::Upstream(result.errors.join("; ")));
        }

        for warning in &result.warnings {
            warn!(query = %query.query, warning = %warning, "Marketplace search warning");
        }

        Ok(result)
    }
}

#[async_trait::async_trait]
impl FeedService for DefaultFeedService {
    async fn search(
        &self,
        user: &UserContext,
        request: FeedRequest,
    ) -> Result<FeedPage, FeedError> {
        request.validate()?;

        let query = KeyCodec::normalize_query(&request.query);
        let filters = self.codec.normalize(&request.filters);
        let fingerprint = self.codec.fingerprint(&query, &filters);

        let mut session = self
            .sessions
            .lookup_or_create(user, &fingerprint, &query, &filters)
            .await?;

        // Advancing targets the next upstream page; the session only moves
        // once that page actually yields items.
        let offset = if request.advance {
            session
                .current_offset
                .saturating_add(u64::from(self.upstream_page_size))
        } else {
            session.current_offset
        };

        let (result, from_cache) = if let Some(cached) = self.cache.get(&fingerprint, offset).await
        {
            (cached, true)
        } else {
            let result = self
                .fetch_upstream(UpstreamQuery {
                    query: query.clone(),
                    condition: filters.condition.clone(),
                    category: filters.category.clone(),
                    min_price: filters.min_price,
                    max_price: filters.max_price,
                    offset,
                    limit: self.upstream_page_size,
                })
                .await?;
            self.cache.put(&fingerprint, offset, &result).await;
            (result, false)
        };

        if request.advance {
            if result.items.is_empty() {
                debug!(
                    session_id = session.id,
                    offset = session.current_offset,
                    "No items past the current page, session not advanced"
                );
            } else {
                session = self
                    .sessions
                    .record_progress(user, session.id, 0, true)
                    .await?;
            }
        }

        let start = request.start as usize;
        let end = start
            .saturating_add(request.page_size as usize)
            .min(result.items.len());
        let items = result.items.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        let remaining_in_page = result.items.len().saturating_sub(end.max(start));

        debug!(
            user_id = %user.user_id,
            session_id = session.id,
            offset,
            from_cache,
            returned = items.len(),
            "Served feed page"
        );

        Ok(FeedPage {
            session_id: session.id,
            fingerprint: fingerprint.to_string(),
            offset,
            start: request.start,
            items,
            remaining_in_page,
            from_cache,
            items_seen: session.items_seen,
        })
    }
}
