use std::sync::Arc;

use crate::clients::{BrowseClient, Marketplace};
use crate::config::Config;
use crate::db::Store;
use crate::jobs::{
    CatalogFreshnessHandler, JobCoordinator, JobQueue, SessionMaintenanceHandler, SqliteJobQueue,
};
use crate::services::{
    AvailabilityChecker, DefaultFeedService, FeedService, FreshnessScheduler, InteractionRecorder,
    KeyCodec, MarketplaceAvailabilityChecker, SeaOrmFreshnessScheduler,
    SeaOrmInteractionRecorder, SeaOrmSessionTracker, SeaOrmWishlistService, SearchResultCache,
    SessionTracker, StoreCache, WishlistService,
};

/// Shared HTTP client so every marketplace call reuses one connection pool.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent("Swipecart/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

/// Composition root. Every service is built here once and shared by `Arc`.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub marketplace: Arc<dyn Marketplace>,

    pub codec: KeyCodec,

    pub search_cache: Arc<SearchResultCache>,

    pub sessions: Arc<dyn SessionTracker>,

    pub wishlists: Arc<dyn WishlistService>,

    pub interactions: Arc<dyn InteractionRecorder>,

    pub checker: Arc<dyn AvailabilityChecker>,

    pub freshness: Arc<dyn FreshnessScheduler>,

    pub feed: Arc<dyn FeedService>,

    pub job_queue: Arc<dyn JobQueue>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_shared_http_client(config.marketplace.request_timeout_seconds)?;
        let marketplace: Arc<dyn Marketplace> = Arc::new(BrowseClient::with_shared_client(
            http_client,
            &config.marketplace,
        )?);

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_marketplace(config, store, marketplace))
    }

    /// Builds the service graph around an existing store and marketplace.
    #[must_use]
    pub fn with_marketplace(
        config: Config,
        store: Store,
        marketplace: Arc<dyn Marketplace>,
    ) -> Self {
        let checker: Arc<dyn AvailabilityChecker> =
            Arc::new(MarketplaceAvailabilityChecker::new(Arc::clone(&marketplace)));
        Self::with_checker(config, store, marketplace, checker)
    }

    #[must_use]
    pub fn with_checker(
        config: Config,
        store: Store,
        marketplace: Arc<dyn Marketplace>,
        checker: Arc<dyn AvailabilityChecker>,
    ) -> Self {
        let page_size = config.marketplace.upstream_page_size;
        let codec = KeyCodec::new(config.cache.price_ceiling);

        let search_cache = Arc::new(SearchResultCache::new(
            Arc::new(StoreCache::new(store.clone())),
            config.search_ttl(),
        ));

        let sessions: Arc<dyn SessionTracker> =
            Arc::new(SeaOrmSessionTracker::new(store.clone(), page_size));

        let wishlists: Arc<dyn WishlistService> =
            Arc::new(SeaOrmWishlistService::new(store.clone()));

        let interactions: Arc<dyn InteractionRecorder> = Arc::new(SeaOrmInteractionRecorder::new(
            store.clone(),
            Arc::clone(&wishlists),
            Arc::clone(&sessions),
        ));

        let freshness: Arc<dyn FreshnessScheduler> = Arc::new(SeaOrmFreshnessScheduler::new(
            store.clone(),
            Arc::clone(&checker),
            config.staleness_threshold(),
            config.freshness.batch_size,
        ));

        let feed: Arc<dyn FeedService> = Arc::new(DefaultFeedService::new(
            codec,
            Arc::clone(&search_cache),
            Arc::clone(&sessions),
            Arc::clone(&marketplace),
            page_size,
        ));

        let job_queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(
            store.clone(),
            config.job_lease(),
            config.retry_backoff(),
        ));

        Self {
            config: Arc::new(config),
            store,
            marketplace,
            codec,
            search_cache,
            sessions,
            wishlists,
            interactions,
            checker,
            freshness,
            feed,
            job_queue,
        }
    }

    /// Coordinator with both background handlers registered. Owned by the
    /// daemon, which is the only mode that runs background work.
    #[must_use]
    pub fn job_coordinator(&self) -> JobCoordinator {
        JobCoordinator::new(Arc::clone(&self.job_queue), (*self.config).clone())
            .with_handler(Arc::new(CatalogFreshnessHandler::new(Arc::clone(
                &self.freshness,
            ))))
            .with_handler(Arc::new(SessionMaintenanceHandler::new(
                Arc::clone(&self.sessions),
                Arc::clone(&self.search_cache),
                self.config.session_retention(),
            )))
    }
}
