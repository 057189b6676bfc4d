pub mod availability;
pub use availability::{
    AvailabilityCheck, AvailabilityChecker, MarketplaceAvailabilityChecker, classify,
};

pub mod feed_service;
pub mod feed_service_impl;
pub use feed_service::{FeedError, FeedPage, FeedRequest, FeedService};
pub use feed_service_impl::DefaultFeedService;

pub mod fingerprint;
pub use fingerprint::{KeyCodec, SearchFilters, SearchFingerprint};

pub mod freshness_service;
pub mod freshness_service_impl;
pub use freshness_service::{FreshnessScheduler, MaintenanceError, MaintenanceRun};
pub use freshness_service_impl::SeaOrmFreshnessScheduler;

pub mod interaction_service;
pub mod interaction_service_impl;
pub use interaction_service::{
    InteractionBatch, InteractionError, InteractionRecorder, SaveTarget, SwipeRecord,
};
pub use interaction_service_impl::SeaOrmInteractionRecorder;

pub mod search_cache;
pub use search_cache::{KeyValueCache, SearchResultCache, StoreCache};

pub mod session_service;
pub mod session_service_impl;
pub use session_service::{SessionError, SessionSnapshot, SessionTracker};
pub use session_service_impl::SeaOrmSessionTracker;

pub mod wishlist_service;
pub mod wishlist_service_impl;
pub use wishlist_service::{WishlistError, WishlistService};
pub use wishlist_service_impl::SeaOrmWishlistService;
