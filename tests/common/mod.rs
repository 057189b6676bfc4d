#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use swipecart::clients::{
    ItemDetails, ItemLookup, Marketplace, MarketplaceError, MarketplaceItem, MarketplaceSearch,
    UpstreamQuery,
};
use swipecart::config::Config;
use swipecart::db::{NewSavedItem, SavedItem, Store};
use swipecart::domain::UserContext;
use swipecart::entities::{saved_items, search_sessions};
use swipecart::services::{AvailabilityCheck, AvailabilityChecker};
use swipecart::state::SharedState;

pub async fn temp_store(label: &str) -> (Store, Config) {
    let db_path = std::env::temp_dir().join(format!(
        "swipecart-{label}-test-{}.db",
        uuid::Uuid::new_v4()
    ));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());

    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open temp database");

    (store, config)
}

pub fn listing(id: &str) -> MarketplaceItem {
    MarketplaceItem {
        item_id: id.to_string(),
        title: format!("Listing {id}"),
        image_url: Some(format!("https://img.example/{id}.jpg")),
        price: Some(25.0),
        currency: Some("USD".to_string()),
        seller_score: Some(99.5),
        condition: Some("NEW".to_string()),
    }
}

pub fn page_of(count: usize) -> MarketplaceSearch {
    MarketplaceSearch {
        items: (0..count).map(|i| listing(&format!("v1|{i}|0"))).collect(),
        total: Some(count as u64),
        errors: Vec::new(),
        warnings: Vec::new(),
    }
}

/// In-process marketplace. Searches return `page` unless an error is queued;
/// item lookups come from `details`, defaulting to an in-stock listing.
#[derive(Default)]
pub struct FakeMarketplace {
    pub search_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub queries: Mutex<Vec<UpstreamQuery>>,
    pub page: Mutex<MarketplaceSearch>,
    pub search_error: Mutex<Option<String>>,
    pub details: Mutex<HashMap<String, Result<ItemLookup, String>>>,
}

impl FakeMarketplace {
    pub fn with_page(page: MarketplaceSearch) -> Self {
        Self {
            page: Mutex::new(page),
            ..Default::default()
        }
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn set_statuses(&self, item_id: &str, statuses: &[&str]) {
        self.details.lock().unwrap().insert(
            item_id.to_string(),
            Ok(ItemLookup::Found(ItemDetails {
                item_id: item_id.to_string(),
                end_date: None,
                availability_statuses: statuses.iter().map(|s| (*s).to_string()).collect(),
            })),
        );
    }

    pub fn set_not_found(&self, item_id: &str) {
        self.details.lock().unwrap().insert(
            item_id.to_string(),
            Ok(ItemLookup::NotFound {
                reason: "listing removed".to_string(),
            }),
        );
    }

    pub fn set_lookup_error(&self, item_id: &str, message: &str) {
        self.details
            .lock()
            .unwrap()
            .insert(item_id.to_string(), Err(message.to_string()));
    }
}

#[async_trait::async_trait]
impl Marketplace for FakeMarketplace {
    async fn search(&self, query: &UpstreamQuery) -> Result<MarketplaceSearch, MarketplaceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());

        if let Some(message) = self.search_error.lock().unwrap().clone() {
            return Err(MarketplaceError::Api {
                status: 503,
                body: message,
            });
        }

        Ok(self.page.lock().unwrap().clone())
    }

    async fn item_details(&self, item_id: &str) -> Result<ItemLookup, MarketplaceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);

        match self.details.lock().unwrap().get(item_id).cloned() {
            Some(Ok(lookup)) => Ok(lookup),
            Some(Err(message)) => Err(MarketplaceError::Api {
                status: 500,
                body: message,
            }),
            None => Ok(ItemLookup::Found(ItemDetails {
                item_id: item_id.to_string(),
                end_date: None,
                availability_statuses: vec!["IN_STOCK".to_string()],
            })),
        }
    }
}

/// Checker that raises for the listed ids and delegates otherwise.
pub struct ThrowingChecker {
    pub inner: Arc<dyn AvailabilityChecker>,
    pub failing: Vec<String>,
}

#[async_trait::async_trait]
impl AvailabilityChecker for ThrowingChecker {
    async fn check(&self, upstream_item_id: &str) -> anyhow::Result<AvailabilityCheck> {
        if self.failing.iter().any(|id| id == upstream_item_id) {
            anyhow::bail!("checker crashed on {upstream_item_id}");
        }
        self.inner.check(upstream_item_id).await
    }
}

pub async fn test_state(label: &str) -> (SharedState, Arc<FakeMarketplace>) {
    let (store, config) = temp_store(label).await;
    let marketplace = Arc::new(FakeMarketplace::with_page(page_of(200)));
    let state = SharedState::with_marketplace(config, store, marketplace.clone());
    (state, marketplace)
}

pub fn user(id: &str) -> UserContext {
    UserContext::new(id)
}

pub async fn seed_items(state: &SharedState, owner: &UserContext, ids: &[&str]) -> Vec<SavedItem> {
    let wishlist = state
        .wishlists
        .create_wishlist(owner, "Favourites")
        .await
        .expect("create wishlist");

    let mut saved = Vec::new();
    for id in ids {
        let item = state
            .wishlists
            .save_item(
                owner,
                NewSavedItem {
                    wishlist_id: wishlist.id,
                    upstream_item_id: (*id).to_string(),
                    title: format!("Saved {id}"),
                    image_url: None,
                    price: Some(12.5),
                    currency: Some("USD".to_string()),
                    seller_score: None,
                },
            )
            .await
            .expect("save item");
        saved.push(item);
    }
    saved
}

/// Moves a saved item's last update into the past.
pub async fn age_item(store: &Store, item_id: i32, hours: i64) {
    let row = saved_items::Entity::find_by_id(item_id)
        .one(&store.conn)
        .await
        .unwrap()
        .expect("saved item exists");
    let stamp = swipecart::db::timestamp(chrono::Utc::now() - chrono::Duration::hours(hours));

    let mut active: saved_items::ActiveModel = row.into();
    active.updated_at = Set(stamp);
    active.update(&store.conn).await.unwrap();
}

/// Moves a session's last activity into the past.
pub async fn age_session(store: &Store, session_id: i32, days: i64) {
    let row = search_sessions::Entity::find_by_id(session_id)
        .one(&store.conn)
        .await
        .unwrap()
        .expect("session exists");
    let stamp = swipecart::db::timestamp(chrono::Utc::now() - chrono::Duration::days(days));

    let mut active: search_sessions::ActiveModel = row.into();
    active.last_activity_at = Set(stamp);
    active.update(&store.conn).await.unwrap();
}
