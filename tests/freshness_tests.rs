mod common;

use std::sync::Arc;

use common::{FakeMarketplace, ThrowingChecker, age_item, page_of, seed_items, temp_store, user};
use swipecart::domain::AvailabilityStatus;
use swipecart::services::{AvailabilityChecker, MarketplaceAvailabilityChecker, MaintenanceRun};
use swipecart::state::SharedState;

async fn state_with_failures(label: &str, failing: &[&str]) -> (SharedState, Arc<FakeMarketplace>) {
    let (store, config) = temp_store(label).await;
    let marketplace = Arc::new(FakeMarketplace::with_page(page_of(10)));
    let inner: Arc<dyn AvailabilityChecker> =
        Arc::new(MarketplaceAvailabilityChecker::new(marketplace.clone()));
    let checker = Arc::new(ThrowingChecker {
        inner,
        failing: failing.iter().map(|s| (*s).to_string()).collect(),
    });
    let state = SharedState::with_checker(config, store, marketplace.clone(), checker);
    (state, marketplace)
}

#[tokio::test]
async fn out_of_stock_item_disappears_from_active_list() {
    let (state, marketplace) = state_with_failures("freshness-oos", &[]).await;
    let alice = user("alice");
    let items = seed_items(&state, &alice, &["v1|100|0", "v1|101|0"]).await;
    for item in &items {
        age_item(&state.store, item.id, 25).await;
    }
    marketplace.set_statuses("v1|100|0", &["OUT_OF_STOCK"]);

    let run = state.freshness.refresh_user(&alice).await.unwrap();

    assert_eq!(
        run,
        MaintenanceRun {
            total_checked: 2,
            available_count: 1,
            unavailable_count: 1,
            deactivated_count: 1,
            failed_checks: 0,
        }
    );

    let active = state.wishlists.list_active_items(&alice).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].upstream_item_id, "v1|101|0");

    let hidden = state
        .store
        .catalog_repo()
        .get_item(items[0].id)
        .await
        .unwrap()
        .expect("rows are never deleted");
    assert_eq!(hidden.availability_status, AvailabilityStatus::OutOfStock);
}

#[tokio::test]
async fn one_crashing_check_does_not_stop_the_run() {
    let ids = ["a-1", "a-2", "a-3", "a-4", "a-5"];
    let (state, _marketplace) = state_with_failures("freshness-throw", &["a-3"]).await;
    let alice = user("alice");
    let items = seed_items(&state, &alice, &ids).await;
    for item in &items {
        age_item(&state.store, item.id, 30).await;
    }

    let aged = state
        .store
        .catalog_repo()
        .get_item(items[2].id)
        .await
        .unwrap()
        .unwrap();

    let run = state.freshness.refresh_user(&alice).await.unwrap();

    assert_eq!(run.total_checked, 5);
    assert_eq!(run.failed_checks, 1);
    assert_eq!(run.available_count, 4);
    assert_eq!(
        run.total_checked,
        run.available_count + run.unavailable_count + run.failed_checks
    );

    let crashed = state
        .store
        .catalog_repo()
        .get_item(items[2].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(crashed.availability_status, AvailabilityStatus::InStock);
    assert_eq!(crashed.updated_at, aged.updated_at, "nothing is written for a crashed check");
}

#[tokio::test]
async fn lookup_errors_keep_items_visible() {
    let (state, marketplace) = state_with_failures("freshness-unknown", &[]).await;
    let alice = user("alice");
    let items = seed_items(&state, &alice, &["u-1"]).await;
    age_item(&state.store, items[0].id, 48).await;
    marketplace.set_lookup_error("u-1", "rate limited");

    let run = state.freshness.refresh_user(&alice).await.unwrap();
    assert_eq!(run.total_checked, 1);
    assert_eq!(run.failed_checks, 1);
    assert_eq!(run.deactivated_count, 0);

    let active = state.wishlists.list_active_items(&alice).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(
        active[0].availability_status,
        AvailabilityStatus::UnknownAvailability
    );
}

#[tokio::test]
async fn fresh_items_are_not_checked() {
    let (state, marketplace) = state_with_failures("freshness-fresh", &[]).await;
    let alice = user("alice");
    let items = seed_items(&state, &alice, &["f-1", "f-2"]).await;
    age_item(&state.store, items[0].id, 23).await;

    let run = state.freshness.refresh_user(&alice).await.unwrap();

    assert_eq!(run, MaintenanceRun::default());
    assert_eq!(marketplace.lookups(), 0);
}

#[tokio::test]
async fn user_refresh_only_touches_own_items() {
    let (state, marketplace) = state_with_failures("freshness-scope", &[]).await;
    let alice = user("alice");
    let bob = user("bob");
    for item in seed_items(&state, &alice, &["al-1"]).await {
        age_item(&state.store, item.id, 30).await;
    }
    for item in seed_items(&state, &bob, &["bo-1", "bo-2"]).await {
        age_item(&state.store, item.id, 30).await;
    }

    let run = state.freshness.refresh_user(&alice).await.unwrap();
    assert_eq!(run.total_checked, 1);
    assert_eq!(marketplace.lookups(), 1);

    let catalog = state.freshness.refresh_catalog().await.unwrap();
    assert_eq!(catalog.total_checked, 2, "alice's item is fresh again");
}

#[tokio::test]
async fn catalog_sweep_takes_the_stalest_first_and_respects_the_batch() {
    let (store, mut config) = temp_store("freshness-batch").await;
    config.freshness.batch_size = 2;
    let marketplace = Arc::new(FakeMarketplace::with_page(page_of(1)));
    let state = SharedState::with_marketplace(config, store, marketplace.clone());

    let alice = user("alice");
    let items = seed_items(&state, &alice, &["s-1", "s-2", "s-3"]).await;
    age_item(&state.store, items[0].id, 30).await;
    age_item(&state.store, items[1].id, 90).await;
    age_item(&state.store, items[2].id, 60).await;
    marketplace.set_not_found("s-2");
    marketplace.set_not_found("s-1");

    let run = state.freshness.refresh_catalog().await.unwrap();
    assert_eq!(run.total_checked, 2);
    assert_eq!(run.unavailable_count, 1);
    assert_eq!(run.available_count, 1);

    let repo = state.store.catalog_repo();
    let s1 = repo.get_item(items[0].id).await.unwrap().unwrap();
    let s2 = repo.get_item(items[1].id).await.unwrap().unwrap();
    assert_eq!(s1.availability_status, AvailabilityStatus::InStock);
    assert_eq!(s2.availability_status, AvailabilityStatus::NotFound);

    let next = state.freshness.refresh_catalog().await.unwrap();
    assert_eq!(next.total_checked, 1);
    assert_eq!(next.deactivated_count, 1);
}
