mod common;

use common::{test_state, user};
use swipecart::domain::SwipeOutcome;
use swipecart::services::{
    InteractionBatch, InteractionError, SaveTarget, SearchFilters, SwipeRecord, WishlistError,
};

fn swipe(id: &str, outcome: SwipeOutcome) -> SwipeRecord {
    SwipeRecord {
        item_id: id.to_string(),
        outcome,
        query: Some("mechanical keyboard".to_string()),
        filters: Some(SearchFilters::default()),
        price: Some(89.0),
        save_to: None,
    }
}

fn saving(id: &str, wishlist_id: i32) -> SwipeRecord {
    SwipeRecord {
        save_to: Some(SaveTarget {
            wishlist_id,
            title: format!("Keyboard {id}"),
            image_url: None,
            currency: Some("USD".to_string()),
            seller_score: Some(98.0),
        }),
        ..swipe(id, SwipeOutcome::Accept)
    }
}

#[tokio::test]
async fn batch_appends_history_and_saves_accepts() {
    let (state, _marketplace) = test_state("interactions-batch").await;
    let alice = user("alice");
    let wishlist = state
        .wishlists
        .create_wishlist(&alice, "Desk setup")
        .await
        .unwrap();

    let recorded = state
        .interactions
        .record_batch(
            &alice,
            InteractionBatch {
                session_id: None,
                records: vec![
                    swipe("kb-1", SwipeOutcome::Reject),
                    saving("kb-2", wishlist.id),
                    swipe("kb-3", SwipeOutcome::Skip),
                    swipe("kb-4", SwipeOutcome::Accept),
                ],
            },
        )
        .await
        .unwrap();
    assert_eq!(recorded, 4);

    let history = state.store.history_repo();
    assert_eq!(history.count_for_user("alice").await.unwrap(), 4);
    assert_eq!(history.count_for_user("bob").await.unwrap(), 0);

    let saved = state.wishlists.list_active_items(&alice).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].upstream_item_id, "kb-2");
    assert_eq!(saved[0].price, Some(89.0));
}

#[tokio::test]
async fn batch_nudges_the_session_counter() {
    let (state, _marketplace) = test_state("interactions-session").await;
    let alice = user("alice");
    let filters = SearchFilters::default();
    let fingerprint = state.codec.fingerprint("monitor", &filters);
    let session = state
        .sessions
        .lookup_or_create(&alice, &fingerprint, "monitor", &filters)
        .await
        .unwrap();

    state
        .interactions
        .record_batch(
            &alice,
            InteractionBatch {
                session_id: Some(session.id),
                records: vec![
                    swipe("m-1", SwipeOutcome::Reject),
                    swipe("m-2", SwipeOutcome::Skip),
                    swipe("m-3", SwipeOutcome::Reject),
                ],
            },
        )
        .await
        .unwrap();

    let row = state
        .store
        .session_repo()
        .find_by_id(session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.items_seen, 3);
    assert_eq!(row.current_offset, 0);
}

#[tokio::test]
async fn unknown_session_does_not_fail_the_batch() {
    let (state, _marketplace) = test_state("interactions-nosession").await;

    let recorded = state
        .interactions
        .record_batch(
            &user("alice"),
            InteractionBatch {
                session_id: Some(4242),
                records: vec![swipe("x-1", SwipeOutcome::Skip)],
            },
        )
        .await
        .unwrap();

    assert_eq!(recorded, 1);
}

#[tokio::test]
async fn invalid_batches_write_nothing() {
    let (state, _marketplace) = test_state("interactions-invalid").await;
    let alice = user("alice");

    let empty = state
        .interactions
        .record_batch(
            &alice,
            InteractionBatch {
                session_id: None,
                records: Vec::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(empty, InteractionError::Validation(_)));

    let mut bad_price = swipe("p-2", SwipeOutcome::Reject);
    bad_price.price = Some(-1.0);
    let err = state
        .interactions
        .record_batch(
            &alice,
            InteractionBatch {
                session_id: None,
                records: vec![swipe("p-1", SwipeOutcome::Reject), bad_price],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Validation(_)));

    let oversized = (0..101)
        .map(|i| swipe(&format!("o-{i}"), SwipeOutcome::Skip))
        .collect();
    let err = state
        .interactions
        .record_batch(
            &alice,
            InteractionBatch {
                session_id: None,
                records: oversized,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Validation(_)));

    assert_eq!(
        state.store.history_repo().count_for_user("alice").await.unwrap(),
        0
    );
}

#[tokio::test]
async fn saving_into_a_foreign_wishlist_stops_the_batch() {
    let (state, _marketplace) = test_state("interactions-foreign").await;
    let bob_list = state
        .wishlists
        .create_wishlist(&user("bob"), "Bob's")
        .await
        .unwrap();
    let alice = user("alice");

    let err = state
        .interactions
        .record_batch(
            &alice,
            InteractionBatch {
                session_id: None,
                records: vec![
                    swipe("f-1", SwipeOutcome::Reject),
                    saving("f-2", bob_list.id),
                    swipe("f-3", SwipeOutcome::Reject),
                ],
            },
        )
        .await
        .unwrap_err();

    match err {
        InteractionError::Save { recorded, source } => {
            assert_eq!(recorded, 2);
            assert!(matches!(source, WishlistError::WishlistNotFound(id) if id == bob_list.id));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(
        state.store.history_repo().count_for_user("alice").await.unwrap(),
        2
    );
    assert!(
        state
            .wishlists
            .list_active_items(&user("bob"))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn stopped_batch_still_counts_what_was_recorded() {
    let (state, _marketplace) = test_state("interactions-partial-session").await;
    let alice = user("alice");
    let bob_list = state
        .wishlists
        .create_wishlist(&user("bob"), "Bob's")
        .await
        .unwrap();
    let filters = SearchFilters::default();
    let fingerprint = state.codec.fingerprint("speaker", &filters);
    let session = state
        .sessions
        .lookup_or_create(&alice, &fingerprint, "speaker", &filters)
        .await
        .unwrap();

    let err = state
        .interactions
        .record_batch(
            &alice,
            InteractionBatch {
                session_id: Some(session.id),
                records: vec![
                    swipe("s-1", SwipeOutcome::Reject),
                    swipe("s-2", SwipeOutcome::Skip),
                    saving("s-3", bob_list.id),
                    swipe("s-4", SwipeOutcome::Reject),
                ],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Save { recorded: 3, .. }));

    let row = state
        .store
        .session_repo()
        .find_by_id(session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.items_seen, 3);
}
