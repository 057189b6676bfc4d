mod common;

use std::sync::Arc;

use common::{age_session, test_state, user};
use swipecart::services::{SearchFilters, SessionError, SessionTracker};

#[tokio::test]
async fn concurrent_lookups_create_one_session() {
    let (state, _marketplace) = test_state("session-race").await;
    let filters = SearchFilters::default();
    let fingerprint = state.codec.fingerprint("road bike", &filters);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let sessions: Arc<dyn SessionTracker> = Arc::clone(&state.sessions);
        let fingerprint = fingerprint.clone();
        let filters = filters.clone();
        handles.push(tokio::spawn(async move {
            sessions
                .lookup_or_create(&user("alice"), &fingerprint, "road bike", &filters)
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), 1, "every caller must see the same row");
    assert_eq!(
        state
            .store
            .session_repo()
            .count_for("alice", fingerprint.as_str())
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn progress_moves_offset_only_on_new_pages() {
    let (state, _marketplace) = test_state("session-progress").await;
    let alice = user("alice");
    let filters = SearchFilters::default();
    let fingerprint = state.codec.fingerprint("sofa", &filters);

    let session = state
        .sessions
        .lookup_or_create(&alice, &fingerprint, "sofa", &filters)
        .await
        .unwrap();
    assert_eq!(session.current_offset, 0);
    assert_eq!(session.items_seen, 0);

    let session = state
        .sessions
        .record_progress(&alice, session.id, 50, false)
        .await
        .unwrap();
    assert_eq!(session.current_offset, 0);
    assert_eq!(session.items_seen, 50);

    let session = state
        .sessions
        .record_progress(&alice, session.id, 150, true)
        .await
        .unwrap();
    assert_eq!(session.current_offset, 200);
    assert_eq!(session.items_seen, 200);

    let resumed = state
        .sessions
        .lookup_or_create(&alice, &fingerprint, "sofa", &filters)
        .await
        .unwrap();
    assert_eq!(resumed.id, session.id);
    assert_eq!(resumed.current_offset, 200);
}

#[tokio::test]
async fn progress_on_someone_elses_session_is_not_found() {
    let (state, _marketplace) = test_state("session-owner").await;
    let filters = SearchFilters::default();
    let fingerprint = state.codec.fingerprint("rug", &filters);

    let session = state
        .sessions
        .lookup_or_create(&user("alice"), &fingerprint, "rug", &filters)
        .await
        .unwrap();

    let err = state
        .sessions
        .record_progress(&user("mallory"), session.id, 10, true)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound(id) if id == session.id));

    let err = state
        .sessions
        .record_progress(&user("alice"), 9999, 1, false)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::NotFound(9999)));
}

#[tokio::test]
async fn idle_sessions_are_reset_but_kept() {
    let (state, _marketplace) = test_state("session-reset").await;
    let alice = user("alice");
    let filters = SearchFilters::default();

    let idle_fp = state.codec.fingerprint("lamp", &filters);
    let idle = state
        .sessions
        .lookup_or_create(&alice, &idle_fp, "lamp", &filters)
        .await
        .unwrap();
    state
        .sessions
        .record_progress(&alice, idle.id, 120, true)
        .await
        .unwrap();
    age_session(&state.store, idle.id, 10).await;

    let busy_fp = state.codec.fingerprint("table", &filters);
    let busy = state
        .sessions
        .lookup_or_create(&alice, &busy_fp, "table", &filters)
        .await
        .unwrap();
    state
        .sessions
        .record_progress(&alice, busy.id, 30, true)
        .await
        .unwrap();

    let reset = state
        .sessions
        .reset_inactive(chrono::Duration::days(7))
        .await
        .unwrap();
    assert_eq!(reset, 1);

    let repo = state.store.session_repo();
    let idle_row = repo.find_by_id(idle.id).await.unwrap().unwrap();
    assert_eq!(idle_row.current_offset, 0);
    assert_eq!(idle_row.items_seen, 0);

    let busy_row = repo.find_by_id(busy.id).await.unwrap().unwrap();
    assert_eq!(busy_row.current_offset, 200);
    assert_eq!(busy_row.items_seen, 30);

    let again = state
        .sessions
        .reset_inactive(chrono::Duration::days(7))
        .await
        .unwrap();
    assert_eq!(again, 0, "already-reset sessions are not counted twice");
}
