mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{FakeMarketplace, age_item, seed_items, test_state, user};
use http_body_util::BodyExt;
use serde_json::Value;
use swipecart::api::{FeedServed, USER_ID_HEADER};
use tower::ServiceExt;

async fn spawn_app(label: &str) -> (Router, swipecart::state::SharedState, Arc<FakeMarketplace>) {
    let (state, marketplace) = test_state(label).await;
    let app_state = swipecart::api::create_app_state(Arc::new(state.clone()), None);
    (swipecart::api::router(app_state), state, marketplace)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, user_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header(USER_ID_HEADER, user_id);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user_id: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(USER_ID_HEADER, user_id)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let (app, _state, marketplace) = spawn_app("api-auth").await;

    let response = app
        .clone()
        .oneshot(get("/api/feed?query=lamp", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get("/api/items/active", Some("bad user!")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(marketplace.searches(), 0);
}

#[tokio::test]
async fn feed_endpoint_serves_and_caches_pages() {
    let (app, _state, marketplace) = spawn_app("api-feed").await;
    let uri = "/api/feed?query=film%20camera&condition=used&max_price=150&page_size=20";

    let response = app.clone().oneshot(get(uri, Some("alice"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = *response.extensions().get::<FeedServed>().unwrap();
    assert!(!served.from_cache);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["session_id"], served.session_id);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 20);
    assert_eq!(body["data"]["from_cache"], false);
    assert_eq!(body["data"]["remaining_in_page"], 180);

    let response = app.clone().oneshot(get(uri, Some("alice"))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["from_cache"], true);
    assert_eq!(marketplace.searches(), 1);

    let query = marketplace.queries.lock().unwrap()[0].clone();
    assert_eq!(query.query, "film camera");
    assert_eq!(query.condition.as_deref(), Some("used"));
    assert_eq!(query.max_price, Some(150.0));
}

#[tokio::test]
async fn feed_endpoint_validates_input() {
    let (app, _state, _marketplace) = spawn_app("api-feed-invalid").await;

    let response = app
        .clone()
        .oneshot(get("/api/feed?query=lamp&page_size=0", Some("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn feed_endpoint_reports_upstream_failure() {
    let (app, _state, marketplace) = spawn_app("api-feed-upstream").await;
    *marketplace.search_error.lock().unwrap() = Some("down".to_string());

    let response = app
        .oneshot(get("/api/feed?query=lamp", Some("alice")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn interactions_endpoint_records_and_saves() {
    let (app, state, _marketplace) = spawn_app("api-interactions").await;
    let wishlist = state
        .wishlists
        .create_wishlist(&user("alice"), "Cameras")
        .await
        .unwrap();

    let batch = serde_json::json!({
        "records": [
            { "item_id": "c-1", "outcome": "reject" },
            {
                "item_id": "c-2",
                "outcome": "accept",
                "price": 120.0,
                "save_to": { "wishlist_id": wishlist.id, "title": "Pentax K1000" }
            }
        ]
    });

    let response = app
        .clone()
        .oneshot(post_json("/api/interactions", "alice", &batch))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["recorded"], 2);

    let response = app
        .clone()
        .oneshot(get("/api/items/active", Some("alice")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["upstream_item_id"], "c-2");
    assert_eq!(body["data"]["items"][0]["availability_status"], "IN_STOCK");

    let empty = serde_json::json!({ "records": [] });
    let response = app
        .oneshot(post_json("/api/interactions", "alice", &empty))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saving_into_foreign_wishlist_is_not_found() {
    let (app, state, _marketplace) = spawn_app("api-foreign").await;
    let bob_list = state
        .wishlists
        .create_wishlist(&user("bob"), "Bob's")
        .await
        .unwrap();

    let batch = serde_json::json!({
        "records": [{
            "item_id": "x-1",
            "outcome": "accept",
            "save_to": { "wishlist_id": bob_list.id, "title": "Not yours" }
        }]
    });

    let response = app
        .oneshot(post_json("/api/interactions", "alice", &batch))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_endpoint_returns_the_run_summary() {
    let (app, state, marketplace) = spawn_app("api-refresh").await;
    let alice = user("alice");
    let items = seed_items(&state, &alice, &["r-1", "r-2", "r-3"]).await;
    for item in &items {
        age_item(&state.store, item.id, 26).await;
    }
    marketplace.set_not_found("r-1");
    marketplace.set_lookup_error("r-3", "timeout");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/maintenance/refresh",
            "alice",
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let run = &body["data"];
    assert_eq!(run["total_checked"], 3);
    assert_eq!(run["available_count"], 1);
    assert_eq!(run["unavailable_count"], 1);
    assert_eq!(run["deactivated_count"], 1);
    assert_eq!(run["failed_checks"], 1);

    let response = app
        .oneshot(get("/api/items/active", Some("alice")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["total"], 2);
}

#[tokio::test]
async fn health_and_metrics_are_served() {
    let (app, _state, _marketplace) = spawn_app("api-health").await;

    let response = app.clone().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], true);

    let response = app.oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
