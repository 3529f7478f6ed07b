//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each store server endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use smart_cache::{api::create_router, AppState, MemoryStore};
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (AppState, Router) {
    let state = AppState::new(MemoryStore::new());
    (state.clone(), create_router(state))
}

fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

// == Key/Value Endpoint Tests ==

#[tokio::test]
async fn test_put_then_get_raw_bytes() {
    let (_, app) = create_test_app();

    let response = app
        .clone()
        .oneshot(request("PUT", "/kv?key=Doohickey%2F7%2Fmake_a_thing", "foo bar bas"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "Doohickey/7/make_a_thing");
    assert_eq!(json["written"], true);

    let response = app
        .oneshot(request("GET", "/kv?key=Doohickey%2F7%2Fmake_a_thing", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"foo bar bas");
}

#[tokio::test]
async fn test_get_missing_key() {
    let (_, app) = create_test_app();

    let response = app
        .oneshot(request("GET", "/kv?key=nope", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_only_if_absent() {
    let (_, app) = create_test_app();

    let first = app
        .clone()
        .oneshot(request("PUT", "/kv?key=narf%2Flock&ttl_ms=60000&nx=true", "winner!"))
        .await
        .unwrap();
    assert_eq!(body_to_json(first.into_body()).await["written"], true);

    let second = app
        .oneshot(request("PUT", "/kv?key=narf%2Flock&ttl_ms=60000&nx=true", "winner!"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_to_json(second.into_body()).await["written"], false);
}

#[tokio::test]
async fn test_put_with_ttl_expires() {
    let (_, app) = create_test_app();

    app.clone()
        .oneshot(request("PUT", "/kv?key=short&ttl_ms=50", "v"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;

    let response = app
        .oneshot(request("GET", "/kv?key=short", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint() {
    let (_, app) = create_test_app();

    app.clone()
        .oneshot(request("PUT", "/kv?key=gone", "v"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request("DELETE", "/kv?key=gone", Body::empty()))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await["removed"], true);

    let response = app
        .oneshot(request("DELETE", "/kv?key=gone", Body::empty()))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await["removed"], false);
}

#[tokio::test]
async fn test_expire_endpoint() {
    let (state, app) = create_test_app();

    app.clone()
        .oneshot(request("PUT", "/kv?key=k", "v"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request("POST", "/kv/expire?key=k&ttl_ms=30000", Body::empty()))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await["applied"], true);
    assert!(state.store.ttl("k").await.unwrap() <= Duration::from_secs(30));

    let response = app
        .oneshot(request("POST", "/kv/expire?key=missing&ttl_ms=30000", Body::empty()))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await["applied"], false);
}

// == List Endpoint Tests ==

#[tokio::test]
async fn test_push_then_pop() {
    let (_, app) = create_test_app();

    let response = app
        .clone()
        .oneshot(request("POST", "/list/push?key=narf%2Fdone&ttl_ms=1000", "done"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "narf/done");
    assert_eq!(json["pushed"], true);

    let response = app
        .oneshot(request("POST", "/list/pop?key=narf%2Fdone&timeout_ms=100", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"done");
}

#[tokio::test]
async fn test_pop_times_out_with_no_content() {
    let (_, app) = create_test_app();

    let response = app
        .oneshot(request("POST", "/list/pop?key=empty&timeout_ms=50", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_pop_wakes_on_concurrent_push() {
    let (_, app) = create_test_app();

    let waiter = {
        let app = app.clone();
        tokio::spawn(async move {
            app.oneshot(request("POST", "/list/pop?key=q&timeout_ms=2000", Body::empty()))
                .await
                .unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    app.oneshot(request("POST", "/list/push?key=q&ttl_ms=1000", "item"))
        .await
        .unwrap();

    let response = waiter.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response.into_body()).await, b"item");
}

// == Error Tests ==

#[tokio::test]
async fn test_empty_key_is_rejected() {
    let (_, app) = create_test_app();

    let response = app
        .oneshot(request("PUT", "/kv?key=", "v"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_oversized_key_is_rejected() {
    let (_, app) = create_test_app();
    let uri = format!("/kv?key={}", "k".repeat(513));

    let response = app
        .oneshot(request("GET", &uri, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_type_is_protocol_error() {
    let (_, app) = create_test_app();

    app.clone()
        .oneshot(request("PUT", "/kv?key=plain", "v"))
        .await
        .unwrap();

    let response = app
        .oneshot(request("POST", "/list/push?key=plain&ttl_ms=1000", "item"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_read_only_replica_rejects_writes() {
    let (state, app) = create_test_app();
    state.store.set_read_only(true);

    let response = app
        .clone()
        .oneshot(request("PUT", "/kv?key=k", "v"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_to_json(response.into_body()).await["code"], "READONLY");

    // Reads still work
    let response = app
        .oneshot(request("GET", "/kv?key=k", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Stats and Health Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (_, app) = create_test_app();

    app.clone()
        .oneshot(request("PUT", "/kv?key=a", "1"))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("GET", "/kv?key=a", Body::empty()))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("GET", "/kv?key=b", Body::empty()))
        .await
        .unwrap();

    let response = app
        .oneshot(request("GET", "/stats", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_keys"], 1);
    assert_eq!(json["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_, app) = create_test_app();

    let response = app
        .oneshot(request("GET", "/health", Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["read_only"], false);
    assert!(json["timestamp"].is_string());
}
