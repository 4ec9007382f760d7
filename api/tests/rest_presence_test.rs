mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use api::routes::routes;
use common::{test_state, unique_customer_id};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn join_then_metrics_then_leave_round_trips() {
    let state = test_state().await;
    let customer_id = unique_customer_id("acme");
    let app = routes(state);

    let join_body = json!({
        "customerId": customer_id,
        "sessionId": "s1",
        "tabId": "t1",
        "timestamp": 0,
        "device": "desktop",
        "session_mode": "active",
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/join")
                .header("content-type", "application/json")
                .body(Body::from(join_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/active-users/metrics?customerId={customer_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let metrics = body_json(response).await;
    assert_eq!(metrics["count"], 1);
    assert_eq!(metrics["customerId"], customer_id);

    let leave_body = json!({
        "customerId": customer_id,
        "sessionId": "s1",
        "tabId": "t1",
        "reason": "external",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/leave")
                .header("content-type", "text/plain")
                .body(Body::from(leave_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/active-users/metrics?customerId={customer_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let metrics = body_json(response).await;
    assert_eq!(metrics["count"], 0);
}

#[tokio::test]
async fn beat_keeps_existing_ttl_and_creates_when_missing() {
    let state = test_state().await;
    let customer_id = unique_customer_id("acme");
    let app = routes(state);

    let join_body = json!({
        "customerId": customer_id,
        "sessionId": "s1",
        "tabId": "t1",
        "device": "desktop",
        "session_mode": "active",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/join")
                .header("content-type", "application/json")
                .body(Body::from(join_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let beat_body = json!({
        "customerId": customer_id,
        "sessionId": "s1",
        "tabId": "t1",
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/beat")
                .header("content-type", "application/json")
                .body(Body::from(beat_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn beat_missing_fields_is_bad_request() {
    let state = test_state().await;
    let app = routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/beat")
                .header("content-type", "application/json")
                .body(Body::from(json!({"customerId": "acme"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn join_missing_fields_is_bad_request() {
    let state = test_state().await;
    let app = routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/join")
                .header("content-type", "application/json")
                .body(Body::from(json!({"customerId": "acme"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn leave_with_unparseable_body_is_dismissal_safe() {
    let state = test_state().await;
    let app = routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/leave")
                .header("content-type", "text/plain")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn metrics_without_customer_id_is_bad_request() {
    let state = test_state().await;
    let app = routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/active-users/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_leave_id_is_absorbed() {
    let state = test_state().await;
    let customer_id = unique_customer_id("acme");
    let app = routes(state);

    let leave_body = json!({
        "customerId": customer_id,
        "sessionId": "s1",
        "tabId": "t1",
    });

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/leave")
                .header("content-type", "application/json")
                .header("X-Leave-Id", "leave-once")
                .body(Body::from(leave_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/presence/leave")
                .header("content-type", "application/json")
                .header("X-Leave-Id", "leave-once")
                .body(Body::from(leave_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn every_response_carries_rate_limit_headers() {
    let state = test_state().await;
    let app = routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/active-users/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key("X-RateLimit-Limit"));
    assert!(response.headers().contains_key("X-RateLimit-Remaining"));
    assert!(response.headers().contains_key("X-RateLimit-Reset"));
}
