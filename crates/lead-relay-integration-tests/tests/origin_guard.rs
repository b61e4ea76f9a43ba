//! Integration tests for origin allow-listing on the proxy endpoint

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{create_test_app, read_json, MockForwarder, HERITAGE_ORIGIN};
use std::sync::Arc;
use tower::ServiceExt;

fn proxy_post_from(origin: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/proxy")
        .header(header::ORIGIN, origin)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"name":"Jane","email":"jane@example.com"}"#))
        .unwrap()
}

/// Verify that a listed origin is forwarded and gets CORS headers
#[tokio::test]
async fn test_allowed_origin_is_forwarded() {
    // Arrange
    let forwarder = MockForwarder::new();
    let app = create_test_app(Arc::new(forwarder.clone()));

    // Act
    let response = app.oneshot(proxy_post_from(HERITAGE_ORIGIN)).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(HERITAGE_ORIGIN)
    );
    assert_eq!(forwarder.call_count(), 1);
}

/// Verify that an unlisted origin is refused and nothing is forwarded
#[tokio::test]
async fn test_disallowed_origin_is_refused() {
    // Arrange
    let forwarder = MockForwarder::new();
    let app = create_test_app(Arc::new(forwarder.clone()));

    // Act
    let response = app
        .oneshot(proxy_post_from("https://attacker.example"))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        read_json(response).await,
        serde_json::json!({"ok": false, "error": "Not allowed by CORS"})
    );
    assert_eq!(forwarder.call_count(), 0);
}

/// Verify that the preflight for a listed origin succeeds without forwarding
#[tokio::test]
async fn test_preflight_is_answered_without_forwarding() {
    // Arrange
    let forwarder = MockForwarder::new();
    let app = create_test_app(Arc::new(forwarder.clone()));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/proxy")
        .header(header::ORIGIN, HERITAGE_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    // Act
    let response = app.oneshot(request).await.unwrap();

    // Assert
    assert!(response.status().is_success());
    assert_eq!(forwarder.call_count(), 0);
}

/// Verify that a failing CRM surfaces as 500 even for an allowed origin
#[tokio::test]
async fn test_forward_failure_from_allowed_origin_returns_500() {
    // Arrange
    let forwarder = MockForwarder::new();
    forwarder.set_failure_status(502);
    let app = create_test_app(Arc::new(forwarder.clone()));

    // Act
    let response = app.oneshot(proxy_post_from(HERITAGE_ORIGIN)).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(forwarder.call_count(), 1);
}
