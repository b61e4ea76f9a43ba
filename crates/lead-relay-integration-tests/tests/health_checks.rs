//! Integration tests for the liveness endpoints

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{create_test_app, read_text, MockForwarder};
use std::sync::Arc;
use tower::ServiceExt;

/// Verify that the root endpoint answers with plain "OK"
#[tokio::test]
async fn test_root_endpoint_returns_ok() {
    // Arrange
    let app = create_test_app(Arc::new(MockForwarder::new()));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    // Act
    let response = app.oneshot(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_text(response).await, "OK");
}

/// Verify that the health endpoint answers with plain "healthy"
#[tokio::test]
async fn test_health_endpoint_returns_healthy() {
    // Arrange
    let app = create_test_app(Arc::new(MockForwarder::new()));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    // Act
    let response = app.oneshot(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_text(response).await, "healthy");
}

/// Verify that liveness checks never touch the CRM
#[tokio::test]
async fn test_health_endpoint_does_not_forward() {
    // Arrange
    let forwarder = MockForwarder::new();
    let app = create_test_app(Arc::new(forwarder.clone()));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    // Act
    let response = app.oneshot(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(forwarder.call_count(), 0);
}

/// Verify that unknown paths are 404
#[tokio::test]
async fn test_unknown_path_returns_404() {
    // Arrange
    let app = create_test_app(Arc::new(MockForwarder::new()));
    let request = Request::builder().uri("/api/unknown").body(Body::empty()).unwrap();

    // Act
    let response = app.oneshot(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
