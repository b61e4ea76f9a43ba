use super::*;
use axum::{body::Body, http::header, routing::post, Router};
use tower::ServiceExt;

const SITE: &str = "https://heritage-based-european-citizenship.lawoffice.org.il";

fn guarded_router(allow_list: OriginAllowList) -> Router {
    Router::new()
        .route("/submit", post(|| async { "accepted" }))
        .layer(axum::middleware::from_fn_with_state(
            allow_list.clone(),
            origin_guard_middleware,
        ))
        .layer(build_cors_layer(&allow_list))
}

fn post_with_origin(origin: Option<&str>) -> Request {
    let mut builder = axum::http::Request::builder().method("POST").uri("/submit");
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::empty()).unwrap()
}

// ============================================================================
// Allow-list
// ============================================================================

mod allow_list_tests {
    use super::*;

    #[test]
    fn test_missing_origin_is_allowed() {
        let allow_list = OriginAllowList::new([SITE]);

        assert!(allow_list.is_allowed(None));
    }

    #[test]
    fn test_listed_origin_is_allowed() {
        let allow_list = OriginAllowList::new([SITE]);

        assert!(allow_list.is_allowed(Some(SITE)));
    }

    #[test]
    fn test_match_is_exact() {
        let allow_list = OriginAllowList::new([SITE]);

        assert!(!allow_list.is_allowed(Some("http://heritage-based-european-citizenship.lawoffice.org.il")));
        assert!(!allow_list.is_allowed(Some("https://evil.example")));
        assert!(!allow_list.is_allowed(Some(&format!("{}/", SITE))));
    }

    #[test]
    fn test_default_config_covers_deployed_sites() {
        let allow_list = OriginAllowList::from_config(&CorsConfig::default());

        assert!(allow_list.is_allowed(Some(SITE)));
        assert!(allow_list.is_allowed(Some(
            "https://german-austiran-citizenship.lawoffice.org.il"
        )));
    }
}

// ============================================================================
// Guard middleware
// ============================================================================

mod guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_disallowed_origin_gets_403_with_error_body() {
        let app = guarded_router(OriginAllowList::new([SITE]));

        let response = app
            .oneshot(post_with_origin(Some("https://evil.example")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"ok": false, "error": "Not allowed by CORS"}));
    }

    #[tokio::test]
    async fn test_allowed_origin_reaches_handler_with_cors_header() {
        let app = guarded_router(OriginAllowList::new([SITE]));

        let response = app.oneshot(post_with_origin(Some(SITE))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some(SITE)
        );
    }

    #[tokio::test]
    async fn test_request_without_origin_is_allowed() {
        let app = guarded_router(OriginAllowList::new([SITE]));

        let response = app.oneshot(post_with_origin(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_preflight_from_allowed_origin_is_answered() {
        let app = guarded_router(OriginAllowList::new([SITE]));

        let request = axum::http::Request::builder()
            .method("OPTIONS")
            .uri("/submit")
            .header(header::ORIGIN, SITE)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some(SITE)
        );
        let allowed_methods = response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(allowed_methods.contains("POST"));
    }
}
