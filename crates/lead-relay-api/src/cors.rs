//! Origin allow-listing.
//!
//! Browsers on the marketing sites post directly to the relay, so requests
//! carrying an `Origin` header must come from a configured site. Requests
//! without one (server-to-server webhooks, curl) are allowed through.
//!
//! Two pieces cooperate:
//! - [`origin_guard_middleware`] rejects disallowed origins with `403` before
//!   the body is read.
//! - [`build_cors_layer`] answers preflight requests and adds the CORS
//!   response headers for allowed origins.

use crate::config::CorsConfig;
use crate::responses::ProxyResponse;
use axum::{
    extract::{Request, State},
    http::{header::ORIGIN, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::{collections::HashSet, sync::Arc};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;

#[cfg(test)]
#[path = "cors_tests.rs"]
mod tests;

/// Exact-match set of allowed origins.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    origins: Arc<HashSet<String>>,
}

impl OriginAllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: Arc::new(origins.into_iter().map(Into::into).collect()),
        }
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        Self::new(config.allowed_origins.iter().cloned())
    }

    /// A missing origin is allowed; a present one must match exactly.
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.origins.contains(origin),
        }
    }

    fn header_values(&self) -> Vec<HeaderValue> {
        self.origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Skipping origin that is not a valid header value");
                    None
                }
            })
            .collect()
    }
}

/// Reject requests whose `Origin` header is not allow-listed.
///
/// An `Origin` header that is not valid UTF-8 is treated as disallowed.
pub async fn origin_guard_middleware(
    State(allow_list): State<OriginAllowList>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .map(|v| v.to_str().unwrap_or("\u{fffd}"));

    if allow_list.is_allowed(origin) {
        return next.run(request).await;
    }

    warn!(
        origin = %origin.unwrap_or_default(),
        method = %request.method(),
        uri = %request.uri(),
        "Rejected request from disallowed origin"
    );
    (
        StatusCode::FORBIDDEN,
        Json(ProxyResponse::failed("Not allowed by CORS")),
    )
        .into_response()
}

/// CORS response headers and preflight handling for allowed origins.
pub fn build_cors_layer(allow_list: &OriginAllowList) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allow_list.header_values()))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}
