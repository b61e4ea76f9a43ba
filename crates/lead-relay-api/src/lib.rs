//! # Lead Relay HTTP Service
//!
//! HTTP server receiving lead-capture form submissions and relaying them to
//! the CRM webhook.
//!
//! This service provides:
//! - `POST /api/proxy`: normalize a submission and forward it to the CRM
//! - `GET /health` and `GET /`: liveness endpoints
//! - Origin allow-listing for browser submissions

pub mod config;
pub mod cors;
pub mod errors;
pub mod responses;



pub use config::{CorsConfig, CrmConfig, LoggingConfig, ServerConfig, ServiceConfig};
pub use cors::{build_cors_layer, origin_guard_middleware, OriginAllowList};
pub use errors::{ConfigError, ProxyHandlerError, ServiceError};
pub use responses::ProxyResponse;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use lead_relay_core::{
    decode_submission, resolve_host, CrmSubmission, LeadForwarder, LeadSourceTable,
    PayloadNormalizer, SubmissionHeaders,
};
use std::{collections::HashMap, sync::Arc};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
///
/// Everything here is read-only after start-up; requests share no mutable
/// state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: Arc<ServiceConfig>,

    /// Payload normalizer built from the normalization settings
    pub normalizer: Arc<PayloadNormalizer>,

    /// Host → lead-source code mapping
    pub lead_sources: Arc<LeadSourceTable>,

    /// Destination for normalized leads
    pub forwarder: Arc<dyn LeadForwarder>,
}

impl AppState {
    /// Create new application state
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Normalization`] when the configured message
    /// synonyms cannot be compiled.
    pub fn new(config: ServiceConfig, forwarder: Arc<dyn LeadForwarder>) -> Result<Self, ConfigError> {
        let normalizer = PayloadNormalizer::new(&config.normalization)?;
        let lead_sources = config.lead_sources.clone();

        Ok(Self {
            config: Arc::new(config),
            normalizer: Arc::new(normalizer),
            lead_sources: Arc::new(lead_sources),
            forwarder,
        })
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let allow_list = OriginAllowList::from_config(&state.config.cors);
    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health_check))
        .route("/api/proxy", post(handle_proxy))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    allow_list.clone(),
                    origin_guard_middleware,
                ))
                .layer(build_cors_layer(&allow_list))
                .layer(DefaultBodyLimit::max(max_body_size))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
pub async fn start_server(
    config: ServiceConfig,
    forwarder: Arc<dyn LeadForwarder>,
) -> Result<(), ServiceError> {
    let address = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_seconds);

    let state = AppState::new(config, forwarder)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);

    let shutdown_signal = async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to install Ctrl+C signal handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM signal handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
        }
    };

    // In-flight forwards are allowed to finish; new connections stop
    // immediately once the signal arrives.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Proxy Handler
// ============================================================================

/// Handle a lead submission
///
/// 1. Decode the body (JSON or URL-encoded) without failing
/// 2. Normalize it into a lead
/// 3. Resolve the submitting host and its lead-source code
/// 4. Forward to the CRM and wait for its answer
///
/// The caller gets `200` only once the CRM has accepted the lead.
#[instrument(skip(state, headers, body))]
pub async fn handle_proxy(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProxyResponse>, ProxyHandlerError> {
    // Convert headers to HashMap
    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();
    let submission_headers = SubmissionHeaders::from_http_headers(&header_map);

    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let raw = decode_submission(content_type, &body);

    debug!(
        keys = ?raw.as_object().map(|m| m.keys().collect::<Vec<_>>()),
        "Incoming submission keys"
    );

    let lead = state.normalizer.normalize(&raw, &submission_headers);
    debug!(lead = ?lead, "Normalized submission");

    if lead.is_empty() {
        warn!("Submission yielded no contact data; forwarding anyway");
    }

    let host = resolve_host(&lead.ref_url, &submission_headers);
    let lead_source = state.lead_sources.resolve(&host).to_string();
    let submission = CrmSubmission::with_generated_sid(&lead, lead_source.clone());

    match state.forwarder.forward(&submission).await {
        Ok(receipt) => {
            info!(
                host = %host,
                lead_source = %lead_source,
                sid = %submission.sid,
                status = receipt.status,
                "Lead forwarded to CRM"
            );
            Ok(Json(ProxyResponse::ok()))
        }
        Err(source) => Err(ProxyHandlerError::ForwardFailed {
            host,
            lead_source,
            source,
        }),
    }
}

// ============================================================================
// Liveness Handlers
// ============================================================================

async fn handle_root() -> &'static str {
    "OK"
}

async fn handle_health_check() -> &'static str {
    "healthy"
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// This middleware:
/// - Extracts or generates correlation IDs for request tracking
/// - Logs request start and completion with structured fields
/// - Propagates correlation ID through response headers
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    info!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "Request started"
    );

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();

    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}
