//! Error types for the HTTP service

use crate::responses::ProxyResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use lead_relay_core::{ForwardError, NormalizerError};
use tracing::error;

/// Proxy handler errors with HTTP status code mapping
///
/// Normalization cannot fail, so the only failure left at the handler
/// boundary is delivery to the CRM. Every delivery failure (network error,
/// non-2xx answer, timeout) maps to `500 Internal Server Error`.
///
/// # Security Considerations
///
/// The client receives a fixed, generic body. The underlying error, the
/// submitting host and the resolved lead source are logged server-side only.
#[derive(Debug, thiserror::Error)]
pub enum ProxyHandlerError {
    /// The CRM webhook call failed
    #[error("Forwarding lead from '{host}' (lead_source {lead_source}) failed: {source}")]
    ForwardFailed {
        host: String,
        lead_source: String,
        #[source]
        source: ForwardError,
    },
}

impl IntoResponse for ProxyHandlerError {
    fn into_response(self) -> Response {
        match &self {
            Self::ForwardFailed {
                host,
                lead_source,
                source,
            } => {
                error!(
                    host = %host,
                    lead_source = %lead_source,
                    timeout = source.is_timeout(),
                    error = %source,
                    "Proxy error"
                );
            }
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ProxyResponse::failed("Proxy error")),
        )
            .into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Invalid message synonyms: {0}")]
    Normalization(#[from] NormalizerError),
}
