//! Common test utilities for lead-relay integration tests
//!
//! This module provides:
//! - A recording [`LeadForwarder`] double
//! - Helpers for building application state and requests

use axum::{body::Body, http::Request, response::Response, Router};
use lead_relay_api::{create_router, AppState, ServiceConfig};
use lead_relay_core::{
    CrmClientConfig, CrmSubmission, CrmWebhookClient, ForwardError, ForwardReceipt,
    LeadForwarder,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[allow(dead_code)]
pub const HERITAGE_ORIGIN: &str = "https://heritage-based-european-citizenship.lawoffice.org.il";
#[allow(dead_code)]
pub const GERMAN_ORIGIN: &str = "https://german-austrian-citizenship.lawoffice.org.il";

// ============================================================================
// Mock Forwarder
// ============================================================================

/// Records submissions and returns a configurable outcome.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct MockForwarder {
    calls: Arc<Mutex<Vec<CrmSubmission>>>,
    failure_status: Arc<Mutex<Option<u16>>>,
}

impl MockForwarder {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent forward fail as if the CRM answered `status`.
    #[allow(dead_code)]
    pub fn set_failure_status(&self, status: u16) {
        *self.failure_status.lock().unwrap() = Some(status);
    }

    #[allow(dead_code)]
    pub fn get_calls(&self) -> Vec<CrmSubmission> {
        self.calls.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LeadForwarder for MockForwarder {
    async fn forward(&self, submission: &CrmSubmission) -> Result<ForwardReceipt, ForwardError> {
        self.calls.lock().unwrap().push(submission.clone());
        match *self.failure_status.lock().unwrap() {
            Some(status) => Err(ForwardError::UnexpectedStatus {
                status,
                body: String::new(),
            }),
            None => Ok(ForwardReceipt { status: 200 }),
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Router over default configuration and the given forwarder.
#[allow(dead_code)]
pub fn create_test_app(forwarder: Arc<dyn LeadForwarder>) -> Router {
    let state = AppState::new(ServiceConfig::default(), forwarder).unwrap();
    create_router(state)
}

/// Real CRM client pointed at a mock server.
#[allow(dead_code)]
pub fn crm_client_for(base_url: &str) -> Arc<CrmWebhookClient> {
    let config = CrmClientConfig::default()
        .with_base_url(base_url)
        .with_uid("test-uid")
        .with_timeout(Duration::from_secs(2));
    Arc::new(CrmWebhookClient::new(config).unwrap())
}

/// JSON `POST /api/proxy` request.
#[allow(dead_code)]
pub fn proxy_request(payload: &serde_json::Value, referer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/proxy")
        .header("content-type", "application/json");
    if let Some(referer) = referer {
        builder = builder.header("referer", referer);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

#[allow(dead_code)]
pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn read_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
