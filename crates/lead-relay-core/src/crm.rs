//! Outbound delivery of leads to the CRM webhook.
//!
//! The CRM accepts leads as a single `GET` with every datum in the query
//! string. Delivery is synchronous from the caller's point of view and is
//! attempted exactly once: there is no retry, queueing or circuit breaking.

use crate::lead::NormalizedLead;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, instrument};
use url::Url;

#[cfg(test)]
#[path = "crm_tests.rs"]
mod tests;

/// Longest slice of an error response body kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Configuration for [`CrmWebhookClient`].
///
/// # Examples
///
/// ```
/// use lead_relay_core::CrmClientConfig;
/// use std::time::Duration;
///
/// let config = CrmClientConfig::default()
///     .with_base_url("https://crm.example/hooks/catch/")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.uid, "fxSOVhSeeRs9");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmClientConfig {
    /// Webhook endpoint; query parameters are appended to it.
    pub base_url: String,

    /// Per-deployment account identifier sent as `uid`.
    pub uid: String,

    /// Upper bound on the whole outbound request.
    pub timeout: Duration,
}

impl Default for CrmClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.rainmakerqueen.com/hooks/catch/".to_string(),
            uid: "fxSOVhSeeRs9".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl CrmClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One lead as the CRM receives it.
///
/// Every parameter is always sent; unset data is sent as an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmSubmission {
    /// Submission id, unique per request.
    pub sid: String,
    pub lead_source: String,
    pub name: String,
    pub phone: String,
    pub email: String,

    /// None of the relayed forms carries a topic; always empty.
    pub topic: String,

    /// The lead's free-text message.
    pub desc: String,
    pub ref_url: String,
}

impl CrmSubmission {
    pub fn new(lead: &NormalizedLead, lead_source: impl Into<String>, sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            lead_source: lead_source.into(),
            name: lead.name.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            topic: String::new(),
            desc: lead.message.clone(),
            ref_url: lead.ref_url.clone(),
        }
    }

    /// Build with a submission id taken from the current time in milliseconds.
    pub fn with_generated_sid(lead: &NormalizedLead, lead_source: impl Into<String>) -> Self {
        Self::new(lead, lead_source, generate_sid())
    }

    /// Query parameters in the order the CRM documents them.
    pub fn query_pairs<'a>(&'a self, uid: &'a str) -> [(&'static str, &'a str); 9] {
        [
            ("uid", uid),
            ("sid", &self.sid),
            ("lead_source", &self.lead_source),
            ("name", &self.name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("topic", &self.topic),
            ("desc", &self.desc),
            ("ref_url", &self.ref_url),
        ]
    }
}

/// Current Unix time in milliseconds, as a string.
pub fn generate_sid() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// Outcome of a successful forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReceipt {
    /// HTTP status returned by the CRM.
    pub status: u16,
}

/// Reasons a forward failed.
///
/// All variants are terminal for the submission; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Invalid CRM endpoint '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    #[error("CRM request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("CRM request failed: {message}")]
    Transport { message: String },

    #[error("CRM responded with status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl ForwardError {
    /// Whether the failure was the timeout bound rather than a CRM answer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Destination for normalized leads.
#[async_trait]
pub trait LeadForwarder: Send + Sync {
    /// Deliver one submission, resolving once the destination has answered
    /// or the attempt has failed.
    async fn forward(&self, submission: &CrmSubmission) -> Result<ForwardReceipt, ForwardError>;
}

/// [`LeadForwarder`] calling the CRM's catch-hook endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct CrmWebhookClient {
    http_client: reqwest::Client,
    endpoint: Url,
    config: CrmClientConfig,
}

impl CrmWebhookClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::InvalidEndpoint`] when `base_url` is not an
    /// absolute URL, and [`ForwardError::Transport`] when the HTTP client
    /// cannot be initialised.
    pub fn new(config: CrmClientConfig) -> Result<Self, ForwardError> {
        let endpoint = Url::parse(&config.base_url).map_err(|e| ForwardError::InvalidEndpoint {
            url: config.base_url.clone(),
            message: e.to_string(),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ForwardError::Transport {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            endpoint,
            config,
        })
    }

    pub fn config(&self) -> &CrmClientConfig {
        &self.config
    }

    /// Host of the CRM endpoint, for diagnostics.
    pub fn endpoint_host(&self) -> &str {
        self.endpoint.host_str().unwrap_or_default()
    }

    /// Full request URL for `submission`.
    pub fn request_url(&self, submission: &CrmSubmission) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .extend_pairs(submission.query_pairs(&self.config.uid));
        url
    }
}

#[async_trait]
impl LeadForwarder for CrmWebhookClient {
    #[instrument(skip(self, submission), fields(
        crm_host = %self.endpoint_host(),
        sid = %submission.sid,
        lead_source = %submission.lead_source,
    ))]
    async fn forward(&self, submission: &CrmSubmission) -> Result<ForwardReceipt, ForwardError> {
        let url = self.request_url(submission);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ForwardError::Timeout {
                    seconds: self.config.timeout.as_secs(),
                }
            } else {
                ForwardError::Transport {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();

            error!(status = status.as_u16(), body = %body, "CRM rejected lead");
            return Err(ForwardError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!(status = status.as_u16(), "CRM accepted lead");
        Ok(ForwardReceipt {
            status: status.as_u16(),
        })
    }
}
