//! # Lead Relay Core
//!
//! Core logic for the lead relay: turning lead-capture form submissions from
//! WordPress/Elementor sites into one canonical record and forwarding that
//! record to the CRM webhook.
//!
//! ## Architecture
//!
//! Each inbound request flows through one pipeline:
//!
//! 1. [`body::decode_submission`] turns the raw body (JSON or URL-encoded)
//!    into an untyped [`serde_json::Value`].
//! 2. [`normalizer::PayloadNormalizer`] classifies the body by shape and
//!    extracts a [`NormalizedLead`], using the field locator in [`fields`].
//! 3. [`referrer`] derives the submitting host and [`lead_source`] maps it to
//!    a CRM lead-source code.
//! 4. [`crm::LeadForwarder`] sends the resulting [`crm::CrmSubmission`].
//!
//! Steps 1 to 3 are pure and never fail; every missing datum becomes an
//! empty string. Only step 4 can fail.
//!
//! ## Usage
//!
//! ```rust
//! use lead_relay_core::{NormalizationConfig, PayloadNormalizer, SubmissionHeaders};
//!
//! let normalizer = PayloadNormalizer::new(&NormalizationConfig::default()).unwrap();
//! let body = serde_json::json!({ "name": "Jane", "email": "j@x.com" });
//! let lead = normalizer.normalize(&body, &SubmissionHeaders::default());
//!
//! assert_eq!(lead.name, "Jane");
//! assert_eq!(lead.phone, "");
//! ```

pub mod body;
pub mod crm;
pub mod fields;
pub mod lead;
pub mod lead_source;
pub mod normalizer;
pub mod referrer;

pub use body::decode_submission;
pub use crm::{
    CrmClientConfig, CrmSubmission, CrmWebhookClient, ForwardError, ForwardReceipt, LeadForwarder,
};
pub use lead::{NormalizedLead, SubmissionHeaders};
pub use lead_source::LeadSourceTable;
pub use normalizer::{
    compose_phone, NormalizationConfig, NormalizerError, PayloadNormalizer, SubmissionShape,
};
pub use referrer::{resolve_host, resolve_ref_url};
