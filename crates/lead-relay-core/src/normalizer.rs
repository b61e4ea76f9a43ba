//! Payload normalization.
//!
//! Turns a decoded form submission of unknown shape into a [`NormalizedLead`].
//!
//! # Shapes
//!
//! A submission is classified by the first [`SubmissionShape`] in
//! [`SubmissionShape::DISPATCH_ORDER`] whose trigger keys it carries. Shapes
//! are never merged: once one matches, only its extractor runs.
//!
//! | Shape              | Trigger                                                   |
//! |--------------------|-----------------------------------------------------------|
//! | `DirectJson`       | top-level `name`, `email`, `phone`, `message`, `desc`, `description` |
//! | `FlatForm`         | the above, or `country_code` / `country code`             |
//! | `StructuredFields` | a `fields`, `form_fields` or `form` container             |
//!
//! A submission matching no shape normalizes to an all-empty lead. The
//! referrer URL is resolved independently of the shape.
//!
//! Normalization never fails: every lookup falls back to an empty string.

use crate::fields::{is_truthy, pick, pick_matching, pick_textarea_first, truthy_string};
use crate::lead::{NormalizedLead, SubmissionHeaders};
use crate::referrer::resolve_ref_url;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;

/// Pattern alternatives for field names that carry the free-text message.
const MESSAGE_NAME_PATTERN: &str = r"message|msg|comments?|desc(ription)?|textarea";

/// Top-level keys whose presence marks a flat submission.
const DIRECT_KEYS: [&str; 6] = ["name", "email", "phone", "message", "desc", "description"];

/// Top-level keys carrying a phone country code.
const COUNTRY_CODE_KEYS: [&str; 2] = ["country_code", "country code"];

/// Top-level keys carrying the message in a flat submission, in priority order.
const MESSAGE_KEYS: [&str; 3] = ["desc", "message", "description"];

/// Message keys accepted on Elementor's `form_fields` and `form` objects.
const FORM_MESSAGE_KEYS: [&str; 6] = ["desc", "message", "description", "msg", "comments", "comment"];

/// Containers that hold structured form fields.
const FIELD_CONTAINERS: [&str; 3] = ["fields", "form_fields", "form"];

/// Normalization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Locale-specific words for "message" accepted as field names in
    /// addition to the built-in English tokens.
    pub message_synonyms: Vec<String>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            // Hebrew for "message" and "notice".
            message_synonyms: vec!["הודעה".to_string(), "מסר".to_string()],
        }
    }
}

/// Errors building a [`PayloadNormalizer`].
#[derive(Debug, thiserror::Error)]
pub enum NormalizerError {
    #[error("Invalid message synonym pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Recognised top-level submission shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionShape {
    /// JSON posted by the custom site forms: flat keys, phone sent whole.
    DirectJson,

    /// Elementor's flat URL-encoded post, where the country code travels in
    /// a separate key.
    FlatForm,

    /// Elementor webhook payloads nesting inputs under `fields`,
    /// `form_fields` or `form`.
    StructuredFields,
}

impl SubmissionShape {
    /// Classification order; the first matching shape wins.
    pub const DISPATCH_ORDER: [SubmissionShape; 3] = [
        SubmissionShape::DirectJson,
        SubmissionShape::FlatForm,
        SubmissionShape::StructuredFields,
    ];

    /// First shape in [`Self::DISPATCH_ORDER`] matching `body`.
    pub fn classify(body: &Value) -> Option<Self> {
        Self::DISPATCH_ORDER
            .into_iter()
            .find(|shape| shape.matches(body))
    }

    pub fn matches(self, body: &Value) -> bool {
        let has = |key: &str| truthy_string(body, key).is_some() || is_container(body, key);
        match self {
            Self::DirectJson => DIRECT_KEYS.iter().any(|k| truthy_string(body, k).is_some()),
            Self::FlatForm => DIRECT_KEYS
                .iter()
                .chain(COUNTRY_CODE_KEYS.iter())
                .any(|k| truthy_string(body, k).is_some()),
            Self::StructuredFields => FIELD_CONTAINERS.iter().any(|k| has(k)),
        }
    }

    fn extract(self, normalizer: &PayloadNormalizer, body: &Value) -> NormalizedLead {
        match self {
            Self::DirectJson => NormalizedLead {
                name: truthy_string(body, "name").unwrap_or_default(),
                email: truthy_string(body, "email").unwrap_or_default(),
                phone: truthy_string(body, "phone").unwrap_or_default(),
                message: normalizer.resolve_message(body),
                ref_url: String::new(),
            },
            Self::FlatForm => NormalizedLead {
                name: truthy_string(body, "name").unwrap_or_default(),
                email: truthy_string(body, "email").unwrap_or_default(),
                phone: compose_phone(body, None),
                message: normalizer.resolve_message(body),
                ref_url: String::new(),
            },
            Self::StructuredFields => NormalizedLead {
                name: pick_from_containers(body, "name"),
                email: pick_from_containers(body, "email"),
                phone: compose_phone(body, body.get("fields")),
                message: normalizer.resolve_message(body),
                ref_url: String::new(),
            },
        }
    }
}

/// Normalizes form submissions into [`NormalizedLead`] records.
///
/// Holds no per-request state; one instance is shared by all requests.
#[derive(Debug, Clone)]
pub struct PayloadNormalizer {
    message_pattern: Regex,
}

impl PayloadNormalizer {
    /// Build a normalizer, compiling the message-name pattern from the
    /// built-in tokens and the configured locale synonyms.
    pub fn new(config: &NormalizationConfig) -> Result<Self, NormalizerError> {
        let synonyms = config
            .message_synonyms
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(regex::escape);

        let alternatives: Vec<String> = std::iter::once(MESSAGE_NAME_PATTERN.to_string())
            .chain(synonyms)
            .collect();

        let message_pattern = RegexBuilder::new(&format!("({})", alternatives.join("|")))
            .case_insensitive(true)
            .build()?;

        Ok(Self { message_pattern })
    }

    /// Pattern matched against field names and labels to find the message.
    pub fn message_pattern(&self) -> &Regex {
        &self.message_pattern
    }

    /// Normalize a decoded submission.
    ///
    /// `headers` is consulted only for the referrer fallback.
    pub fn normalize(&self, body: &Value, headers: &SubmissionHeaders) -> NormalizedLead {
        let ref_url = resolve_ref_url(body, headers);

        let shape = SubmissionShape::classify(body);
        debug!(shape = ?shape, "Classified submission");

        let lead = shape
            .map(|s| s.extract(self, body))
            .unwrap_or_default();

        NormalizedLead { ref_url, ..lead }
    }

    /// Resolve the free-text message.
    ///
    /// Priority, stopping at the first non-empty result:
    /// 1. top-level `desc`, `message`, `description`
    /// 2. within `fields`: a textarea-typed entry, then the exact names
    ///    `desc`, `message`, `description`, then any name or label matching
    ///    the message pattern
    /// 3. the message keys of `form_fields`, then of `form`
    pub fn resolve_message(&self, body: &Value) -> String {
        if let Some(message) = MESSAGE_KEYS.iter().find_map(|k| truthy_string(body, k)) {
            return message;
        }

        if let Some(fields) = body.get("fields").filter(|f| is_truthy(f)) {
            let fields = Some(fields);
            let candidates = [
                pick_textarea_first(fields, &self.message_pattern),
                first_non_empty(MESSAGE_KEYS.iter().map(|k| pick(fields, k))),
                pick_matching(fields, &self.message_pattern),
            ];
            if let Some(message) = candidates.into_iter().find(|m| !m.is_empty()) {
                return message;
            }
        }

        ["form_fields", "form"]
            .iter()
            .filter_map(|container| body.get(*container).filter(|c| c.is_object()))
            .map(|container| {
                first_non_empty(FORM_MESSAGE_KEYS.iter().map(|k| pick(Some(container), k)))
            })
            .find(|message| !message.is_empty())
            .unwrap_or_default()
    }
}

/// Join an optional country code and phone number with a single space.
///
/// The country code comes from top-level `country_code` / `country code`,
/// or from the field container when one is supplied; the number from
/// top-level `phone` or the container's `phone` entry. Each part is trimmed
/// and empty parts are dropped.
pub fn compose_phone(body: &Value, fields: Option<&Value>) -> String {
    let country_code = COUNTRY_CODE_KEYS
        .iter()
        .find_map(|k| truthy_string(body, k))
        .or_else(|| {
            fields.map(|f| first_non_empty(COUNTRY_CODE_KEYS.iter().map(|k| pick(Some(f), k))))
        })
        .unwrap_or_default();

    let number = truthy_string(body, "phone")
        .or_else(|| fields.map(|f| pick(Some(f), "phone")))
        .unwrap_or_default();

    [country_code, number]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `key` from `fields`, falling back to the `form_fields` and `form` objects.
fn pick_from_containers(body: &Value, key: &str) -> String {
    first_non_empty(FIELD_CONTAINERS.iter().map(|c| pick(body.get(*c), key)))
}

fn first_non_empty(candidates: impl IntoIterator<Item = String>) -> String {
    candidates
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn is_container(body: &Value, key: &str) -> bool {
    matches!(body.get(key), Some(Value::Array(_)) | Some(Value::Object(_)))
}
