//! Canonical lead record and the request headers the normalizer may consult.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
#[path = "lead_tests.rs"]
mod tests;

/// Canonical lead extracted from a form submission.
///
/// Every field defaults to an empty string. A lead is fully resolved before it
/// is forwarded; there are no lazy or partial fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedLead {
    pub name: String,
    pub email: String,

    /// Country code and number joined by a single space.
    pub phone: String,

    pub message: String,

    /// Best-effort URL of the page the form was submitted from.
    pub ref_url: String,
}

impl NormalizedLead {
    /// Returns `true` when no contact datum could be extracted.
    ///
    /// `ref_url` is ignored; it describes where the submission came from, not
    /// who submitted it.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.email.is_empty()
            && self.phone.is_empty()
            && self.message.is_empty()
    }
}

/// Case-insensitive view of the inbound HTTP headers.
///
/// Names are stored lowercased. Only the headers the normalizer and the host
/// resolver read (`referer`, `referrer`, `origin`) matter, but the full map is
/// kept so callers do not have to know which ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionHeaders {
    headers: HashMap<String, String>,
}

impl SubmissionHeaders {
    /// Build from an already-extracted header map. Names are lowercased.
    pub fn from_http_headers(headers: &HashMap<String, String>) -> Self {
        Self {
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        }
    }

    /// Add or replace a header, returning the updated set.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Header value, or `None` when absent or empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The referring page, accepting both the standard `Referer` spelling and
    /// the dictionary spelling `Referrer`.
    pub fn referer(&self) -> Option<&str> {
        self.get("referer").or_else(|| self.get("referrer"))
    }

    pub fn origin(&self) -> Option<&str> {
        self.get("origin")
    }
}
