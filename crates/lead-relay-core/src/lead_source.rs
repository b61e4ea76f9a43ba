//! Host → CRM lead-source code table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
#[path = "lead_source_tests.rs"]
mod tests;

/// Static mapping from a site's hostname to the CRM code identifying it.
///
/// Lookups are exact and case-sensitive. Misspelled hosts that are live in
/// production are listed as keys in their own right; no fuzzy matching is
/// attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadSourceTable {
    /// Code used when the host is not listed.
    pub default_code: String,

    /// Hostname (lowercase, no scheme or path) → lead-source code.
    pub table: HashMap<String, String>,
}

impl Default for LeadSourceTable {
    fn default() -> Self {
        let table = [
            ("heritage-based-european-citizenship.lawoffice.org.il", "30018"),
            ("german-austrian-citizenship.lawoffice.org.il", "12108"),
            // Spelling served by the live German/Austrian site.
            ("german-austiran-citizenship.lawoffice.org.il", "12108"),
        ]
        .into_iter()
        .map(|(host, code)| (host.to_string(), code.to_string()))
        .collect();

        Self {
            default_code: "30018".to_string(),
            table,
        }
    }
}

impl LeadSourceTable {
    pub fn new(default_code: impl Into<String>, table: HashMap<String, String>) -> Self {
        Self {
            default_code: default_code.into(),
            table,
        }
    }

    /// Lead-source code for `host`, or the default code on a miss.
    pub fn resolve(&self, host: &str) -> &str {
        self.table
            .get(host)
            .map(String::as_str)
            .unwrap_or(&self.default_code)
    }
}
