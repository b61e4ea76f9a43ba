//! Response bodies returned to the submitting sites.

use serde::{Deserialize, Serialize};

/// Acknowledgement for `POST /api/proxy`.
///
/// Serialized as `{"ok":true}` on success and
/// `{"ok":false,"error":"..."}` on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ProxyResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}
