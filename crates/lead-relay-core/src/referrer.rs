//! Referrer and host resolution.
//!
//! A submission's origin page is reported in several places depending on the
//! form plugin: Elementor's `meta` block, an explicit body field, or only the
//! browser's `Referer` header. These functions pick the most specific one.

use crate::fields::truthy_string;
use crate::lead::SubmissionHeaders;
use serde_json::Value;
use url::Url;

#[cfg(test)]
#[path = "referrer_tests.rs"]
mod tests;

/// Keys of Elementor's `meta` object that carry the page URL.
const META_KEYS: [&str; 2] = ["referer", "page_url"];

/// Top-level body keys that carry the page URL.
const BODY_KEYS: [&str; 4] = ["ref_url", "referer", "page_url", "pageUrl"];

/// Best available source URL for a submission.
///
/// Candidates in priority order:
/// 1. `meta.referer` / `meta.page_url`, either plain or as `{ "value": ... }`
/// 2. top-level `ref_url`, `referer`, `page_url`, `pageUrl`
/// 3. the `Referer` (or `Referrer`) header
///
/// The result is returned verbatim and is not validated as a URL. An empty
/// string means nothing was found.
pub fn resolve_ref_url(body: &Value, headers: &SubmissionHeaders) -> String {
    let meta = body.get("meta");

    META_KEYS
        .iter()
        .find_map(|key| meta.and_then(|m| meta_string(m.get(*key))))
        .or_else(|| BODY_KEYS.iter().find_map(|key| truthy_string(body, key)))
        .or_else(|| headers.referer().map(str::to_string))
        .unwrap_or_default()
}

/// Elementor meta entries are either a string or `{ "title": ..., "value": ... }`.
fn meta_string(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("value")?.as_str()?,
        _ => return None,
    };
    (!s.is_empty()).then(|| s.to_string())
}

/// Host of the submitting site.
///
/// Tries `ref_url`, then the `Referer`/`Referrer` header, then the `Origin`
/// header. Each candidate is parsed independently; one failing to parse does
/// not stop the next. The first candidate that parses decides, so a hostless
/// URL such as `mailto:` yields an empty host. Returns an empty string when
/// nothing parses.
pub fn resolve_host(ref_url: &str, headers: &SubmissionHeaders) -> String {
    [Some(ref_url), headers.referer(), headers.origin()]
        .into_iter()
        .flatten()
        .find_map(host_of)
        .unwrap_or_default()
}

/// `host[:port]` of a URL string; the port appears only when it is not the
/// scheme's default. `None` when the string is empty or does not parse.
fn host_of(candidate: &str) -> Option<String> {
    if candidate.is_empty() {
        return None;
    }

    let url = Url::parse(candidate).ok()?;
    let host = url.host_str().unwrap_or_default();

    Some(match url.port() {
        Some(port) if !host.is_empty() => format!("{host}:{port}"),
        _ => host.to_string(),
    })
}
