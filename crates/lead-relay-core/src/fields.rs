//! Field locator for Elementor-style field containers.
//!
//! Form builders nest their inputs in a "fields" container whose shape varies
//! between sites and plugin versions:
//!
//! | Container shape | Example                                               |
//! |-----------------|-------------------------------------------------------|
//! | Sequence        | `[{"id": "name", "value": "Jane"}, ...]`              |
//! | Mapping         | `{"name": {"raw_value": "Jane"}, "email": "j@x.com"}` |
//!
//! Each entry may be a plain string or an object wrapping its datum under
//! `value`, `raw_value`, `values` or `val`, and names itself through any of
//! `id`, `key`, `shortcode`, `field_id`, `title` or `label`.
//!
//! Every lookup in this module returns an empty string rather than failing.

use regex::Regex;
use serde_json::{Map, Value};

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;

/// Keys that may carry an entry's name, in priority order.
const NAME_KEYS: [&str; 6] = ["id", "key", "shortcode", "field_id", "title", "label"];

/// Keys that may wrap an entry's datum, in priority order.
const VALUE_KEYS: [&str; 4] = ["value", "raw_value", "values", "val"];

/// Substrings of a declared field type that indicate multi-line input.
const TEXTAREA_TYPES: [&str; 3] = ["textarea", "paragraph", "multiline"];

/// Convert a JSON scalar to the string that is forwarded.
///
/// Arrays (checkbox groups, multi-selects) are joined with `,`. Objects and
/// `null` have no string form and become empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null | Value::Object(_) => String::new(),
    }
}

/// Whether a top-level value counts as "set".
///
/// Empty strings, `null`, `false` and zero are unset, mirroring how form
/// plugins treat blank inputs.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String form of `object[key]` when that value is set, else `None`.
pub fn truthy_string(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .filter(|v| is_truthy(v))
        .map(value_to_string)
        .filter(|s| !s.is_empty())
}

/// Extract the datum of a single field entry.
///
/// A scalar entry is its own value. An object entry yields the first present,
/// non-null wrapper key; a present empty string stops the search.
pub fn field_value(node: &Value) -> String {
    match node {
        Value::Object(map) => VALUE_KEYS
            .iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
            .map(value_to_string)
            .unwrap_or_default(),
        other => value_to_string(other),
    }
}

/// Normalized name of a field entry: lowercased and trimmed.
///
/// `explicit_key` (the key of a mapping container) takes precedence over any
/// name the entry carries itself.
pub fn field_name(node: &Value, explicit_key: Option<&str>) -> String {
    let candidate = match explicit_key {
        Some(key) => key.to_string(),
        None => NAME_KEYS
            .iter()
            .find_map(|key| node.get(*key).filter(|v| !v.is_null()))
            .map(value_to_string)
            .unwrap_or_default(),
    };
    candidate.trim().to_lowercase()
}

/// One entry within a field container.
#[derive(Debug, Clone, Copy)]
pub struct FieldEntry<'a> {
    key: Option<&'a str>,
    node: &'a Value,
}

impl<'a> FieldEntry<'a> {
    pub fn name(&self) -> String {
        field_name(self.node, self.key)
    }

    /// Normalized label, when the entry declares one.
    pub fn label(&self) -> Option<String> {
        self.node
            .get("label")
            .filter(|v| is_truthy(v))
            .map(|v| value_to_string(v).trim().to_lowercase())
    }

    pub fn value(&self) -> String {
        field_value(self.node)
    }

    /// Whether the declared input type suggests multi-line text.
    pub fn looks_like_textarea(&self) -> bool {
        let declared = self
            .node
            .get("type")
            .map(value_to_string)
            .unwrap_or_default()
            .to_lowercase();
        TEXTAREA_TYPES.iter().any(|t| declared.contains(t))
    }
}

/// A field container of known shape.
#[derive(Debug, Clone, Copy)]
pub enum FieldContainer<'a> {
    /// Ordered sequence of entries naming themselves.
    Sequence(&'a [Value]),

    /// Entries keyed by field name, in insertion order.
    Mapping(&'a Map<String, Value>),
}

impl<'a> FieldContainer<'a> {
    /// Classify a container. Any shape other than an array or object yields `None`.
    pub fn from_value(value: Option<&'a Value>) -> Option<Self> {
        match value? {
            Value::Array(items) => Some(Self::Sequence(items)),
            Value::Object(map) => Some(Self::Mapping(map)),
            _ => None,
        }
    }

    /// Entries in container order.
    pub fn entries(&self) -> Box<dyn Iterator<Item = FieldEntry<'a>> + 'a> {
        match *self {
            Self::Sequence(items) => Box::new(items.iter().map(|node| FieldEntry { key: None, node })),
            Self::Mapping(map) => Box::new(map.iter().map(|(key, node)| FieldEntry {
                key: Some(key.as_str()),
                node,
            })),
        }
    }
}

/// Value of the first entry whose normalized name equals `key`.
///
/// `key` is compared as given, so callers pass it lowercased.
pub fn pick(container: Option<&Value>, key: &str) -> String {
    FieldContainer::from_value(container)
        .and_then(|c| c.entries().find(|entry| entry.name() == key))
        .map(|entry| entry.value())
        .unwrap_or_default()
}

/// Value of the first entry whose name, or failing that whose label, matches
/// `pattern`.
pub fn pick_matching(container: Option<&Value>, pattern: &Regex) -> String {
    FieldContainer::from_value(container)
        .and_then(|c| {
            c.entries().find(|entry| {
                pattern.is_match(&entry.name())
                    || entry.label().is_some_and(|label| pattern.is_match(&label))
            })
        })
        .map(|entry| entry.value())
        .unwrap_or_default()
}

/// First non-empty value of a textarea-typed entry.
///
/// Mapping containers then fall back to the first non-empty value of an
/// entry whose name matches `pattern`; sequences stop after the type scan.
///
/// Message text is the datum most often misnamed across forms, so the
/// declared input type is trusted over the field name.
pub fn pick_textarea_first(container: Option<&Value>, pattern: &Regex) -> String {
    let Some(container) = FieldContainer::from_value(container) else {
        return String::new();
    };

    let textarea = container
        .entries()
        .filter(|entry| entry.looks_like_textarea())
        .map(|entry| entry.value())
        .find(|v| !v.is_empty());

    textarea
        .or_else(|| match container {
            FieldContainer::Mapping(_) => container
                .entries()
                .filter(|entry| pattern.is_match(&entry.name()))
                .map(|entry| entry.value())
                .find(|v| !v.is_empty()),
            FieldContainer::Sequence(_) => None,
        })
        .unwrap_or_default()
}
