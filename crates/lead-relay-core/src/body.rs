//! Inbound body decoding.
//!
//! Sites post either JSON or URL-encoded forms. Both decode to a
//! [`serde_json::Value`] object so the normalizer sees one representation.
//!
//! URL-encoded keys use PHP-style bracket notation, which Elementor relies on
//! to post nested fields:
//!
//! | Encoded pair                 | Decoded                                  |
//! |------------------------------|------------------------------------------|
//! | `fields[name][value]=Jane`   | `{"fields": {"name": {"value": "Jane"}}}`|
//! | `tags[]=a&tags[]=b`          | `{"tags": ["a", "b"]}`                   |
//! | `fields[0][id]=name`         | `{"fields": [{"id": "name"}]}`           |
//! | `fields[1][id]=name`         | `{"fields": [{"id": "name"}]}`           |
//! | `x=1&x=2`                    | `{"x": ["1", "2"]}`                      |

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Largest bracket index compacted into an array; objects with a larger
/// index keep their numeric keys.
const MAX_ARRAY_INDEX: usize = 20;

#[cfg(test)]
#[path = "body_tests.rs"]
mod tests;

/// Decode a request body according to its `Content-Type`.
///
/// Always returns an object. Unparseable JSON, JSON that is not an object,
/// and unsupported or missing content types all yield an empty object, so
/// the caller can normalize without a failure path.
pub fn decode_submission(content_type: Option<&str>, body: &[u8]) -> Value {
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if media_type == "application/json" || media_type.ends_with("+json") {
        decode_json(body)
    } else if media_type == "application/x-www-form-urlencoded" {
        decode_form(body)
    } else {
        debug!(content_type = %media_type, "Unsupported content type; treating body as empty");
        Value::Object(Map::new())
    }
}

fn decode_json(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Object(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!(kind = %json_kind(&other), "JSON body is not an object; treating as empty");
            Value::Object(Map::new())
        }
        Err(e) => {
            warn!(error = %e, "Malformed JSON body; treating as empty");
            Value::Object(Map::new())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode `application/x-www-form-urlencoded` with bracket-notation nesting.
pub fn decode_form(body: &[u8]) -> Value {
    let mut root = Value::Object(Map::new());

    for (key, value) in url::form_urlencoded::parse(body) {
        if key.is_empty() {
            continue;
        }
        let path = parse_key_path(&key);
        assign(&mut root, &path, value.into_owned());
    }

    compact_indexed_objects(root)
}

/// One step of a bracketed key path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),

    /// `[]`: append to a list.
    Append,
}

/// Split `a[b][]` into `[Key("a"), Key("b"), Append]`.
///
/// Keys that are not well-formed bracket paths are taken literally.
fn parse_key_path(key: &str) -> Vec<Segment> {
    let literal = || vec![Segment::Key(key.to_string())];

    let Some(open) = key.find('[') else {
        return literal();
    };
    if open == 0 {
        return literal();
    }

    let mut segments = vec![Segment::Key(key[..open].to_string())];
    let mut rest = &key[open..];

    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return literal();
        };
        let Some(close) = inner.find(']') else {
            return literal();
        };

        let name = &inner[..close];
        segments.push(if name.is_empty() {
            Segment::Append
        } else {
            Segment::Key(name.to_string())
        });
        rest = &inner[close + 1..];
    }

    segments
}

fn assign(slot: &mut Value, path: &[Segment], value: String) {
    let Some((head, rest)) = path.split_first() else {
        merge_leaf(slot, value);
        return;
    };

    match head {
        Segment::Key(key) => {
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(map) = slot {
                let child = map.entry(key.clone()).or_insert(Value::Null);
                assign(child, rest, value);
            }
        }
        Segment::Append => {
            let mut child = Value::Null;
            assign(&mut child, rest, value);

            match slot {
                Value::Array(items) => items.push(child),
                Value::Object(map) => {
                    let index = map.len().to_string();
                    map.insert(index, child);
                }
                Value::Null => *slot = Value::Array(vec![child]),
                scalar => {
                    let previous = std::mem::take(scalar);
                    *scalar = Value::Array(vec![previous, child]);
                }
            }
        }
    }
}

/// Store a scalar, turning repeated keys into a list.
fn merge_leaf(slot: &mut Value, value: String) {
    match slot {
        Value::Null => *slot = Value::String(value),
        Value::Array(items) => items.push(Value::String(value)),
        // A nested structure already lives here; the flat value loses.
        Value::Object(_) => {}
        scalar => {
            let previous = std::mem::take(scalar);
            *scalar = Value::Array(vec![previous, Value::String(value)]);
        }
    }
}

/// Turn objects keyed only by indices up to [`MAX_ARRAY_INDEX`] into arrays
/// ordered by index, recursively. Gaps are closed: `{"1": a, "4": b}` becomes
/// `[a, b]`.
fn compact_indexed_objects(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, compact_indexed_objects(v)))
                .collect();

            if is_index_sequence(&map) {
                let mut items: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                    .collect();
                items.sort_by_key(|(i, _)| *i);
                Value::Array(items.into_iter().map(|(_, v)| v).collect())
            } else {
                Value::Object(map)
            }
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(compact_indexed_objects).collect())
        }
        other => other,
    }
}

fn is_index_sequence(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.keys().all(|key| {
            // Reject "01" and "+1", which parse but are not canonical indices.
            matches!(key.parse::<usize>(), Ok(i) if i <= MAX_ARRAY_INDEX && i.to_string() == *key)
        })
}
