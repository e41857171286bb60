//! Recursive normalization of persisted JSON documents.
//!
//! Layout and schema documents embed some sub-documents as JSON re-encoded into
//! string form. [`expand`] materializes every such layer so the tree can be
//! edited structurally; [`collapse_path`] re-encodes a sub-document at one
//! known location before the document is written back. [`prune_nulls`] removes
//! object keys whose value is `null` and runs once over a merged document
//! before it is serialized.

use serde_json::{Map, Value};

/// Recursively replace every string that parses as JSON with its parsed,
/// expanded form.
///
/// Strings that are not valid JSON are kept as they are. A string holding a
/// bare scalar is expanded too, so `"123"` becomes the number `123`.
pub fn expand(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(v) => Value::Bool(v),
        Value::Number(v) => Value::Number(v),
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed) => expand(parsed),
            Err(_) => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(expand).collect()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key, expand(child));
            }
            Value::Object(out)
        }
    }
}

/// Remove every object key whose value is `null`, at any depth.
///
/// Children are pruned before keys at the current level are examined. Array
/// elements are never removed, only object keys.
pub fn prune_nulls(value: &mut Value) {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                prune_nulls(item);
            }
        }
        Value::Object(map) => {
            for child in map.values_mut() {
                prune_nulls(child);
            }
            map.retain(|_, child| !child.is_null());
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

/// One step of a path into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocPath {
    /// Descend into the named key of an object.
    Key(&'static str),
    /// Descend into every element of an array.
    Each,
}

/// Re-encode the value(s) found at `path` as compact JSON strings.
///
/// Missing keys, `null` values and values that are already strings are left
/// alone. When `prune` is set each sub-document is null-pruned before it is
/// stringified. Returns how many values were collapsed.
pub fn collapse_path(root: &mut Value, path: &[DocPath], prune: bool) -> usize {
    match path.split_first() {
        None => collapse_here(root, prune),
        Some((DocPath::Key(key), rest)) => match root {
            Value::Object(map) => match map.get_mut(*key) {
                Some(child) => collapse_path(child, rest, prune),
                None => 0,
            },
            _ => 0,
        },
        Some((DocPath::Each, rest)) => match root {
            Value::Array(items) => items
                .iter_mut()
                .map(|item| collapse_path(item, rest, prune))
                .sum(),
            _ => 0,
        },
    }
}

fn collapse_here(value: &mut Value, prune: bool) -> usize {
    match value {
        Value::Null | Value::String(_) => 0,
        _ => {
            let mut inner = value.take();
            if prune {
                prune_nulls(&mut inner);
            }
            // Serializing a `Value` cannot fail: every map key is a string.
            let text = serde_json::to_string(&inner).unwrap_or_default();
            *value = Value::String(text);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expand_keeps_plain_text() {
        assert_eq!(expand(json!("hello")), json!("hello"));
    }

    #[test]
    fn expand_turns_numeric_text_into_number() {
        assert_eq!(expand(json!("123")), json!(123));
    }

    #[test]
    fn expand_parses_embedded_object() {
        assert_eq!(expand(json!("{\"a\":1}")), json!({"a": 1}));
    }

    #[test]
    fn expand_recurses_through_nested_layers() {
        let inner = serde_json::to_string(&json!({"b": "{\"c\":\"true\"}"})).expect("serialize");
        let input = json!({
            "config": inner,
            "list": ["[1,2]", "plain", null],
            "flag": false
        });
        let out = expand(input);
        assert_eq!(
            out,
            json!({
                "config": {"b": {"c": true}},
                "list": [[1, 2], "plain", null],
                "flag": false
            })
        );
    }

    #[test]
    fn expand_preserves_key_order() {
        let out = expand(json!({"z": "1", "a": "2", "m": "x"}));
        let keys: Vec<&str> = out
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn prune_removes_null_keys_at_every_depth() {
        let mut doc = json!({
            "a": null,
            "b": {"c": null, "d": 1, "e": {"f": null}},
            "g": [null, {"h": null, "i": "x"}]
        });
        prune_nulls(&mut doc);
        assert_eq!(
            doc,
            json!({
                "b": {"d": 1, "e": {}},
                "g": [null, {"i": "x"}]
            })
        );
    }

    #[test]
    fn prune_is_idempotent() {
        let mut doc = json!({"a": null, "b": [{"c": null}], "d": {"e": 0}});
        prune_nulls(&mut doc);
        let once = doc.clone();
        prune_nulls(&mut doc);
        assert_eq!(doc, once);
    }

    #[test]
    fn collapse_path_reencodes_only_matching_locations() {
        let mut doc = json!({
            "sections": [
                {"config": {"a": 1, "b": null}, "other": {"x": 1}},
                {"config": "{\"already\":true}"},
                {"name": "no config"}
            ]
        });
        let count = collapse_path(
            &mut doc,
            &[DocPath::Key("sections"), DocPath::Each, DocPath::Key("config")],
            true,
        );
        assert_eq!(count, 1);
        assert_eq!(doc["sections"][0]["config"], json!("{\"a\":1}"));
        assert_eq!(doc["sections"][0]["other"], json!({"x": 1}));
        assert_eq!(doc["sections"][1]["config"], json!("{\"already\":true}"));
    }

    #[test]
    fn collapse_then_expand_restores_structure() {
        let original = json!({"filters": [{"name": "f", "type": "Categorical"}]});
        let mut doc = original.clone();
        collapse_path(&mut doc, &[DocPath::Key("filters")], false);
        assert!(doc["filters"].is_string());
        assert_eq!(expand(doc), original);
    }
}
