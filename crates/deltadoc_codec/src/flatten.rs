//! Nested document to flat path map.

use crate::inflate::{inflate_entries, inflate_subtree};
use crate::path::{covers, join};
use crate::value::Value;
use indexmap::IndexMap;

/// Flat mapping from dotted path to leaf value.
pub type FlatMap = IndexMap<String, Value>;

/// Flattens a document into dotted-path leaves, depth first.
///
/// Scalars and *empty* maps or arrays are recorded as leaves, so a
/// present-but-empty container survives a round trip. A scalar at the root
/// has no path and yields an empty map. Null leaves are kept.
#[must_use]
pub fn flatten(document: &Value) -> FlatMap {
    let mut out = FlatMap::new();
    if document.is_container() && !document.is_empty_container() {
        walk(document, "", &mut out);
    }
    out
}

/// Flattens `value` as if it were stored at `prefix`.
///
/// A leaf or empty container yields the single entry `prefix -> value`.
#[must_use]
pub fn flatten_at(prefix: &str, value: &Value) -> FlatMap {
    let mut out = FlatMap::new();
    walk(value, prefix, &mut out);
    out
}

fn walk(value: &Value, prefix: &str, out: &mut FlatMap) {
    match value {
        Value::Map(fields) if !fields.is_empty() => {
            for (key, child) in fields {
                walk(child, &join(prefix, key), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                walk(child, &join(prefix, &index.to_string()), out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

/// Looks up `path` in a flat map.
///
/// A scalar entry is returned as-is. Otherwise the entries below `path` are
/// inflated into the sub-document they describe, falling back to an exact
/// empty-container entry. Nulls are not filtered.
#[must_use]
pub fn flat_get(flat: &FlatMap, path: &str) -> Option<Value> {
    if path.is_empty() {
        return (!flat.is_empty())
            .then(|| inflate_entries(flat.iter().map(|(k, v)| (k.as_str(), v))));
    }
    let exact = flat.get(path);
    if let Some(value) = exact {
        if !value.is_empty_container() {
            return Some(value.clone());
        }
    }
    let offset = path.len() + 1;
    let below: Vec<(&str, &Value)> = flat
        .iter()
        .filter(|(key, _)| key.len() > path.len() && covers(path, key))
        .map(|(key, value)| (&key[offset..], value))
        .collect();
    if below.is_empty() {
        exact.cloned()
    } else {
        Some(inflate_subtree(below))
    }
}

/// Removes null leaves.
pub fn strip_nulls(flat: &mut FlatMap) {
    flat.retain(|_, value| !value.is_null());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_nested() {
        let doc = Value::from(json!({
            "title": "A",
            "meta": {"keywords": "x", "description": "y"},
            "tags": ["a", "b"],
        }));
        let flat = flatten(&doc);
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["title", "meta.keywords", "meta.description", "tags.0", "tags.1"]
        );
        assert_eq!(flat["tags.1"], Value::from("b"));
    }

    #[test]
    fn empty_containers_are_leaves() {
        let doc = Value::from(json!({"tags": [], "meta": {}}));
        let flat = flatten(&doc);
        assert_eq!(flat["tags"], Value::Array(vec![]));
        assert_eq!(flat["meta"], Value::empty_map());
    }

    #[test]
    fn nulls_are_kept() {
        let flat = flatten(&Value::from(json!({"gone": null})));
        assert_eq!(flat["gone"], Value::Null);
    }

    #[test]
    fn scalar_root_has_no_paths() {
        assert!(flatten(&Value::Int(3)).is_empty());
        assert!(flatten(&Value::empty_map()).is_empty());
    }

    #[test]
    fn flatten_at_prefix() {
        let flat = flatten_at("c.2", &Value::from(json!({"c": "hi", "l": []})));
        assert_eq!(flat["c.2.c"], Value::from("hi"));
        assert_eq!(flat["c.2.l"], Value::Array(vec![]));
        assert_eq!(flatten_at("n", &Value::Int(1))["n"], Value::Int(1));
    }

    #[test]
    fn flat_get_subtree() {
        let flat = flatten(&Value::from(json!({"c": [{"a": 1}, {"a": null}]})));
        assert_eq!(flat_get(&flat, "c.0.a"), Some(Value::Int(1)));
        assert_eq!(
            flat_get(&flat, "c.1"),
            Some(Value::from(json!({"a": null})))
        );
        assert_eq!(
            flat_get(&flat, "c"),
            Some(Value::from(json!([{"a": 1}, {"a": null}])))
        );
        assert_eq!(flat_get(&flat, "missing"), None);
        assert_eq!(flat_get(&flat, "c.0.ab"), None);
    }

    #[test]
    fn flat_get_prefers_children_over_empty_container() {
        let mut flat = FlatMap::new();
        flat.insert("tags".into(), Value::Array(vec![]));
        assert_eq!(flat_get(&flat, "tags"), Some(Value::Array(vec![])));
        flat.insert("tags.0".into(), Value::from("a"));
        assert_eq!(flat_get(&flat, "tags"), Some(Value::from(json!(["a"]))));
    }
}
