// fields.rs — Tolerant field lookup for policy documents.
//
// Documents may use canonical or abbreviated key names ("term_id" / "id").
// A key counts as present only when it holds a non-empty string.

use serde_json::{Map, Value};

/// Return the first non-empty string found under any of `keys`, in order.
pub(crate) fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Read an object-valued key, defaulting to an empty map.
pub(crate) fn object_or_empty(obj: &Map<String, Value>, key: &str) -> Map<String, Value> {
    obj.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
