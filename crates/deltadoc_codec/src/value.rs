//! Dynamic document value type.

use crate::id::{DocumentId, DocumentRef, Timestamp};
use indexmap::IndexMap;
use std::fmt;

/// An ordered map of field name to value.
pub type Map = IndexMap<String, Value>;

/// A node in a semi-structured document.
///
/// Maps keep insertion order so that a document flattened and inflated
/// again comes back with its fields in the same order. Numbers are split
/// into integers and floats; arithmetic between the two widens to float.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value. Inside a change set it marks a path for removal.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Point in time.
    Timestamp(Timestamp),
    /// Document identifier.
    Id(DocumentId),
    /// Opaque binary data.
    Binary(Vec<u8>),
    /// Reference to a document in another collection.
    Ref(DocumentRef),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Ordered map.
    Map(Map),
}

/// Closed set of scalar kinds used for type checks in validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Text.
    String,
    /// Integer or float.
    Number,
    /// Boolean.
    Bool,
    /// Timestamp.
    Timestamp,
    /// Reference into another collection.
    ExternalRef,
    /// Binary data.
    Binary,
    /// Document identifier.
    Id,
    /// Null.
    Null,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Bool => "boolean",
            ScalarKind::Timestamp => "date",
            ScalarKind::ExternalRef => "reference",
            ScalarKind::Binary => "binary",
            ScalarKind::Id => "id",
            ScalarKind::Null => "null",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Creates an empty map value.
    #[must_use]
    pub fn empty_map() -> Self {
        Value::Map(Map::new())
    }

    /// Creates a map value from key/value pairs, keeping their order.
    pub fn map<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the scalar kind, or `None` for maps and arrays.
    #[must_use]
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Value::Null => Some(ScalarKind::Null),
            Value::Bool(_) => Some(ScalarKind::Bool),
            Value::Int(_) | Value::Float(_) => Some(ScalarKind::Number),
            Value::Text(_) => Some(ScalarKind::String),
            Value::Timestamp(_) => Some(ScalarKind::Timestamp),
            Value::Id(_) => Some(ScalarKind::Id),
            Value::Binary(_) => Some(ScalarKind::Binary),
            Value::Ref(_) => Some(ScalarKind::ExternalRef),
            Value::Array(_) | Value::Map(_) => None,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an integer or a float.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Check if this value is a map or an array.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Map(_))
    }

    /// Check if this value is a map or array with no children.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Value::Array(items) => items.is_empty(),
            Value::Map(fields) => fields.is_empty(),
            _ => false,
        }
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a slice of values, if it is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get this value as a mutable vector, if it is an array.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Get this value as a mutable map, if it is one.
    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Get a direct child of a map by field name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|fields| fields.get(key))
    }

    /// Numeric addition. Integers stay integers unless the sum overflows.
    ///
    /// Returns `None` when either side is not numeric.
    #[must_use]
    pub fn add(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(
                a.checked_add(*b)
                    .map_or_else(|| Value::Float(*a as f64 + *b as f64), Value::Int),
            ),
            _ => Some(Value::Float(self.as_f64()? + other.as_f64()?)),
        }
    }

    /// Numeric subtraction, following the same widening rules as [`Value::add`].
    #[must_use]
    pub fn sub(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(
                a.checked_sub(*b)
                    .map_or_else(|| Value::Float(*a as f64 - *b as f64), Value::Int),
            ),
            _ => Some(Value::Float(self.as_f64()? - other.as_f64()?)),
        }
    }

    /// True for numeric zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(n) => *n == 0,
            Value::Float(n) => *n == 0.0,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::Id(id)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<DocumentRef> for Value {
    fn from(r: DocumentRef) -> Self {
        Value::Ref(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(fields: Map) -> Self {
        Value::Map(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Value::Map(fields.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Value::from("a").kind(), Some(ScalarKind::String));
        assert_eq!(Value::Float(1.5).kind(), Some(ScalarKind::Number));
        assert_eq!(Value::Int(1).kind(), Some(ScalarKind::Number));
        assert_eq!(Value::Id(DocumentId::new()).kind(), Some(ScalarKind::Id));
        assert_eq!(Value::empty_map().kind(), None);
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        assert_eq!(Value::Int(9).sub(&Value::Int(4)), Some(Value::Int(5)));
        assert_eq!(Value::Int(4).add(&Value::Int(5)), Some(Value::Int(9)));
    }

    #[test]
    fn mixed_arithmetic_widens() {
        assert_eq!(Value::Int(1).add(&Value::Float(0.5)), Some(Value::Float(1.5)));
    }

    #[test]
    fn overflow_widens() {
        let sum = Value::Int(i64::MAX).add(&Value::Int(1));
        assert!(matches!(sum, Some(Value::Float(_))));
    }

    #[test]
    fn non_numeric_arithmetic_is_none() {
        assert_eq!(Value::from("a").add(&Value::Int(1)), None);
        assert_eq!(Value::Int(1).sub(&Value::Null), None);
    }

    #[test]
    fn empty_containers() {
        assert!(Value::Array(vec![]).is_empty_container());
        assert!(Value::empty_map().is_empty_container());
        assert!(!Value::Array(vec![Value::Null]).is_empty_container());
        assert!(!Value::from("").is_empty_container());
    }

    #[test]
    fn from_json_keeps_field_order() {
        let value = Value::from(serde_json::json!({"z": 1, "a": [true, 2.5], "m": null}));
        let keys: Vec<&str> = value.as_map().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(
            value.get("a"),
            Some(&Value::Array(vec![Value::Bool(true), Value::Float(2.5)]))
        );
        assert_eq!(value.get("m"), Some(&Value::Null));
    }
}
