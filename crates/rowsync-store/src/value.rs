//! Typed, nullable scalar values.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single field value as stored in (or destined for) a table.
///
/// Values are hashable so key tuples can index the snapshot multi-map;
/// floats hash by bit pattern and compare by total order, which keeps
/// `Eq` and `Hash` consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// A boolean value.
    Boolean(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A text value.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl Value {
    /// Check if this is SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Stable lowercase name of the value's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
        }
    }

    /// Check if two values carry the same type.
    #[must_use]
    pub fn same_type(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Get as text if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer if this is an integer value.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a boolean if this is a boolean value.
    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a float if this is a float value.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b) == Ordering::Equal,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Binary(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
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

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from("a").type_name(), "text");
        assert_eq!(Value::from(5i64).type_name(), "integer");
        assert_eq!(Value::from(1.5).type_name(), "float");
        assert_eq!(Value::from(true).type_name(), "boolean");
        assert_eq!(Value::from(vec![1u8]).type_name(), "binary");
    }

    #[test]
    fn test_same_type_distinguishes_text_and_integer() {
        let text = Value::from("5");
        let int = Value::from(5i64);
        assert!(!text.same_type(&int));
        assert!(text.same_type(&Value::from("other")));
    }

    #[test]
    fn test_null_never_equals_typed_values() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::from(0i64));
        assert_ne!(Value::Null, Value::from(""));
        assert_ne!(Value::Null, Value::from(false));
    }

    #[test]
    fn test_float_equality_and_hash_are_consistent() {
        let mut map: HashMap<Value, u32> = HashMap::new();
        map.insert(Value::from(1.5), 1);
        assert_eq!(map.get(&Value::from(1.5)), Some(&1));

        // NaN equals itself under total order, so it can live in a map.
        map.insert(Value::Float(f64::NAN), 2);
        assert_eq!(map.get(&Value::Float(f64::NAN)), Some(&2));
    }

    #[test]
    fn test_tuple_keys_in_map() {
        let mut map: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        map.insert(vec![Value::from(1i64), Value::Null], vec![0]);
        assert_eq!(
            map.get(&vec![Value::from(1i64), Value::Null]),
            Some(&vec![0])
        );
        assert!(map.get(&vec![Value::from(2i64), Value::Null]).is_none());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3i64)), Value::Integer(3));
    }

    #[test]
    fn test_serde_roundtrip() {
        let values = vec![
            Value::Null,
            Value::from(true),
            Value::from(42i64),
            Value::from(2.25),
            Value::from("hello"),
        ];
        let json = serde_json::to_string(&values).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }
}
