//! Ordered, presence-aware row representation.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::value::Value;

/// An ordered mapping from field name to [`Value`].
///
/// Field order is the insertion order and is preserved through serde,
/// so rendered statements are deterministic. A field being absent is
/// distinct from it being present with [`Value::Null`]; the engine's
/// overwrite-null and skip-null policies rely on that distinction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Set a field value, replacing any existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Set a field using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Get a field value. Returns `None` when the field is absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Check if a field is present (even as `Null`).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Remove a field, returning its value if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.set(name, value);
        }
        row
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut row = Row::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    row.set(name, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_vs_null() {
        let row = Row::new().with("email", Value::Null).with("name", "a");
        assert!(row.has("email"));
        assert_eq!(row.get("email"), Some(&Value::Null));
        assert!(!row.has("phone"));
        assert_eq!(row.get("phone"), None);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut row = Row::new().with("id", 1i64).with("name", "a");
        row.set("id", 2i64);
        assert_eq!(row.get("id"), Some(&Value::Integer(2)));
        // Order is unchanged by replacement.
        let names: Vec<&str> = row.field_names().collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let row = Row::new().with("b", 1i64).with("a", 2i64).with("c", 3i64);
        let names: Vec<&str> = row.field_names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove() {
        let mut row = Row::new().with("id", 1i64).with("name", "a");
        assert_eq!(row.remove("name"), Some(Value::Text("a".to_string())));
        assert!(!row.has("name"));
        assert_eq!(row.remove("name"), None);
    }

    #[test]
    fn test_serde_roundtrip_keeps_order() {
        let row = Row::new()
            .with("id", 1i64)
            .with("name", "a")
            .with("email", Value::Null);
        let json = serde_json::to_string(&row).unwrap();
        let parsed: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, row);
        let names: Vec<&str> = parsed.field_names().collect();
        assert_eq!(names, vec!["id", "name", "email"]);
    }
}
