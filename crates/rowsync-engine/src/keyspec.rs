//! Key specifications and normalization.

use serde::{Deserialize, Serialize};

/// A matching key: a single field or an ordered composite of fields.
///
/// Callers may mix scalar and composite keys in one list; normalization
/// turns everything into field tuples. Serializes as a bare string or
/// a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    /// A single-field key.
    Field(String),
    /// An ordered composite key.
    Composite(Vec<String>),
}

impl From<&str> for KeySpec {
    fn from(field: &str) -> Self {
        KeySpec::Field(field.to_string())
    }
}

impl From<String> for KeySpec {
    fn from(field: String) -> Self {
        KeySpec::Field(field)
    }
}

impl From<Vec<String>> for KeySpec {
    fn from(fields: Vec<String>) -> Self {
        KeySpec::Composite(fields)
    }
}

impl From<&[&str]> for KeySpec {
    fn from(fields: &[&str]) -> Self {
        KeySpec::Composite(fields.iter().map(|f| (*f).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeySpec {
    fn from(fields: [&str; N]) -> Self {
        KeySpec::Composite(fields.iter().map(|f| (*f).to_string()).collect())
    }
}

/// Normalize a key list into field tuples: a scalar key becomes a
/// one-element tuple. Never fails.
#[must_use]
pub fn normalize_keys(keys: &[KeySpec]) -> Vec<Vec<String>> {
    keys.iter()
        .map(|key| match key {
            KeySpec::Field(field) => vec![field.clone()],
            KeySpec::Composite(fields) => fields.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_becomes_one_tuple() {
        let keys = vec![KeySpec::from("id")];
        assert_eq!(normalize_keys(&keys), vec![vec!["id".to_string()]]);
    }

    #[test]
    fn test_mixed_scalar_and_composite() {
        let keys = vec![KeySpec::from("id"), KeySpec::from(["org", "email"])];
        assert_eq!(
            normalize_keys(&keys),
            vec![
                vec!["id".to_string()],
                vec!["org".to_string(), "email".to_string()],
            ]
        );
    }

    #[test]
    fn test_declaration_order_preserved() {
        let keys = vec![KeySpec::from("b"), KeySpec::from("a")];
        let normalized = normalize_keys(&keys);
        assert_eq!(normalized[0], vec!["b".to_string()]);
        assert_eq!(normalized[1], vec!["a".to_string()]);
    }

    #[test]
    fn test_serde_round_trips_bare_string_and_list() {
        let keys: Vec<KeySpec> = serde_json::from_str(r#"["id", ["tenant", "role"]]"#).unwrap();
        assert_eq!(
            keys,
            vec![KeySpec::from("id"), KeySpec::from(["tenant", "role"])]
        );
        let json = serde_json::to_string(&keys).unwrap();
        assert_eq!(json, r#"["id",["tenant","role"]]"#);
    }
}
