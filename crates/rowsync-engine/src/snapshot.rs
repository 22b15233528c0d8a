//! Current-state snapshot and key-tuple index.

use std::collections::HashMap;

use rowsync_store::{Row, SelectQuery, Store, Value};
use tracing::debug;

use crate::error::ReconcileResult;
use crate::options::KeyMaps;

/// One read of the current table state, indexed by key tuple.
///
/// The index is shared across all keys: a tuple built under any key
/// resolves to the same positions regardless of which key produced it.
/// Rows are never mutated after the snapshot is taken; diffs always run
/// against the values read here.
#[derive(Debug)]
pub struct Snapshot {
    rows: Vec<Row>,
    index: HashMap<Vec<Value>, Vec<usize>>,
}

impl Snapshot {
    /// Read the current rows and build the shared key-tuple index.
    pub async fn load(
        store: &dyn Store,
        table: &str,
        where_clause: Option<&str>,
        keys: &[Vec<String>],
        key_maps: &KeyMaps,
    ) -> ReconcileResult<Self> {
        let mut query = SelectQuery::new(table);
        if let Some(clause) = where_clause {
            query = query.with_filter(clause);
        }
        let rows = store.fetch_rows(&query).await?;
        debug!(table, row_count = rows.len(), "loaded snapshot");

        let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for (position, row) in rows.iter().enumerate() {
            for key in keys {
                let tuple = key_tuple(row, key);
                for alias in alias_tuples(&tuple, key, key_maps) {
                    index.entry(alias).or_default().push(position);
                }
                index.entry(tuple).or_default().push(position);
            }
        }
        Ok(Self { rows, index })
    }

    /// Positions of current rows registered under `tuple`, if any.
    pub fn lookup(&self, tuple: &[Value]) -> Option<&[usize]> {
        self.index.get(tuple).map(Vec::as_slice)
    }

    /// The snapshot rows, in read order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the key tuple for `row` under `key`. Fields the row does not
/// carry contribute null.
pub(crate) fn key_tuple(row: &Row, key: &[String]) -> Vec<Value> {
    key.iter()
        .map(|field| row.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Alias tuples for `tuple` under `key`. Each mapped field is expanded
/// independently from the literal tuple at its first occurrence in the
/// key; aliases do not compose across fields.
fn alias_tuples(tuple: &[Value], key: &[String], key_maps: &KeyMaps) -> Vec<Vec<Value>> {
    let mut aliases = Vec::new();
    for (field, map) in key_maps {
        let Some(position) = key.iter().position(|k| k == field) else {
            continue;
        };
        let Some(targets) = map.get(&tuple[position]) else {
            continue;
        };
        for target in targets {
            let mut alias = tuple.to_vec();
            alias[position] = target.clone();
            aliases.push(alias);
        }
    }
    aliases
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsync_store::{MemoryStore, Store};

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(f, v)| ((*f).to_string(), v.clone()))
            .collect()
    }

    async fn store_with(rows: Vec<Row>) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("items", &["id", "code", "name"]).await;
        for r in rows {
            store.insert_row("items", &r).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_index_shared_across_keys() {
        let store = store_with(vec![row(&[
            ("id", Value::from(1i64)),
            ("code", Value::from("x")),
            ("name", Value::from("one")),
        ])])
        .await;
        let keys = vec![vec!["id".to_string()], vec!["code".to_string()]];
        let snapshot = Snapshot::load(&store, "items", None, &keys, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(snapshot.lookup(&[Value::from(1i64)]), Some(&[0][..]));
        assert_eq!(snapshot.lookup(&[Value::from("x")]), Some(&[0][..]));
    }

    #[tokio::test]
    async fn test_absent_key_field_indexes_as_null() {
        let store = store_with(vec![row(&[("id", Value::from(1i64))])]).await;
        let keys = vec![vec!["code".to_string()]];
        let snapshot = Snapshot::load(&store, "items", None, &keys, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(snapshot.lookup(&[Value::Null]), Some(&[0][..]));
    }

    #[tokio::test]
    async fn test_key_map_registers_alias_tuples() {
        let store = store_with(vec![row(&[
            ("id", Value::from(1i64)),
            ("code", Value::from("CA")),
        ])])
        .await;
        let keys = vec![vec!["code".to_string()]];
        let mut key_maps: KeyMaps = HashMap::new();
        key_maps.entry("code".to_string()).or_default().insert(
            Value::from("CA"),
            vec![Value::from("California"), Value::from("Calif.")],
        );
        let snapshot = Snapshot::load(&store, "items", None, &keys, &key_maps)
            .await
            .unwrap();

        assert_eq!(snapshot.lookup(&[Value::from("CA")]), Some(&[0][..]));
        assert_eq!(
            snapshot.lookup(&[Value::from("California")]),
            Some(&[0][..])
        );
        assert_eq!(snapshot.lookup(&[Value::from("Calif.")]), Some(&[0][..]));
    }

    #[tokio::test]
    async fn test_key_map_field_absent_from_key_is_ignored() {
        let store = store_with(vec![row(&[
            ("id", Value::from(1i64)),
            ("code", Value::from("CA")),
        ])])
        .await;
        let keys = vec![vec!["id".to_string()]];
        let mut key_maps: KeyMaps = HashMap::new();
        key_maps
            .entry("code".to_string())
            .or_default()
            .insert(Value::from("CA"), vec![Value::from("California")]);
        let snapshot = Snapshot::load(&store, "items", None, &keys, &key_maps)
            .await
            .unwrap();

        assert!(snapshot.lookup(&[Value::from("California")]).is_none());
        assert_eq!(snapshot.lookup(&[Value::from(1i64)]), Some(&[0][..]));
    }
}
