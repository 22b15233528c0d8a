//! In-memory store backend.
//!
//! Used as the test double for engine suites and as a preview backend.
//! Enforces declared uniqueness constraints with SQL semantics (a NULL
//! in a unique tuple never conflicts) so the engine's isolation
//! boundary can be exercised without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::row::Row;
use crate::statement::{Predicate, SelectQuery, Statement};
use crate::traits::Store;
use crate::value::Value;

#[derive(Debug, Default)]
struct TableData {
    columns: Vec<String>,
    rows: Vec<Row>,
    unique_keys: Vec<Vec<String>>,
}

impl TableData {
    fn unique_tuple(row: &Row, key: &[String]) -> Vec<Value> {
        key.iter()
            .map(|f| row.get(f).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Check a candidate row against every declared unique key;
    /// `others` is the would-be final table state excluding the
    /// candidate itself.
    fn check_unique<'a>(
        &self,
        candidate: &Row,
        others: impl Iterator<Item = &'a Row> + Clone,
    ) -> StoreResult<()> {
        for key in &self.unique_keys {
            let tuple = Self::unique_tuple(candidate, key);
            if tuple.iter().any(Value::is_null) {
                continue;
            }
            for other in others.clone() {
                if Self::unique_tuple(other, key) == tuple {
                    return Err(StoreError::constraint_violation(format!(
                        "duplicate key value violates unique constraint on ({})",
                        key.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }
}

fn matches(row: &Row, predicates: &[Predicate]) -> StoreResult<bool> {
    for predicate in predicates {
        match predicate {
            Predicate::Eq { field, value } => {
                let current = row.get(field).cloned().unwrap_or(Value::Null);
                if current != *value {
                    return Ok(false);
                }
            }
            Predicate::IsNull { field } => {
                if !row.get(field).map_or(true, Value::is_null) {
                    return Ok(false);
                }
            }
            Predicate::Raw(clause) => {
                return Err(StoreError::UnsupportedFilter {
                    detail: format!("memory store cannot evaluate raw clause: {clause}"),
                });
            }
        }
    }
    Ok(true)
}

/// In-memory [`Store`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, TableData>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with an ordered column list.
    pub async fn create_table(&self, table: impl Into<String>, columns: &[&str]) {
        let mut tables = self.tables.write().await;
        tables.insert(
            table.into(),
            TableData {
                columns: columns.iter().map(|c| (*c).to_string()).collect(),
                rows: Vec::new(),
                unique_keys: Vec::new(),
            },
        );
    }

    /// Declare a uniqueness constraint over a set of fields.
    pub async fn add_unique_key(&self, table: &str, fields: &[&str]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: table.to_string(),
            })?;
        data.unique_keys
            .push(fields.iter().map(|f| (*f).to_string()).collect());
        Ok(())
    }

    /// Current rows of a table, for test assertions.
    pub async fn rows(&self, table: &str) -> StoreResult<Vec<Row>> {
        let tables = self.tables.read().await;
        let data = tables.get(table).ok_or_else(|| StoreError::TableNotFound {
            table: table.to_string(),
        })?;
        Ok(data.rows.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_rows(&self, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        if let Some(filter) = &query.filter {
            return Err(StoreError::UnsupportedFilter {
                detail: format!("memory store cannot evaluate raw clause: {filter}"),
            });
        }
        let tables = self.tables.read().await;
        let data = tables
            .get(&query.table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: query.table.clone(),
            })?;
        Ok(data.rows.clone())
    }

    async fn field_names(&self, table: &str) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        let data = tables.get(table).ok_or_else(|| StoreError::TableNotFound {
            table: table.to_string(),
        })?;
        Ok(data.columns.clone())
    }

    async fn execute(&self, statement: &Statement) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let data = tables
            .get_mut(statement.table())
            .ok_or_else(|| StoreError::TableNotFound {
                table: statement.table().to_string(),
            })?;

        match statement {
            Statement::Update(update) => {
                let mut matched = Vec::new();
                for (i, row) in data.rows.iter().enumerate() {
                    if matches(row, &update.predicates)? {
                        matched.push(i);
                    }
                }

                // Simulate the final state before applying anything so
                // the whole statement fails atomically on a conflict.
                let mut final_rows = data.rows.clone();
                for &i in &matched {
                    for (field, value) in &update.assignments {
                        final_rows[i].set(field.clone(), value.clone());
                    }
                }
                for &i in &matched {
                    let others: Vec<&Row> = final_rows
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, r)| r)
                        .collect();
                    data.check_unique(&final_rows[i], others.into_iter())?;
                }

                data.rows = final_rows;
                debug!(table = %update.table, affected = matched.len(), "memory update applied");
                Ok(matched.len() as u64)
            }
            Statement::Delete(delete) => {
                let before = data.rows.len();
                let mut kept = Vec::with_capacity(before);
                for row in data.rows.drain(..) {
                    if matches(&row, &delete.predicates)? {
                        continue;
                    }
                    kept.push(row);
                }
                data.rows = kept;
                let removed = before - data.rows.len();
                debug!(table = %delete.table, affected = removed, "memory delete applied");
                Ok(removed as u64)
            }
        }
    }

    async fn insert_row(&self, table: &str, row: &Row) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let data = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: table.to_string(),
            })?;
        data.check_unique(row, data.rows.iter())?;
        data.rows.push(row.clone());
        Ok(())
    }
}
