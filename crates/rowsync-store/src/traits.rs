//! The store capability trait.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::row::Row;
use crate::statement::{SelectQuery, Statement};

/// Capability interface the reconciliation engine requires from a
/// backing table store.
///
/// Implementations must surface uniqueness conflicts from `execute`
/// and `insert_row` as [`crate::StoreError::ConstraintViolation`] and
/// propagate every other failure unchanged. Cancellation, timeouts,
/// and retries are the backend's concern; the engine performs none of
/// its own.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch all rows for a read query, preserving a stable
    /// field-to-value mapping per row.
    async fn fetch_rows(&self, query: &SelectQuery) -> StoreResult<Vec<Row>>;

    /// The full ordered field list of the table's schema.
    async fn field_names(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Execute a mutating statement, returning the affected row count.
    async fn execute(&self, statement: &Statement) -> StoreResult<u64>;

    /// Insert one row into a table.
    async fn insert_row(&self, table: &str, row: &Row) -> StoreResult<()>;
}
