//! [`Store`] implementation over a `PostgreSQL` connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use rowsync_store::{
    insert_sql, Row, SelectQuery, Statement, Store, StoreError, StoreResult, Value,
};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row as _};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;

/// A [`Store`] backed by a `PostgreSQL` database.
///
/// The connection pool is created lazily on first use and reused for
/// the lifetime of the store.
pub struct PostgresStore {
    config: PostgresConfig,
    pool: Arc<RwLock<Option<PgPool>>>,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("config", &self.config.redacted())
            .finish()
    }
}

impl PostgresStore {
    /// Create a store with the given configuration.
    pub fn new(config: PostgresConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the connection pool, creating it if necessary.
    async fn get_pool(&self) -> StoreResult<PgPool> {
        {
            let guard = self.pool.read().await;
            if let Some(ref pool) = *guard {
                return Ok(pool.clone());
            }
        }

        let pool = self.create_pool().await?;

        {
            let mut guard = self.pool.write().await;
            *guard = Some(pool.clone());
        }
        Ok(pool)
    }

    async fn create_pool(&self) -> StoreResult<PgPool> {
        debug!(host = %self.config.host, database = %self.config.database, "creating connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(self.config.pool_size)
            .acquire_timeout(std::time::Duration::from_secs(
                self.config.connection_timeout_secs,
            ))
            .connect(&self.config.connection_url())
            .await
            .map_err(|e| {
                StoreError::backend_with_source(
                    format!(
                        "failed to connect to {}:{}",
                        self.config.host,
                        self.config.effective_port()
                    ),
                    e,
                )
            })?;
        info!(host = %self.config.host, database = %self.config.database, "connection pool established");
        Ok(pool)
    }
}

/// Bind every argument to a query in order. Values bind with their
/// native type; nulls bind as a null text parameter.
fn bind_values<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    args: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for value in args {
        query = match value {
            Value::Null => query.bind(Option::<String>::None),
            Value::Boolean(b) => query.bind(*b),
            Value::Integer(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Binary(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Convert a database row, probing column types in decreasing order of
/// likelihood. Columns of an unsupported type are left out of the row.
fn row_from_pg(pg_row: &PgRow) -> Row {
    let mut row = Row::new();
    for column in pg_row.columns() {
        let name = column.name();
        if let Ok(v) = pg_row.try_get::<Option<String>, _>(name) {
            row.set(name, v.map_or(Value::Null, Value::from));
        } else if let Ok(v) = pg_row.try_get::<Option<i64>, _>(name) {
            row.set(name, v.map_or(Value::Null, Value::from));
        } else if let Ok(v) = pg_row.try_get::<Option<i32>, _>(name) {
            row.set(name, v.map_or(Value::Null, |i| Value::from(i64::from(i))));
        } else if let Ok(v) = pg_row.try_get::<Option<f64>, _>(name) {
            row.set(name, v.map_or(Value::Null, Value::from));
        } else if let Ok(v) = pg_row.try_get::<Option<bool>, _>(name) {
            row.set(name, v.map_or(Value::Null, Value::from));
        } else if let Ok(v) = pg_row.try_get::<Option<Vec<u8>>, _>(name) {
            row.set(name, v.map_or(Value::Null, Value::from));
        }
    }
    row
}

/// SQLSTATE for unique-constraint violations.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for references to undefined tables.
const UNDEFINED_TABLE: &str = "42P01";

/// Map a driver error onto the store taxonomy. Uniqueness conflicts
/// must come back as [`StoreError::ConstraintViolation`] so the engine
/// can isolate them per row.
fn classify_error(error: sqlx::Error, context: &str) -> StoreError {
    if let sqlx::Error::Database(ref db) = error {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return StoreError::constraint_violation(db.message().to_string());
            }
            Some(UNDEFINED_TABLE) => {
                return StoreError::TableNotFound {
                    table: context.to_string(),
                };
            }
            _ => {}
        }
    }
    let text = error.to_string();
    if text.contains("duplicate") || text.contains("unique") {
        return StoreError::constraint_violation(text);
    }
    StoreError::backend_with_source(context.to_string(), error)
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self, query), fields(table = %query.table))]
    async fn fetch_rows(&self, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        let pool = self.get_pool().await?;
        let sql = query.to_sql();
        let pg_rows = sqlx::query(&sql)
            .fetch_all(&pool)
            .await
            .map_err(|e| classify_error(e, &query.table))?;
        debug!(rows = pg_rows.len(), "fetched rows");
        Ok(pg_rows.iter().map(row_from_pg).collect())
    }

    #[instrument(skip(self))]
    async fn field_names(&self, table: &str) -> StoreResult<Vec<String>> {
        let pool = self.get_pool().await?;
        let columns: Vec<String> = sqlx::query_scalar(
            r"
            SELECT column_name
            FROM information_schema.columns
            WHERE table_name = $1 AND table_schema = $2
            ORDER BY ordinal_position
            ",
        )
        .bind(table)
        .bind(self.config.effective_schema())
        .fetch_all(&pool)
        .await
        .map_err(|e| classify_error(e, table))?;

        if columns.is_empty() {
            return Err(StoreError::TableNotFound {
                table: table.to_string(),
            });
        }
        Ok(columns)
    }

    #[instrument(skip(self, statement), fields(table = %statement.table()))]
    async fn execute(&self, statement: &Statement) -> StoreResult<u64> {
        let pool = self.get_pool().await?;
        let (sql, args) = statement.to_sql();
        let result = bind_values(sqlx::query(&sql), &args)
            .execute(&pool)
            .await
            .map_err(|e| classify_error(e, statement.table()))?;
        debug!(sql = %sql, rows_affected = result.rows_affected(), "executed statement");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, row))]
    async fn insert_row(&self, table: &str, row: &Row) -> StoreResult<()> {
        let pool = self.get_pool().await?;
        let (sql, args) = insert_sql(table, row);
        bind_values(sqlx::query(&sql), &args)
            .execute(&pool)
            .await
            .map_err(|e| classify_error(e, table))?;
        debug!(table, "inserted row");
        Ok(())
    }
}
