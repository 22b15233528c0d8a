//! # PostgreSQL store backend
//!
//! Implements the [`rowsync_store::Store`] capability over `SQLx` with
//! a lazily created connection pool. Uniqueness conflicts surface as
//! [`rowsync_store::StoreError::ConstraintViolation`], which the
//! reconciliation engine isolates per row.
//!
//! ```no_run
//! use rowsync_postgres::{PostgresConfig, PostgresStore};
//!
//! # fn demo() -> Result<(), rowsync_store::StoreError> {
//! let store = PostgresStore::new(
//!     PostgresConfig::new("db.internal", "inventory", "app").with_password("secret"),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod store;

pub use config::{PostgresConfig, SslMode};
pub use store::PostgresStore;
