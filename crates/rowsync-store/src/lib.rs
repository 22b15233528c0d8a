//! # Store capability boundary
//!
//! Everything the reconciliation engine needs from a backing table
//! store, and nothing more:
//!
//! - [`Value`] / [`Row`] - typed, nullable scalars in an ordered,
//!   presence-aware field mapping
//! - [`Statement`] / [`SelectQuery`] - structured mutations and reads
//!   that render to parameterized SQL
//! - [`Store`] - the capability trait any backend implements
//! - [`MemoryStore`] - an in-memory backend with uniqueness
//!   enforcement, used for tests and previews
//!
//! Backends must surface uniqueness conflicts as
//! [`StoreError::ConstraintViolation`]; that distinction is the
//! engine's partial-failure isolation boundary.

pub mod error;
pub mod memory;
pub mod row;
pub mod statement;
pub mod traits;
pub mod value;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use row::Row;
pub use statement::{insert_sql, DeleteStatement, Predicate, SelectQuery, Statement, UpdateStatement};
pub use traits::Store;
pub use value::Value;
