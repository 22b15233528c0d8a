//! Reconciliation options.

use std::collections::HashMap;
use std::fmt;

use rowsync_store::Value;

use crate::defaults::{DefaultSpec, InsertHook};

/// Per-field value aliases applied during snapshot indexing: a current
/// row indexed under a source value is also reachable under each alias.
pub type KeyMaps = HashMap<String, HashMap<Value, Vec<Value>>>;

/// Configuration for one reconciliation run.
///
/// Built in the fluent style; every flag defaults to off.
#[derive(Clone, Default)]
pub struct ReconcileOptions {
    /// Raw filter clause ANDed into the snapshot read and every scoped
    /// update/delete statement.
    pub where_clause: Option<String>,
    /// Delete current rows that matched no desired row.
    pub delete: bool,
    /// Fields excluded from diffing.
    pub ignore: Vec<String>,
    /// Default declarations, applied in declaration order.
    pub defaults: Vec<(String, DefaultSpec)>,
    /// Do not insert unmatched desired rows.
    pub no_insert: bool,
    /// Return the unmatched desired rows in the outcome.
    pub return_unmatched: bool,
    /// Treat fields absent from a desired row as null when diffing.
    pub overwrite_with_null: bool,
    /// Never write null over a non-null current value.
    pub skip_null_desired: bool,
    /// Hook invoked before each insert (skipped in dry-run).
    pub before_insert: Option<InsertHook>,
    /// Exclude desired rows whose key tuple contains a null from
    /// matching under that key.
    pub exclude_null_key_matches: bool,
    /// Value aliases used during index construction.
    pub key_maps: KeyMaps,
    /// Record and log planned statements instead of executing them.
    pub dry_run: bool,
}

impl ReconcileOptions {
    /// Create options with every flag off.
    #[must_use]
    pub fn new() -> Self {
        // Path syntax would hit the `default` builder method, so go
        // through the trait.
        <Self as Default>::default()
    }

    /// Set the raw filter clause.
    #[must_use]
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// Enable deletion of unmatched current rows.
    #[must_use]
    pub fn delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    /// Exclude fields from diffing.
    #[must_use]
    pub fn ignore(mut self, fields: &[&str]) -> Self {
        self.ignore = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Declare a default for a field. Declaration order is evaluation
    /// order.
    #[must_use]
    pub fn default(mut self, field: impl Into<String>, spec: DefaultSpec) -> Self {
        self.defaults.push((field.into(), spec));
        self
    }

    /// Disable inserting unmatched desired rows.
    #[must_use]
    pub fn no_insert(mut self, no_insert: bool) -> Self {
        self.no_insert = no_insert;
        self
    }

    /// Return unmatched desired rows in the outcome.
    #[must_use]
    pub fn return_unmatched(mut self, return_unmatched: bool) -> Self {
        self.return_unmatched = return_unmatched;
        self
    }

    /// Diff fields absent from the desired row as null.
    #[must_use]
    pub fn overwrite_with_null(mut self, overwrite: bool) -> Self {
        self.overwrite_with_null = overwrite;
        self
    }

    /// Skip null desired values when diffing.
    #[must_use]
    pub fn skip_null_desired(mut self, skip: bool) -> Self {
        self.skip_null_desired = skip;
        self
    }

    /// Set the pre-insert hook.
    #[must_use]
    pub fn before_insert(mut self, hook: InsertHook) -> Self {
        self.before_insert = Some(hook);
        self
    }

    /// Exclude null key tuples from matching.
    #[must_use]
    pub fn exclude_null_key_matches(mut self, exclude: bool) -> Self {
        self.exclude_null_key_matches = exclude;
        self
    }

    /// Register value aliases for a key field.
    #[must_use]
    pub fn key_map(
        mut self,
        field: impl Into<String>,
        source: impl Into<Value>,
        aliases: Vec<Value>,
    ) -> Self {
        self.key_maps
            .entry(field.into())
            .or_default()
            .insert(source.into(), aliases);
        self
    }

    /// Enable dry-run planning.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl fmt::Debug for ReconcileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileOptions")
            .field("where_clause", &self.where_clause)
            .field("delete", &self.delete)
            .field("ignore", &self.ignore)
            .field("defaults", &self.defaults.len())
            .field("no_insert", &self.no_insert)
            .field("return_unmatched", &self.return_unmatched)
            .field("overwrite_with_null", &self.overwrite_with_null)
            .field("skip_null_desired", &self.skip_null_desired)
            .field("before_insert", &self.before_insert.is_some())
            .field("exclude_null_key_matches", &self.exclude_null_key_matches)
            .field("key_maps", &self.key_maps)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
