//! # Row reconciliation engine
//!
//! Reconciles a desired set of rows against the current contents of a
//! table behind any [`Store`] backend. One run reads the current rows
//! once, matches desired rows to them under one or more keys, then
//! updates the matched pairs that differ, inserts the desired rows
//! that matched nothing, and optionally deletes the current rows that
//! nothing matched.
//!
//! ```no_run
//! use rowsync_engine::{reconcile, KeySpec, ReconcileOptions};
//! use rowsync_store::{MemoryStore, Row};
//!
//! # async fn demo() -> Result<(), rowsync_engine::ReconcileError> {
//! let store = MemoryStore::new();
//! let desired = vec![Row::new().with("id", 1i64).with("name", "ada")];
//! let outcome = reconcile(
//!     &store,
//!     "users",
//!     &[KeySpec::from("id")],
//!     desired,
//!     ReconcileOptions::new().delete(true),
//! )
//! .await?;
//! println!("{}", outcome.summary);
//! # Ok(())
//! # }
//! ```
//!
//! The run is planning-first: every statement is recorded in the
//! outcome before execution, and with
//! [`ReconcileOptions::dry_run`] nothing executes at all, so the
//! recorded plan is exactly what a live run would issue.
//!
//! Uniqueness conflicts raised by the store while updating or
//! inserting are logged, counted, and skipped; the rest of the run
//! proceeds. Type mismatches between a non-null current and a non-null
//! desired value abort the run before any further statement.

pub mod defaults;
pub mod error;
pub mod keyspec;
pub mod matcher;
pub mod options;
pub mod report;
pub mod snapshot;

mod executor;

pub use defaults::{ArgSpec, DefaultSpec, InsertHook};
pub use error::{BoxError, ReconcileError, ReconcileResult};
pub use keyspec::KeySpec;
pub use matcher::{MatchRecord, MatchSet};
pub use options::ReconcileOptions;
pub use report::{PlannedOperation, ReconcileOutcome, ReconcileSummary};
pub use snapshot::Snapshot;

use rowsync_store::{Row, Store};
use tracing::{info, instrument};

/// Reconcile `desired` against the current rows of `table`.
///
/// Phases run in a fixed order: snapshot, match, update, insert,
/// delete. Inserts are skipped under
/// [`ReconcileOptions::no_insert`]; deletes only run under
/// [`ReconcileOptions::delete`]. With
/// [`ReconcileOptions::return_unmatched`] the outcome carries the
/// desired rows that matched nothing, defaults applied.
///
/// Running the same call twice against an otherwise untouched table
/// plans no work the second time.
#[instrument(skip_all, fields(table = %table, keys = keys.len(), desired_rows = desired.len()))]
pub async fn reconcile(
    store: &dyn Store,
    table: &str,
    keys: &[KeySpec],
    mut desired: Vec<Row>,
    options: ReconcileOptions,
) -> ReconcileResult<ReconcileOutcome> {
    let keys = keyspec::normalize_keys(keys);
    let snapshot = Snapshot::load(
        store,
        table,
        options.where_clause.as_deref(),
        &keys,
        &options.key_maps,
    )
    .await?;
    let matches = MatchSet::build(
        &snapshot,
        &desired,
        &keys,
        options.exclude_null_key_matches,
    );

    let mut outcome = ReconcileOutcome {
        dry_run: options.dry_run,
        ..ReconcileOutcome::default()
    };
    outcome.summary.snapshot_rows = snapshot.len();
    outcome.summary.matches = matches.records().len();

    executor::run_updates(
        store, table, &snapshot, &matches, &mut desired, &keys, &options, &mut outcome,
    )
    .await?;

    let unmatched_desired = matches.unmatched_desired(desired.len());
    if !options.no_insert {
        executor::run_inserts(
            store,
            table,
            &unmatched_desired,
            &mut desired,
            &options,
            &mut outcome,
        )
        .await?;
    }
    if options.delete {
        executor::run_deletes(store, table, &snapshot, &matches, &keys, &options, &mut outcome)
            .await?;
    }
    if options.return_unmatched {
        outcome.unmatched_desired = Some(
            unmatched_desired
                .iter()
                .map(|&i| desired[i].clone())
                .collect(),
        );
    }

    info!(summary = %outcome.summary, dry_run = options.dry_run, "reconciliation complete");
    Ok(outcome)
}
