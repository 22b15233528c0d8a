//! Execution phases: updates, inserts, deletes.
//!
//! Each phase plans statements from the match set and either executes
//! them or, in dry-run mode, only records and logs them. Uniqueness
//! conflicts on updates and inserts are isolated per row; every other
//! store error aborts the run.

use rowsync_store::{
    DeleteStatement, Predicate, Row, Statement, Store, UpdateStatement, Value,
};
use tracing::{info, warn};

use crate::defaults::apply_defaults;
use crate::error::{ReconcileError, ReconcileResult};
use crate::matcher::MatchSet;
use crate::options::ReconcileOptions;
use crate::report::{PlannedOperation, ReconcileOutcome};
use crate::snapshot::Snapshot;

/// Key predicates for one row under one key, built from the row's
/// current values. Null values render as `IS NULL`.
fn key_predicates(row: &Row, key: &[String], options: &ReconcileOptions) -> Vec<Predicate> {
    let mut predicates = Vec::with_capacity(key.len() + 1);
    if let Some(clause) = &options.where_clause {
        predicates.push(Predicate::Raw(clause.clone()));
    }
    for field in key {
        let value = row.get(field).cloned().unwrap_or(Value::Null);
        predicates.push(Predicate::for_value(field.clone(), &value));
    }
    predicates
}

/// Update every matched pair whose diff is non-empty.
///
/// Diffs run over the table's fields minus the ignore list, desired
/// against the snapshot values. The WHERE clause is keyed on the
/// snapshot values of the key that produced the match, so a row whose
/// key fields are being rewritten is still addressed by what the table
/// holds.
pub(crate) async fn run_updates(
    store: &dyn Store,
    table: &str,
    snapshot: &Snapshot,
    matches: &MatchSet,
    desired: &mut [Row],
    keys: &[Vec<String>],
    options: &ReconcileOptions,
    outcome: &mut ReconcileOutcome,
) -> ReconcileResult<()> {
    let fields: Vec<String> = store
        .field_names(table)
        .await?
        .into_iter()
        .filter(|f| !options.ignore.contains(f))
        .collect();

    for record in matches.records() {
        apply_defaults(&options.defaults, &mut desired[record.desired])?;
        let desired_row = &desired[record.desired];
        let current = &snapshot.rows()[record.current];

        let mut assignments = Vec::new();
        for field in &fields {
            if !options.overwrite_with_null && !desired_row.has(field) {
                continue;
            }
            let new = desired_row.get(field).cloned().unwrap_or(Value::Null);
            if options.skip_null_desired && new.is_null() {
                continue;
            }
            let cur = current.get(field).cloned().unwrap_or(Value::Null);
            if !cur.is_null() && !new.is_null() && !cur.same_type(&new) {
                return Err(ReconcileError::TypeMismatch {
                    field: field.clone(),
                    current: cur,
                    desired: new,
                });
            }
            if cur != new {
                assignments.push((field.clone(), new));
            }
        }
        if assignments.is_empty() {
            continue;
        }

        let statement = UpdateStatement {
            table: table.to_string(),
            assignments,
            predicates: key_predicates(current, &keys[record.key], options),
        };
        outcome.summary.updates_planned += 1;
        let operation = PlannedOperation::Update(statement.clone());
        if options.dry_run {
            info!(%operation, "planned update");
            outcome.operations.push(operation);
            continue;
        }
        outcome.operations.push(operation);
        match store.execute(&Statement::Update(statement)).await {
            Ok(_) => outcome.summary.updated += 1,
            Err(error) if error.is_constraint_violation() => {
                warn!(%error, table, "update skipped on uniqueness conflict");
                outcome.summary.constraint_violations += 1;
            }
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}

/// Insert every unmatched desired row, defaults applied and the
/// pre-insert hook invoked first. The hook does not run in dry-run
/// mode.
pub(crate) async fn run_inserts(
    store: &dyn Store,
    table: &str,
    unmatched: &[usize],
    desired: &mut [Row],
    options: &ReconcileOptions,
    outcome: &mut ReconcileOutcome,
) -> ReconcileResult<()> {
    for &index in unmatched {
        apply_defaults(&options.defaults, &mut desired[index])?;
        let row = &desired[index];

        if let Some(hook) = &options.before_insert {
            if !options.dry_run {
                hook.invoke(row)?;
            }
        }

        outcome.summary.inserts_planned += 1;
        let operation = PlannedOperation::Insert {
            table: table.to_string(),
            row: row.clone(),
        };
        if options.dry_run {
            info!(%operation, "planned insert");
            outcome.operations.push(operation);
            continue;
        }
        outcome.operations.push(operation);
        match store.insert_row(table, row).await {
            Ok(()) => outcome.summary.inserted += 1,
            Err(error) if error.is_constraint_violation() => {
                warn!(%error, table, "insert skipped on uniqueness conflict");
                outcome.summary.constraint_violations += 1;
            }
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}

/// Delete every unmatched snapshot row, one statement per key.
///
/// Statements after the first for a row are redundant by then and
/// match nothing; they are issued anyway so every key's scope is
/// covered. Store errors here are not isolated.
pub(crate) async fn run_deletes(
    store: &dyn Store,
    table: &str,
    snapshot: &Snapshot,
    matches: &MatchSet,
    keys: &[Vec<String>],
    options: &ReconcileOptions,
    outcome: &mut ReconcileOutcome,
) -> ReconcileResult<()> {
    for position in matches.unmatched_current(snapshot.len()) {
        let row = &snapshot.rows()[position];
        for key in keys {
            let statement = DeleteStatement {
                table: table.to_string(),
                predicates: key_predicates(row, key, options),
            };
            outcome.summary.deletes_planned += 1;
            let operation = PlannedOperation::Delete(statement.clone());
            if options.dry_run {
                info!(%operation, "planned delete");
                outcome.operations.push(operation);
                continue;
            }
            outcome.operations.push(operation);
            store.execute(&Statement::Delete(statement)).await?;
            outcome.summary.deleted += 1;
        }
    }
    Ok(())
}
