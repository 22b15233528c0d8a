//! Matching of desired rows to snapshot rows.

use std::collections::BTreeSet;

use rowsync_store::{Row, Value};
use tracing::debug;

use crate::snapshot::{key_tuple, Snapshot};

/// One desired row matched to one snapshot row under one key.
///
/// A pair can appear more than once when several keys resolve it;
/// each occurrence is planned independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRecord {
    /// Index into the key list that produced the match.
    pub key: usize,
    /// Position of the snapshot row.
    pub current: usize,
    /// Index of the desired row.
    pub desired: usize,
}

/// The full matching between desired rows and a snapshot.
#[derive(Debug, Default)]
pub struct MatchSet {
    records: Vec<MatchRecord>,
    matched_current: BTreeSet<usize>,
    matched_desired: BTreeSet<usize>,
}

impl MatchSet {
    /// Match every desired row against the snapshot under every key.
    ///
    /// With `exclude_null_keys` set, a key tuple containing a null
    /// never matches under that key; the other keys still apply.
    pub fn build(
        snapshot: &Snapshot,
        desired: &[Row],
        keys: &[Vec<String>],
        exclude_null_keys: bool,
    ) -> Self {
        let mut set = Self::default();
        for (desired_index, row) in desired.iter().enumerate() {
            for (key_index, key) in keys.iter().enumerate() {
                let tuple = key_tuple(row, key);
                if exclude_null_keys && tuple.contains(&Value::Null) {
                    continue;
                }
                let Some(positions) = snapshot.lookup(&tuple) else {
                    continue;
                };
                for &current in positions {
                    set.records.push(MatchRecord {
                        key: key_index,
                        current,
                        desired: desired_index,
                    });
                    set.matched_current.insert(current);
                    set.matched_desired.insert(desired_index);
                }
            }
        }
        debug!(
            matches = set.records.len(),
            matched_current = set.matched_current.len(),
            matched_desired = set.matched_desired.len(),
            "matched desired rows against snapshot"
        );
        set
    }

    /// Matches in discovery order.
    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Indices of desired rows that matched nothing, ascending.
    pub fn unmatched_desired(&self, desired_count: usize) -> Vec<usize> {
        (0..desired_count)
            .filter(|i| !self.matched_desired.contains(i))
            .collect()
    }

    /// Positions of snapshot rows that nothing matched, ascending.
    pub fn unmatched_current(&self, snapshot_count: usize) -> Vec<usize> {
        (0..snapshot_count)
            .filter(|i| !self.matched_current.contains(i))
            .collect()
    }
}
