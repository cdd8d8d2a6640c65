//! Reconciliation manifest.
//!
//! Tracks, for one cycle, which records from the previous cycle are still
//! unaccounted for (`pending_delete`) and which records have been asserted
//! this cycle (`observed`). Mark-and-sweep: everything left in
//! `pending_delete` when the cycle closes has disappeared upstream.

use metasync_types::RecordKey;
use std::collections::BTreeSet;

/// A set of record keys, ordered so it persists deterministically.
pub type KeySet = BTreeSet<RecordKey>;

/// Per-cycle reconciliation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Keys from the previous cycle not yet reasserted.
    pending_delete: KeySet,
    /// Keys asserted this cycle. Seeds the next cycle's `pending_delete`.
    observed: KeySet,
}

impl Manifest {
    /// Starts a cycle from the previous cycle's observed keys.
    pub fn from_prior(prior: KeySet) -> Self {
        Self {
            pending_delete: prior,
            observed: KeySet::new(),
        }
    }

    /// Records that `key` still exists upstream.
    ///
    /// Returns true if the key was carried over from the previous cycle.
    pub fn mark_observed(&mut self, key: RecordKey) -> bool {
        let carried = self.pending_delete.remove(&key);
        self.observed.insert(key);
        carried
    }

    /// Records that `key` was deleted explicitly this cycle, so it needs no
    /// tombstone and must not seed the next cycle.
    pub fn mark_deleted(&mut self, key: &RecordKey) {
        self.pending_delete.remove(key);
        self.observed.remove(key);
    }

    /// Keys still awaiting reassertion.
    pub fn pending_delete(&self) -> &KeySet {
        &self.pending_delete
    }

    /// Keys asserted this cycle.
    pub fn observed(&self) -> &KeySet {
        &self.observed
    }

    /// Drains the keys that must be tombstoned.
    pub fn take_pending_delete(&mut self) -> KeySet {
        std::mem::take(&mut self.pending_delete)
    }

    /// Consumes the manifest, returning the next cycle's seed.
    pub fn into_observed(self) -> KeySet {
        self.observed
    }
}
