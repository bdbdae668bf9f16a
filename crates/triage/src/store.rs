//! Result store for test failure records.
//!
//! One logical store per simulation run. The store is an explicit handle:
//! clones share the same records, so every pipeline component can hold one
//! without a global.

use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::types::{Analysis, TestFailureRecord};

/// Keyed store of test failure records, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    records: Arc<RwLock<IndexMap<String, TestFailureRecord>>>,
}

impl ResultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record by its identifier.
    ///
    /// Replacing keeps the record's original position.
    pub fn save(&self, record: TestFailureRecord) {
        debug!(test_run_id = %record.test_run_id, "Saving test run");
        self.write().insert(record.test_run_id.clone(), record);
    }

    /// Get a copy of a record.
    #[must_use]
    pub fn get(&self, test_run_id: &str) -> Option<TestFailureRecord> {
        self.read().get(test_run_id).cloned()
    }

    /// Shallow-merge `partial` into a record's analysis.
    ///
    /// The read-modify-write happens under one write lock. Unknown
    /// identifiers are ignored.
    pub fn merge_analysis(&self, test_run_id: &str, partial: Analysis) {
        let mut records = self.write();
        match records.get_mut(test_run_id) {
            Some(record) => record.analysis.merge(partial),
            None => warn!(test_run_id, "Analysis update for unknown test run ignored"),
        }
    }

    /// All records, in insertion order.
    #[must_use]
    pub fn list_all(&self) -> Vec<TestFailureRecord> {
        self.read().values().cloned().collect()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove every record.
    pub fn clear(&self) {
        let mut records = self.write();
        debug!(count = records.len(), "Clearing result store");
        records.clear();
    }

    // Mutations are single map operations, so a poisoned lock still guards a
    // consistent map.
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, TestFailureRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, TestFailureRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}
