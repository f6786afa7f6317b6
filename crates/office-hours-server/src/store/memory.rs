#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use office_hours_core::{StaffId, StaffRecord};

use super::{StaffStore, StoreError};

/// In-memory staff store for tests and the development console.
///
/// Records live in a `BTreeMap` behind `Arc<Mutex<_>>`, so clones share them.
/// A poisoned lock is recovered rather than propagated; the map is never left
/// half-updated by a single insert.
#[derive(Debug, Clone, Default)]
pub struct MemoryStaffStore {
    records: Arc<Mutex<BTreeMap<StaffId, StaffRecord>>>,
}

impl MemoryStaffStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StaffStore for MemoryStaffStore {
    fn store_staff(&self, record: &StaffRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id, record.clone());
        Ok(())
    }

    fn load_staff(&self, staff: StaffId) -> Result<Option<StaffRecord>, StoreError> {
        Ok(self.records.lock().unwrap_or_else(PoisonError::into_inner).get(&staff).cloned())
    }

    fn list_staff(&self) -> Result<Vec<StaffRecord>, StoreError> {
        Ok(self.records.lock().unwrap_or_else(PoisonError::into_inner).values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_records() {
        let store = MemoryStaffStore::new();
        let handle = store.clone();

        store.store_staff(&StaffRecord::new(StaffId(7), "Grace Hopper")).unwrap();

        assert_eq!(handle.len(), 1);
        assert_eq!(handle.load_staff(StaffId(7)).unwrap().unwrap().name, "Grace Hopper");
    }

    #[test]
    fn store_overwrites() {
        let store = MemoryStaffStore::new();
        let mut record = StaffRecord::new(StaffId(7), "Grace Hopper");
        store.store_staff(&record).unwrap();

        record.seconds_with = 90.0;
        store.store_staff(&record).unwrap();

        assert_eq!(store.list_staff().unwrap(), vec![record]);
    }
}
