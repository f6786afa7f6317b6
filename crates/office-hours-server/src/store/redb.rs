//! Redb-backed durable staff store.
//!
//! Uses Redb's ACID transactions, so a record either lands whole or not at
//! all. Records survive restarts.

use std::{path::Path, sync::Arc};

use office_hours_core::{StaffId, StaffRecord};
use redb::{Database, ReadableTable, TableDefinition};

use super::{StaffStore, StoreError};

/// Table: staff
/// Key: staff id
/// Value: CBOR-encoded StaffRecord
const STAFF: TableDefinition<u64, &[u8]> = TableDefinition::new("staff");

/// Durable staff store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStaffStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStaffStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStaffStore").finish_non_exhaustive()
    }
}

impl RedbStaffStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the staff table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(STAFF).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl StaffStore for RedbStaffStore {
    fn store_staff(&self, record: &StaffRecord) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(record, &mut bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(STAFF).map_err(|e| StoreError::Io(e.to_string()))?;
            table
                .insert(record.id.0, bytes.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }

    fn load_staff(&self, staff: StaffId) -> Result<Option<StaffRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(STAFF).map_err(|e| StoreError::Io(e.to_string()))?;

        match table.get(staff.0).map_err(|e| StoreError::Io(e.to_string()))? {
            Some(value) => {
                let record: StaffRecord = ciborium::from_reader(value.value())
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(record))
            },
            None => Ok(None),
        }
    }

    fn list_staff(&self) -> Result<Vec<StaffRecord>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(STAFF).map_err(|e| StoreError::Io(e.to_string()))?;

        let mut records = Vec::new();
        for result in table.iter().map_err(|e| StoreError::Io(e.to_string()))? {
            let (_, value) = result.map_err(|e| StoreError::Io(e.to_string()))?;
            let record: StaffRecord = ciborium::from_reader(value.value())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use office_hours_core::Timestamp;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_record_is_none() {
        let dir = tempdir().unwrap();
        let store = RedbStaffStore::open(dir.path().join("staff.redb")).unwrap();

        assert_eq!(store.load_staff(StaffId(1)).unwrap(), None);
        assert!(store.list_staff().unwrap().is_empty());
    }

    #[test]
    fn records_list_in_id_order() {
        let dir = tempdir().unwrap();
        let store = RedbStaffStore::open(dir.path().join("staff.redb")).unwrap();

        let mut late = StaffRecord::new(StaffId(30), "Barbara Liskov");
        late.breaking_until = Some(Timestamp::from_secs(5_000));
        store.store_staff(&late).unwrap();
        store.store_staff(&StaffRecord::new(StaffId(4), "Edsger Dijkstra")).unwrap();

        let ids: Vec<StaffId> = store.list_staff().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![StaffId(4), StaffId(30)]);
        assert_eq!(store.load_staff(StaffId(30)).unwrap(), Some(late));
    }
}
