//! Durable staff records.
//!
//! Queue and room state are rebuilt from voice membership on every start, so
//! the only durable state is one [`StaffRecord`] per staff member: time spent
//! with and without students, and break state. The trait is synchronous; a
//! record write is a single small transaction.

mod error;
mod memory;
mod redb;

pub use error::StoreError;
pub use memory::MemoryStaffStore;
use office_hours_core::{StaffId, StaffRecord};

pub use self::redb::RedbStaffStore;

/// Storage for staff records.
///
/// Must be Clone (the runtime and its tests hold handles to the same store),
/// Send + Sync, and synchronous. Implementations share state internally, so
/// clones see the same records.
pub trait StaffStore: Clone + Send + Sync + 'static {
    /// Insert or overwrite a staff member's record.
    fn store_staff(&self, record: &StaffRecord) -> Result<(), StoreError>;

    /// Load one staff member's record. `None` if nothing was stored.
    fn load_staff(&self, staff: StaffId) -> Result<Option<StaffRecord>, StoreError>;

    /// Every stored record, ordered by staff id.
    fn list_staff(&self) -> Result<Vec<StaffRecord>, StoreError>;
}
