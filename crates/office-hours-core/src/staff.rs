//! Persisted per-staff state.
//!
//! The durable store is the source of truth for break state and time
//! accounting. The core keeps a [`StaffLedger`] mirror and emits
//! `PersistStaff` whenever a record changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{action::Action, member::StaffId, time::Timestamp};

/// Durable record for one staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRecord {
    /// Staff identity
    pub id: StaffId,
    /// Display name
    pub name: String,
    /// Seconds spent in their room with a student
    pub seconds_with: f64,
    /// Seconds spent in their room without a student
    pub seconds_without: f64,
    /// End of the current break
    pub breaking_until: Option<Timestamp>,
    /// Minutes of break requested while a student was present
    pub desiring_break: Option<u32>,
}

impl StaffRecord {
    /// Fresh record with no history.
    pub fn new(id: StaffId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            seconds_with: 0.0,
            seconds_without: 0.0,
            breaking_until: None,
            desiring_break: None,
        }
    }

    /// Fraction of hosted time spent with a student. Zero with no history.
    pub fn ratio(&self) -> f64 {
        let total = self.seconds_with + self.seconds_without;
        if total > 0.0 { self.seconds_with / total } else { 0.0 }
    }
}

/// In-memory mirror of every known [`StaffRecord`].
#[derive(Debug, Default)]
pub struct StaffLedger {
    records: BTreeMap<StaffId, StaffRecord>,
}

impl StaffLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded from stored records.
    pub fn from_records(records: impl IntoIterator<Item = StaffRecord>) -> Self {
        Self { records: records.into_iter().map(|record| (record.id, record)).collect() }
    }

    /// Record for `staff`.
    pub fn get(&self, staff: StaffId) -> Option<&StaffRecord> {
        self.records.get(&staff)
    }

    /// Mutable record for `staff`.
    pub fn get_mut(&mut self, staff: StaffId) -> Option<&mut StaffRecord> {
        self.records.get_mut(&staff)
    }

    /// Record for `staff`, created with `name` if missing.
    pub fn entry(&mut self, staff: StaffId, name: &str) -> &mut StaffRecord {
        self.records.entry(staff).or_insert_with(|| StaffRecord::new(staff, name))
    }

    /// Load-balancing ratio for `staff`.
    pub fn ratio(&self, staff: StaffId) -> f64 {
        self.records.get(&staff).map_or(0.0, StaffRecord::ratio)
    }

    /// Break end for `staff`, if on break.
    pub fn breaking_until(&self, staff: StaffId) -> Option<Timestamp> {
        self.records.get(&staff).and_then(|record| record.breaking_until)
    }

    /// Deferred break length for `staff`, if one is pending.
    pub fn desiring_break(&self, staff: StaffId) -> Option<u32> {
        self.records.get(&staff).and_then(|record| record.desiring_break)
    }

    /// All records, ordered by staff id.
    pub fn iter(&self) -> impl Iterator<Item = &StaffRecord> {
        self.records.values()
    }

    /// `PersistStaff` action carrying the current record for `staff`.
    pub fn persist(&self, staff: StaffId) -> Option<Action> {
        self.records.get(&staff).cloned().map(Action::PersistStaff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_handles_empty_history() {
        let mut record = StaffRecord::new(StaffId(1), "Ada");
        assert!(record.ratio().abs() < f64::EPSILON);

        record.seconds_with = 30.0;
        record.seconds_without = 90.0;
        assert!((record.ratio() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn entry_creates_once() {
        let mut ledger = StaffLedger::new();
        ledger.entry(StaffId(1), "Ada").seconds_with = 5.0;
        ledger.entry(StaffId(1), "Someone Else");

        let record = ledger.get(StaffId(1)).unwrap();
        assert_eq!(record.name, "Ada");
        assert!(matches!(
            ledger.persist(StaffId(1)),
            Some(Action::PersistStaff(r)) if r.seconds_with > 4.0
        ));
        assert!(ledger.persist(StaffId(2)).is_none());
    }
}
