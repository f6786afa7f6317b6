//! Hosted-time accounting.
//!
//! While a staff member sits in their own room, their time is attributed
//! either to helping a student or to waiting for one. The resulting ratio
//! steers the allocation pass toward less busy staff.

use std::collections::HashMap;

use crate::{
    action::Action, error::TrackerError, member::StaffId, staff::StaffLedger, time::Timestamp,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    WithStudent(Timestamp),
    WithoutStudent(Timestamp),
}

/// Tracks the current time segment for each hosting staff member.
#[derive(Debug, Default)]
pub struct TimeTracker {
    segments: HashMap<StaffId, Segment>,
}

impl TimeTracker {
    /// Tracker with nobody hosting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `staff` is being tracked.
    pub fn is_tracking(&self, staff: StaffId) -> bool {
        self.segments.contains_key(&staff)
    }

    /// Begin tracking `staff`, who just entered their room.
    pub fn start_tracking(
        &mut self,
        staff: StaffId,
        with_student: bool,
        now: Timestamp,
    ) -> Result<(), TrackerError> {
        if self.segments.contains_key(&staff) {
            return Err(TrackerError::AlreadyTracking(staff));
        }
        let segment =
            if with_student { Segment::WithStudent(now) } else { Segment::WithoutStudent(now) };
        self.segments.insert(staff, segment);
        Ok(())
    }

    /// Stop tracking `staff`, crediting the open segment.
    pub fn stop_tracking(
        &mut self,
        staff: StaffId,
        now: Timestamp,
        ledger: &mut StaffLedger,
    ) -> Result<Option<Action>, TrackerError> {
        let segment = self.segments.remove(&staff).ok_or(TrackerError::NotTracking(staff))?;
        Ok(credit(staff, segment, now, ledger))
    }

    /// First student arrived: close the waiting segment.
    pub fn student_joined(
        &mut self,
        staff: StaffId,
        now: Timestamp,
        ledger: &mut StaffLedger,
    ) -> Option<Action> {
        match self.segments.get(&staff).copied()? {
            segment @ Segment::WithoutStudent(_) => {
                self.segments.insert(staff, Segment::WithStudent(now));
                credit(staff, segment, now, ledger)
            },
            Segment::WithStudent(_) => None,
        }
    }

    /// Last student left: close the helping segment.
    pub fn student_left(
        &mut self,
        staff: StaffId,
        now: Timestamp,
        ledger: &mut StaffLedger,
    ) -> Option<Action> {
        match self.segments.get(&staff).copied()? {
            segment @ Segment::WithStudent(_) => {
                self.segments.insert(staff, Segment::WithoutStudent(now));
                credit(staff, segment, now, ledger)
            },
            Segment::WithoutStudent(_) => None,
        }
    }
}

fn credit(
    staff: StaffId,
    segment: Segment,
    now: Timestamp,
    ledger: &mut StaffLedger,
) -> Option<Action> {
    let record = ledger.get_mut(staff)?;
    match segment {
        Segment::WithStudent(since) => {
            record.seconds_with += now.saturating_duration_since(since).as_secs_f64();
        },
        Segment::WithoutStudent(since) => {
            record.seconds_without += now.saturating_duration_since(since).as_secs_f64();
        },
    }
    ledger.persist(staff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staff::StaffRecord;

    fn ledger() -> StaffLedger {
        StaffLedger::from_records([StaffRecord::new(StaffId(1), "Ada")])
    }

    #[test]
    fn segments_credit_the_right_bucket() {
        let mut ledger = ledger();
        let mut tracker = TimeTracker::new();
        tracker.start_tracking(StaffId(1), false, Timestamp::from_secs(0)).unwrap();

        assert!(
            tracker.student_joined(StaffId(1), Timestamp::from_secs(60), &mut ledger).is_some()
        );
        assert!(
            tracker.student_joined(StaffId(1), Timestamp::from_secs(70), &mut ledger).is_none()
        );
        tracker.student_left(StaffId(1), Timestamp::from_secs(240), &mut ledger);
        tracker.stop_tracking(StaffId(1), Timestamp::from_secs(300), &mut ledger).unwrap();

        let record = ledger.get(StaffId(1)).unwrap();
        assert!((record.seconds_with - 180.0).abs() < 1e-9);
        assert!((record.seconds_without - 120.0).abs() < 1e-9);
        assert!((record.ratio() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn double_start_is_rejected() {
        let mut tracker = TimeTracker::new();
        tracker.start_tracking(StaffId(1), false, Timestamp::EPOCH).unwrap();
        assert_eq!(
            tracker.start_tracking(StaffId(1), true, Timestamp::EPOCH),
            Err(TrackerError::AlreadyTracking(StaffId(1)))
        );
    }

    #[test]
    fn stop_without_start_is_rejected() {
        let mut tracker = TimeTracker::new();
        let mut ledger = ledger();
        assert_eq!(
            tracker.stop_tracking(StaffId(1), Timestamp::EPOCH, &mut ledger),
            Err(TrackerError::NotTracking(StaffId(1)))
        );
    }
}
