//! Advisory time pacing.
//!
//! The busier the queue relative to the number of rooms, the less time each
//! student gets. When a student's allotment runs out the room hears a short
//! nudge; nothing is enforced.

use std::{collections::HashMap, time::Duration};

use crate::{action::Action, member::StaffId, time::Timestamp, timer::TimerKey};

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Tracks when the current student joined each room.
#[derive(Debug)]
pub struct TimeControl {
    joined_at: HashMap<StaffId, Timestamp>,
    min_allotment: Duration,
}

impl TimeControl {
    /// Pacing with the given floor on the allotment.
    pub fn new(min_allotment: Duration) -> Self {
        Self { joined_at: HashMap::new(), min_allotment }
    }

    /// Time each student gets: one hour divided by students waiting per room,
    /// floored at the minimum allotment. Zero when there are no rooms.
    pub fn allotted_time(&self, queue_len: usize, room_count: usize) -> Duration {
        if room_count == 0 {
            return Duration::ZERO;
        }
        if queue_len == 0 {
            return HOUR.max(self.min_allotment);
        }
        let per_room = queue_len as f64 / room_count as f64;
        Duration::from_secs_f64(HOUR.as_secs_f64() / per_room).max(self.min_allotment)
    }

    /// When the student in `staff`'s room joined, if one is being paced.
    pub fn joined_at(&self, staff: StaffId) -> Option<Timestamp> {
        self.joined_at.get(&staff).copied()
    }

    /// A student entered `staff`'s room, which now holds `students` students.
    pub fn on_student_join(
        &mut self,
        staff: StaffId,
        students: usize,
        now: Timestamp,
        allotment: Duration,
    ) -> Vec<Action> {
        if students != 1 {
            return Vec::new();
        }
        self.joined_at.insert(staff, now);
        vec![reminder(staff, now, allotment)]
    }

    /// A student left `staff`'s room, which now holds `students` students.
    pub fn on_student_leave(&mut self, staff: StaffId, students: usize) -> Vec<Action> {
        if students == 0 {
            self.joined_at.remove(&staff);
        }
        vec![Action::CancelTimer { key: TimerKey::Reminder(staff) }]
    }

    /// The queue grew: reschedule every pending reminder with the new
    /// allotment.
    pub fn recalculate(&self, allotment: Duration) -> Vec<Action> {
        let mut rooms: Vec<_> = self.joined_at.iter().collect();
        rooms.sort();
        rooms.into_iter().map(|(staff, joined)| reminder(*staff, *joined, allotment)).collect()
    }

    /// Stop pacing `staff`'s room entirely.
    pub fn forget(&mut self, staff: StaffId) -> Vec<Action> {
        self.joined_at.remove(&staff);
        vec![Action::CancelTimer { key: TimerKey::Reminder(staff) }]
    }
}

fn reminder(staff: StaffId, joined: Timestamp, allotment: Duration) -> Action {
    Action::ScheduleTimer { key: TimerKey::Reminder(staff), at: joined + allotment }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control() -> TimeControl {
        TimeControl::new(Duration::from_secs(6 * 60))
    }

    #[test]
    fn allotment_shrinks_with_queue_and_is_floored() {
        let tc = control();
        assert_eq!(tc.allotted_time(5, 0), Duration::ZERO);
        assert_eq!(tc.allotted_time(0, 2), HOUR);
        assert_eq!(tc.allotted_time(1, 2), 2 * HOUR);
        assert_eq!(tc.allotted_time(4, 2), Duration::from_secs(30 * 60));
        assert_eq!(tc.allotted_time(100, 1), Duration::from_secs(6 * 60));
    }

    #[test]
    fn only_first_student_starts_pacing() {
        let mut tc = control();
        let now = Timestamp::from_secs(100);
        let allot = Duration::from_secs(600);

        assert_eq!(tc.on_student_join(StaffId(1), 1, now, allot), vec![Action::ScheduleTimer {
            key: TimerKey::Reminder(StaffId(1)),
            at: Timestamp::from_secs(700)
        }]);
        assert!(tc.on_student_join(StaffId(1), 2, now, allot).is_empty());
        assert_eq!(tc.joined_at(StaffId(1)), Some(now));
    }

    #[test]
    fn leaving_cancels_and_empty_room_forgets() {
        let mut tc = control();
        tc.on_student_join(StaffId(1), 1, Timestamp::EPOCH, HOUR);

        let actions = tc.on_student_leave(StaffId(1), 1);
        assert_eq!(actions, vec![Action::CancelTimer { key: TimerKey::Reminder(StaffId(1)) }]);
        assert!(tc.joined_at(StaffId(1)).is_some());

        tc.on_student_leave(StaffId(1), 0);
        assert!(tc.joined_at(StaffId(1)).is_none());
        assert!(tc.recalculate(HOUR).is_empty());
    }
}
