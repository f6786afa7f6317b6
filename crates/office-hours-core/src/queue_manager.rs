//! Queue management and the allocation pass.
//!
//! [`QueueManager`] owns the waiting queue and the request metadata. Its
//! [`allocate`](QueueManager::allocate) pass pairs ready rooms with queued
//! students:
//!
//! 1. Rooms are offered in [`RoomManager::open_rooms`] order.
//! 2. Candidates are queued students without a heading marker.
//! 3. Each room takes the earliest candidate whose preferences are empty or
//!    name the room's staff member.
//! 4. An `Open` room gets a move right away. An `OpeningSoon` room is
//!    reserved; the move is issued when its grace delay ends, and a timeout
//!    releases the reservation if it is never resolved.
//!
//! The pass runs to completion without suspending, so passes never interleave.

use std::time::Duration;

use crate::{
    action::{Action, Notice},
    config::OfficeHoursConfig,
    error::QueueError,
    member::{StaffId, StudentId},
    metadata::MetadataMapping,
    queue::{Departed, Heading, StudentQueue},
    room::{RoomManager, RoomState},
    staff::StaffLedger,
    time::Timestamp,
    timer::TimerKey,
};

/// Owns the queue and request metadata.
#[derive(Debug)]
pub struct QueueManager {
    queue: StudentQueue,
    metadata: MetadataMapping,
    reservation_timeout: Duration,
}

impl QueueManager {
    /// Empty queue configured from `config`.
    pub fn new(config: &OfficeHoursConfig) -> Self {
        Self {
            queue: StudentQueue::new(config.rejoin_window),
            metadata: MetadataMapping::new(config.metadata_ttl),
            reservation_timeout: config.reservation_timeout,
        }
    }

    /// The waiting queue.
    pub fn queue(&self) -> &StudentQueue {
        &self.queue
    }

    /// Request metadata.
    pub fn metadata(&self) -> &MetadataMapping {
        &self.metadata
    }

    /// Add a student, restoring their old position if they left recently.
    pub fn add_student(
        &mut self,
        student: StudentId,
        now: Timestamp,
    ) -> Result<Vec<Action>, QueueError> {
        match self.queue.recent_position(student) {
            Some(position) if self.queue.recently_left(student, now) => {
                self.queue.insert(position, student)
            },
            _ => self.queue.append(student),
        }
    }

    /// Remove a student and their request.
    pub fn remove_student(
        &mut self,
        student: StudentId,
        now: Timestamp,
    ) -> Result<Departed, QueueError> {
        let mut departed = self.queue.remove(student, now)?;
        departed.actions.extend(self.metadata.remove(student));
        Ok(departed)
    }

    /// Move a queued student to `index`.
    pub fn move_student_position(
        &mut self,
        student: StudentId,
        index: usize,
    ) -> Result<Vec<Action>, QueueError> {
        self.queue.reposition(student, index)
    }

    /// Store a student's request.
    pub fn set_student_metadata(
        &mut self,
        student: StudentId,
        preferences: Vec<StaffId>,
        purpose: String,
        tried: String,
        now: Timestamp,
    ) -> Vec<Action> {
        self.metadata.set(student, preferences, purpose, tried, now)
    }

    /// Drop a student's request.
    pub fn remove_student_metadata(&mut self, student: StudentId) -> Vec<Action> {
        self.metadata.remove(student)
    }

    /// Heading marker of a queued student.
    pub fn heading(&self, student: StudentId) -> Option<Heading> {
        self.queue.get(student).and_then(|entry| entry.heading)
    }

    /// Set or clear a queued student's heading marker. Returns whether the
    /// student was queued.
    pub fn set_heading(&mut self, student: StudentId, heading: Option<Heading>) -> bool {
        match self.queue.get_mut(student) {
            Some(entry) => {
                entry.heading = heading;
                true
            },
            None => false,
        }
    }

    /// Run one allocation pass.
    pub fn allocate(
        &mut self,
        rooms: &mut RoomManager,
        ledger: &StaffLedger,
        now: Timestamp,
    ) -> Vec<Action> {
        let open: Vec<StaffId> =
            rooms.open_rooms(now, ledger).iter().map(|room| room.staff).collect();
        if open.is_empty() || self.queue.is_empty() {
            return Vec::new();
        }

        // a student who left and rejoined while their move was in flight is
        // still expected by that room
        let in_flight: Vec<StudentId> = rooms.iter().filter_map(|room| room.incoming).collect();
        let mut candidates: Vec<StudentId> = self
            .queue
            .iter()
            .filter(|entry| entry.heading.is_none() && !in_flight.contains(&entry.student))
            .map(|entry| entry.student)
            .collect();

        let mut actions = Vec::new();
        for staff in open {
            let Some(index) =
                candidates.iter().position(|student| self.metadata.accepts(*student, staff))
            else {
                continue;
            };
            let Some(room) = rooms.get_room_mut(staff) else {
                continue;
            };
            let student = candidates.remove(index);

            let heading = if room.state == RoomState::OpeningSoon {
                room.state = RoomState::StudentReservedOpeningSoon;
                Heading::Reserved(staff)
            } else {
                Heading::Dispatched(staff)
            };
            room.incoming = Some(student);
            self.set_heading(student, Some(heading));

            let (requested, purpose, tried) = match self.metadata.get(student) {
                Some(meta) => (meta.requested(staff), meta.purpose.clone(), meta.tried.clone()),
                None => (false, String::new(), String::new()),
            };
            let moving_at = match heading {
                Heading::Reserved(_) => room.grace_ends_at,
                Heading::Dispatched(_) => None,
            };
            actions.push(Action::Notify(Notice::IncomingStudent {
                staff,
                student,
                requested,
                purpose,
                tried,
                moving_at,
            }));

            match heading {
                Heading::Dispatched(_) => {
                    actions.push(Action::MoveStudent {
                        student,
                        staff,
                        channel: room.channel.clone(),
                    });
                },
                Heading::Reserved(_) => {
                    actions.push(Action::ScheduleTimer {
                        key: TimerKey::PreemptiveTimeout(student),
                        at: now + self.reservation_timeout,
                    });
                },
            }

            if candidates.is_empty() {
                break;
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        member::{StaffMember, Timeslot},
        room::Occupancy,
    };

    const PRESENT: Occupancy = Occupancy { staff_present: true, students: 0 };

    fn setup(staff: &[u64], students: &[u64]) -> (QueueManager, RoomManager) {
        let mut qm = QueueManager::new(&OfficeHoursConfig::default());
        let mut rooms = RoomManager::new();
        for id in staff {
            let member = StaffMember::new(StaffId(*id), format!("Staff {id}"));
            let slot = Timeslot::new(Timestamp::EPOCH, Timestamp::from_secs(10_000));
            rooms.open_room(&member, slot, PRESENT, false);
        }
        for id in students {
            qm.add_student(StudentId(*id), Timestamp::EPOCH).unwrap();
        }
        (qm, rooms)
    }

    fn moves(actions: &[Action]) -> Vec<(u64, u64)> {
        actions
            .iter()
            .filter_map(|action| match action {
                Action::MoveStudent { student, staff, .. } => Some((student.0, staff.0)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn head_of_queue_goes_to_open_room() {
        let (mut qm, mut rooms) = setup(&[10], &[1, 2, 3]);
        let actions = qm.allocate(&mut rooms, &StaffLedger::new(), Timestamp::from_secs(1));

        assert_eq!(moves(&actions), vec![(1, 10)]);
        assert_eq!(qm.heading(StudentId(1)), Some(Heading::Dispatched(StaffId(10))));
        assert_eq!(qm.heading(StudentId(2)), None);
        assert_eq!(rooms.get_room(StaffId(10)).and_then(|r| r.incoming), Some(StudentId(1)));
    }

    #[test]
    fn second_pass_does_not_double_dispatch() {
        let (mut qm, mut rooms) = setup(&[10], &[1, 2]);
        let ledger = StaffLedger::new();
        qm.allocate(&mut rooms, &ledger, Timestamp::from_secs(1));
        let actions = qm.allocate(&mut rooms, &ledger, Timestamp::from_secs(2));
        assert!(moves(&actions).is_empty());
    }

    #[test]
    fn preference_skips_to_later_student() {
        let (mut qm, mut rooms) = setup(&[10], &[1, 2]);
        qm.set_student_metadata(
            StudentId(1),
            vec![StaffId(20)],
            String::new(),
            String::new(),
            Timestamp::EPOCH,
        );

        let actions = qm.allocate(&mut rooms, &StaffLedger::new(), Timestamp::from_secs(1));
        assert_eq!(moves(&actions), vec![(2, 10)]);
        assert_eq!(qm.heading(StudentId(1)), None);
    }

    #[test]
    fn opening_soon_room_is_reserved_not_moved() {
        let (mut qm, mut rooms) = setup(&[10], &[1]);
        rooms.finish_delay(StaffId(10), Timestamp::from_secs(1), Duration::from_secs(30)).unwrap();

        let actions = qm.allocate(&mut rooms, &StaffLedger::new(), Timestamp::from_secs(1));
        assert!(moves(&actions).is_empty());
        assert!(actions.contains(&Action::ScheduleTimer {
            key: TimerKey::PreemptiveTimeout(StudentId(1)),
            at: Timestamp::from_secs(31),
        }));
        assert_eq!(qm.heading(StudentId(1)), Some(Heading::Reserved(StaffId(10))));
        assert_eq!(
            rooms.get_room(StaffId(10)).map(|r| r.state),
            Some(RoomState::StudentReservedOpeningSoon)
        );
    }

    #[test]
    fn rooms_each_take_one_student_in_arrival_order() {
        let (mut qm, mut rooms) = setup(&[10, 20], &[1, 2, 3]);
        let actions = qm.allocate(&mut rooms, &StaffLedger::new(), Timestamp::from_secs(1));
        assert_eq!(moves(&actions), vec![(1, 10), (2, 20)]);
    }

    #[test]
    fn recent_leaver_gets_old_position_back() {
        let (mut qm, _) = setup(&[], &[1, 2, 3, 4]);
        qm.remove_student(StudentId(2), Timestamp::from_secs(100)).unwrap();
        qm.add_student(StudentId(2), Timestamp::from_secs(130)).unwrap();
        assert_eq!(qm.queue().position(StudentId(2)), Some(1));

        qm.remove_student(StudentId(2), Timestamp::from_secs(200)).unwrap();
        qm.add_student(StudentId(2), Timestamp::from_secs(400)).unwrap();
        assert_eq!(qm.queue().position(StudentId(2)), Some(3));
    }
}
