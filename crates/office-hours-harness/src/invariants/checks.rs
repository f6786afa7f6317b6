//! Standard invariant checks.

use std::collections::{HashMap, HashSet};

use office_hours_core::{Heading, RoomState};

use super::{Invariant, InvariantResult, SystemSnapshot};

/// A student is queued at most once.
pub struct QueueUniqueness;

impl Invariant for QueueUniqueness {
    fn name(&self) -> &'static str {
        "queue_uniqueness"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        for entry in &state.queue {
            if !seen.insert(entry.student) {
                return Err(self.violation(format!("student {} queued twice", entry.student)));
            }
        }
        Ok(())
    }
}

/// A student is incoming to at most one room, and is never headed to a room
/// other than the one expecting them.
pub struct SingleDispatch;

impl Invariant for SingleDispatch {
    fn name(&self) -> &'static str {
        "single_dispatch"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut targets = HashMap::new();
        for room in &state.rooms {
            let Some(student) = room.incoming else { continue };
            if let Some(other) = targets.insert(student, room.staff) {
                return Err(self.violation(format!(
                    "student {student} incoming to rooms of staff {other} and {}",
                    room.staff
                )));
            }

            if let Some(entry) = state.queued(student) {
                let heading = entry.heading.map(|h| h.staff());
                if heading.is_some_and(|staff| staff != room.staff) {
                    return Err(self.violation(format!(
                        "student {student} incoming to staff {} but heading {:?}",
                        room.staff, entry.heading
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Reservations agree on both sides: a reserved student is the incoming
/// student of that room, and a room in `StudentReservedOpeningSoon` holds a
/// reservation.
pub struct ReservationConsistency;

impl Invariant for ReservationConsistency {
    fn name(&self) -> &'static str {
        "reservation_consistency"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for entry in &state.queue {
            let Some(Heading::Reserved(staff)) = entry.heading else { continue };
            let holds = state.room(staff).is_some_and(|room| room.incoming == Some(entry.student));
            if !holds {
                return Err(self.violation(format!(
                    "student {} reserved for staff {staff} whose room does not expect them",
                    entry.student
                )));
            }
        }

        for room in &state.rooms {
            if room.state != RoomState::StudentReservedOpeningSoon {
                continue;
            }
            let reserved =
                room.incoming.and_then(|student| state.queued(student)).and_then(|e| e.heading);
            if reserved != Some(Heading::Reserved(room.staff)) {
                return Err(self.violation(format!(
                    "room of staff {} is reserved but incoming is {:?}",
                    room.staff, room.incoming
                )));
            }
        }
        Ok(())
    }
}

/// A room with a student in it is never offered to the queue.
pub struct OccupiedRoomsClosed;

impl Invariant for OccupiedRoomsClosed {
    fn name(&self) -> &'static str {
        "occupied_rooms_closed"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for room in &state.rooms {
            if room.occupancy.students > 0
                && !matches!(room.state, RoomState::Closed | RoomState::Inaccessible)
            {
                return Err(self.violation(format!(
                    "room of staff {} has {} students but is {:?}",
                    room.staff, room.occupancy.students, room.state
                )));
            }
        }
        Ok(())
    }
}

/// A room whose owner is on break is never offered to the queue.
pub struct OnBreakRoomsClosed;

impl Invariant for OnBreakRoomsClosed {
    fn name(&self) -> &'static str {
        "on_break_rooms_closed"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for room in &state.rooms {
            if room.on_break && !matches!(room.state, RoomState::Closed | RoomState::Inaccessible) {
                return Err(self.violation(format!(
                    "staff {} is on break but their room is {:?}",
                    room.staff, room.state
                )));
            }
        }
        Ok(())
    }
}
