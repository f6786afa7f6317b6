//! Observable state snapshots for invariant checking.

use office_hours_core::{
    Environment, OfficeHours, Occupancy, QueueStudent, RoomState, StaffId, StudentId, Timestamp,
};

/// Snapshot of the queue and every room at one instant.
#[derive(Debug, Clone)]
pub struct SystemSnapshot {
    /// When the snapshot was taken.
    pub now: Timestamp,
    /// Queue entries in order.
    pub queue: Vec<QueueStudent>,
    /// Open rooms ordered by staff id.
    pub rooms: Vec<RoomSnapshot>,
}

/// Snapshot of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Room owner.
    pub staff: StaffId,
    /// Room state.
    pub state: RoomState,
    /// Student dispatched to or reserved for the room.
    pub incoming: Option<StudentId>,
    /// Who is in the room's channel.
    pub occupancy: Occupancy,
    /// Whether the owner is on break.
    pub on_break: bool,
}

impl SystemSnapshot {
    /// Snapshot with no queue and no rooms.
    pub fn empty() -> Self {
        Self { now: Timestamp::EPOCH, queue: Vec::new(), rooms: Vec::new() }
    }

    /// Capture the observable state of `hours`.
    pub fn capture<E: Environment>(hours: &OfficeHours<E>) -> Self {
        let queue = hours.queue().queue().iter().cloned().collect();
        let rooms = hours
            .rooms()
            .iter()
            .map(|room| RoomSnapshot {
                staff: room.staff,
                state: room.state,
                incoming: room.incoming,
                occupancy: hours.occupancy(room.staff),
                on_break: hours.ledger().breaking_until(room.staff).is_some(),
            })
            .collect();
        Self { now: hours.env().now(), queue, rooms }
    }

    /// Queue entry for `student`.
    pub fn queued(&self, student: StudentId) -> Option<&QueueStudent> {
        self.queue.iter().find(|entry| entry.student == student)
    }

    /// Room owned by `staff`.
    pub fn room(&self, staff: StaffId) -> Option<&RoomSnapshot> {
        self.rooms.iter().find(|room| room.staff == staff)
    }
}
