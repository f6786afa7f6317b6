//! Error types for office hours operations.
//!
//! Lookup failures (a student or staff member missing from the collection an
//! operation expects) are reported to the caller. External failures such as a
//! failed move never show up here; they arrive as events and are recovered by
//! reverting room state.

use crate::member::{StaffId, StudentId};

/// Queue lookup and membership errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Student is not in the queue.
    #[error("student {0} is not queued")]
    NotQueued(StudentId),

    /// Student is already in the queue.
    #[error("student {0} is already queued")]
    AlreadyQueued(StudentId),
}

/// Room lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Staff member has no room.
    #[error("no room for staff member {0}")]
    RoomNotFound(StaffId),

    /// Staff member is not on the roster.
    #[error("staff member {0} is not on the roster")]
    UnknownStaff(StaffId),

    /// Staff member has no timeslot covering the current time.
    #[error("staff member {0} has no active timeslot")]
    NoActiveTimeslot(StaffId),
}

/// Break request rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakError {
    /// Staff member is not currently hosting a room.
    #[error("staff member {0} is not hosting office hours")]
    NotHosting(StaffId),

    /// A deferred break is already waiting for the room to empty.
    #[error("staff member {0} is already waiting to go on break")]
    AlreadyDesiring(StaffId),

    /// The room's timeslot is over.
    #[error("room for staff member {0} is closing")]
    RoomClosing(StaffId),

    /// Staff member is not on break.
    #[error("staff member {0} is not on break")]
    NotOnBreak(StaffId),
}

/// Time tracker state errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// Tracking already started for this staff member.
    #[error("already tracking time for staff member {0}")]
    AlreadyTracking(StaffId),

    /// No tracking in progress for this staff member.
    #[error("not tracking time for staff member {0}")]
    NotTracking(StaffId),
}

/// Any error surfaced by [`crate::OfficeHours`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfficeHoursError {
    /// Queue error
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Room error
    #[error("room error: {0}")]
    Room(#[from] RoomError),

    /// Break error
    #[error("break error: {0}")]
    Break(#[from] BreakError),

    /// Tracker error
    #[error("tracker error: {0}")]
    Tracker(#[from] TrackerError),
}
