//! Events consumed by [`crate::OfficeHours`].
//!
//! Voice events are already classified by the runtime (who moved, from where
//! to where). One platform voice-state change may produce several events, for
//! example a student moved out of the waiting channel into a room produces
//! `StudentLeftQueue` followed by `StudentEnteredRoom`.

use crate::{
    member::{StaffId, StaffMember, StudentId},
    timer::TimerKey,
};

/// Input to the office hours state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Periodic schedule poll: open rooms whose timeslot started, close rooms
    /// whose timeslot ended.
    Tick,

    /// A staff member joined or moved into a voice channel.
    StaffEnteredVoice {
        /// Staff member
        staff: StaffId,
        /// Whether the channel is their own room
        own_room: bool,
    },

    /// A staff member disconnected from voice.
    StaffLeftVoice {
        /// Staff member
        staff: StaffId,
    },

    /// A staff member joined the student waiting channel.
    StaffJoinedQueue {
        /// Staff member
        staff: StaffId,
    },

    /// A student joined the waiting channel.
    StudentJoinedQueue {
        /// Student
        student: StudentId,
    },

    /// A student left the waiting channel (disconnect, moved, kicked).
    StudentLeftQueue {
        /// Student
        student: StudentId,
    },

    /// A student arrived in a staff member's room.
    StudentEnteredRoom {
        /// Student
        student: StudentId,
        /// Room owner
        staff: StaffId,
    },

    /// A student left a staff member's room.
    StudentLeftRoom {
        /// Student
        student: StudentId,
        /// Room owner
        staff: StaffId,
    },

    /// Outcome of an `Action::MoveStudent`.
    MoveFinished {
        /// Student that was being moved
        student: StudentId,
        /// Destination room owner
        staff: StaffId,
        /// Whether the platform accepted the move
        moved: bool,
    },

    /// A scheduled timer fired.
    TimerFired(TimerKey),

    /// A student submitted (or resubmitted) their help request.
    MetadataSubmitted {
        /// Student
        student: StudentId,
        /// Staff members the student wants; empty means anyone
        preferences: Vec<StaffId>,
        /// What they need help with
        purpose: String,
        /// What they already tried
        tried: String,
    },

    /// A staff member asked for a break.
    BreakRequested {
        /// Staff member
        staff: StaffId,
        /// Break length in minutes
        minutes: u32,
    },

    /// A staff member ended their break early.
    BreakEndRequested {
        /// Staff member
        staff: StaffId,
    },

    /// Administrative reposition of a queued student (zero-based index).
    QueuePositionOverride {
        /// Student
        student: StudentId,
        /// Target index
        position: usize,
    },

    /// The staff roster (names and timeslots) changed.
    RosterUpdated(Vec<StaffMember>),
}
