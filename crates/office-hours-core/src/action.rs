//! Actions produced by the office hours state machines.
//!
//! Actions are instructions for a runtime. The core never performs I/O; it
//! returns actions and learns about their outcome through later events (for
//! example a `MoveStudent` is answered by `Event::MoveFinished`).

use crate::{
    member::{StaffId, StudentId},
    staff::StaffRecord,
    time::Timestamp,
    timer::TimerKey,
};

/// Instruction for the runtime to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move a queued student into a staff member's room.
    ///
    /// The runtime must report the outcome with `Event::MoveFinished`.
    MoveStudent {
        /// Student to move
        student: StudentId,
        /// Room owner
        staff: StaffId,
        /// Name of the destination channel
        channel: String,
    },

    /// Disconnect a student from voice.
    DisconnectStudent {
        /// Student to disconnect
        student: StudentId,
    },

    /// Disconnect a staff member from voice.
    DisconnectStaff {
        /// Staff member to disconnect
        staff: StaffId,
    },

    /// Show a student's queue position (`Some(n)` renders as `(#n)`), or clear
    /// it with `None`.
    SetQueuePosition {
        /// Student whose display changes
        student: StudentId,
        /// One-based position
        position: Option<usize>,
    },

    /// Make sure a voice channel exists for a room, reusing one with the same
    /// name if present.
    EnsureChannel {
        /// Room owner
        staff: StaffId,
        /// Channel name
        name: String,
    },

    /// Rename a room's channel.
    RenameChannel {
        /// Room owner
        staff: StaffId,
        /// New channel name
        name: String,
    },

    /// Tear down a room's channel, optionally playing a clip into it first.
    DeleteChannel {
        /// Room owner
        staff: StaffId,
        /// Clip to finish playing before the channel goes away
        farewell: Option<AudioClip>,
    },

    /// Play an audio clip in a room's channel.
    PlayAudio {
        /// Room owner
        staff: StaffId,
        /// Clip to play
        clip: AudioClip,
    },

    /// Send a direct message.
    Notify(Notice),

    /// Add or remove the on-break marker on a staff member's nickname.
    MarkOnBreak {
        /// Staff member
        staff: StaffId,
        /// Whether they are now on break
        on_break: bool,
    },

    /// Schedule a timer, replacing any pending timer with the same key.
    ScheduleTimer {
        /// Timer identity
        key: TimerKey,
        /// Wall-clock deadline; a deadline in the past fires immediately
        at: Timestamp,
    },

    /// Cancel a pending timer. Cancelling an unknown key is a no-op.
    CancelTimer {
        /// Timer identity
        key: TimerKey,
    },

    /// Persist a staff record.
    PersistStaff(StaffRecord),

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

impl Action {
    pub(crate) fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log { level, message: message.into() }
    }
}

/// Log levels for [`Action::Log`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
}

/// Audio clips played into rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioClip {
    /// One of the numbered closing announcements (1-based).
    Closing(u8),
    /// Nudge that the current student has used their allotment.
    MoveOn,
}

impl AudioClip {
    /// Relative asset path of the clip.
    pub fn asset_path(self) -> String {
        match self {
            Self::Closing(n) => format!("assets/closing{n}.mp3"),
            Self::MoveOn => "assets/move_on.mp3".to_string(),
        }
    }
}

/// Direct messages sent to students and staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A student is on their way to a staff member's room.
    IncomingStudent {
        /// Recipient
        staff: StaffId,
        /// Incoming student
        student: StudentId,
        /// Whether the student asked for this staff member by name
        requested: bool,
        /// What the student needs help with
        purpose: String,
        /// What the student already tried
        tried: String,
        /// When the move happens, if the room is still in its grace delay
        moving_at: Option<Timestamp>,
    },

    /// A student's request expired and must be resubmitted.
    MetadataExpired {
        /// Recipient
        student: StudentId,
        /// Deadline for the resubmission
        resubmit_by: Timestamp,
    },

    /// A student was removed for not refreshing their request.
    RemovedForStaleRequest {
        /// Recipient
        student: StudentId,
    },

    /// A deferred break started now that the room is empty.
    BreakStarted {
        /// Recipient
        staff: StaffId,
        /// When the break ends
        until: Timestamp,
    },

    /// A staff member's break is over.
    BreakEnded {
        /// Recipient
        staff: StaffId,
    },

    /// Staff members cannot wait in the student queue.
    QueueIsForStudents {
        /// Recipient
        staff: StaffId,
    },
}

/// Who a [`Notice`] is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// A student
    Student(StudentId),
    /// A staff member
    Staff(StaffId),
}

impl Notice {
    /// The member this notice is addressed to.
    pub fn recipient(&self) -> Recipient {
        match self {
            Self::IncomingStudent { staff, .. }
            | Self::BreakStarted { staff, .. }
            | Self::BreakEnded { staff }
            | Self::QueueIsForStudents { staff } => Recipient::Staff(*staff),
            Self::MetadataExpired { student, .. } | Self::RemovedForStaleRequest { student } => {
                Recipient::Student(*student)
            },
        }
    }
}
