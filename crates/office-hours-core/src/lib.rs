//! Office hours allocation core.
//!
//! Sans-IO state machines for running course office hours over voice rooms:
//! a position-aware waiting queue, one room per staff member, an allocation
//! pass that matches queued students to ready rooms, staff breaks and advisory
//! time pacing.
//!
//! # Architecture
//!
//! Everything here is pure logic. [`OfficeHours`] consumes [`Event`]s (voice
//! membership changes, timer expiries, staff requests) and returns
//! [`Action`]s (move a member, schedule a timer, persist a staff record) for a
//! runtime to execute. Time comes from an [`Environment`] so the same code runs
//! against the system clock in production and a virtual clock in simulation.
//!
//! # Components
//!
//! - [`StudentQueue`]: ordered wait-list with a short rejoin window
//! - [`RoomManager`]: per-staff rooms and their [`RoomState`] machine
//! - [`QueueManager`]: queue plus request metadata; owns the allocation pass
//! - [`BreakManager`]: staff breaks, immediate or deferred
//! - [`TimeControl`]: per-student time allotment and reminders
//! - [`TimeTracker`]: time spent with and without students, used for fairness
//! - [`recovery`]: rebuilds state from a membership snapshot on startup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod breaks;
pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod member;
pub mod metadata;
pub mod office_hours;
pub mod queue;
pub mod queue_manager;
pub mod recovery;
pub mod room;
pub mod staff;
pub mod time;
pub mod time_control;
pub mod timer;
pub mod tracker;

pub use action::{Action, AudioClip, LogLevel, Notice, Recipient};
pub use breaks::{BreakManager, BreakOutcome};
pub use config::OfficeHoursConfig;
pub use env::Environment;
pub use error::{BreakError, OfficeHoursError, QueueError, RoomError, TrackerError};
pub use event::Event;
pub use member::{StaffId, StaffMember, StudentId, Timeslot};
pub use metadata::{MetadataMapping, StudentMetadata};
pub use office_hours::OfficeHours;
pub use queue::{
    Departed, Heading, QueueStudent, StudentQueue, format_queue_nickname, parse_queue_position,
};
pub use queue_manager::QueueManager;
pub use recovery::{ChannelSnapshot, RecoverySnapshot, WaitingMember};
pub use room::{CloseOutcome, Occupancy, Room, RoomManager, RoomState};
pub use staff::{StaffLedger, StaffRecord};
pub use time::Timestamp;
pub use time_control::TimeControl;
pub use timer::TimerKey;
pub use tracker::TimeTracker;
