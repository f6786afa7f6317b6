//! Typed timer keys.
//!
//! Every delayed callback in the system is identified by a [`TimerKey`].
//! Scheduling a key that is already pending replaces it, so each key names at
//! most one outstanding timer. Keys order by variant first: when several
//! timers are due at the same instant, a room's grace expiry runs before a
//! reservation timeout created at that instant.

use std::fmt;

use crate::member::{StaffId, StudentId};

/// Identifier of a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKey {
    /// A room's post-student grace delay is over.
    GraceExpiry(StaffId),
    /// A staff member's break is over.
    BreakEnd(StaffId),
    /// A reserved student never reached their room.
    PreemptiveTimeout(StudentId),
    /// A student's help request has expired.
    MetadataExpiry(StudentId),
    /// A student failed to resubmit an expired request.
    MetadataRemoval(StudentId),
    /// A student has used their time allotment in a room.
    Reminder(StaffId),
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GraceExpiry(staff) => write!(f, "grace-expiry:{staff}"),
            Self::BreakEnd(staff) => write!(f, "break-end:{staff}"),
            Self::PreemptiveTimeout(student) => write!(f, "preemptive-timeout:{student}"),
            Self::MetadataExpiry(student) => write!(f, "metadata-expiry:{student}"),
            Self::MetadataRemoval(student) => write!(f, "metadata-removal:{student}"),
            Self::Reminder(staff) => write!(f, "reminder:{staff}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grace_expiry_sorts_before_reservation_timeout() {
        let grace = TimerKey::GraceExpiry(StaffId(u64::MAX));
        let timeout = TimerKey::PreemptiveTimeout(StudentId(0));
        assert!(grace < timeout);
    }
}
