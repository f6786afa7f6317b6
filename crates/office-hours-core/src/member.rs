//! Identities and schedule data for the people taking part in office hours.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Chat-platform identity of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

/// Chat-platform identity of a staff member. Each staff member owns at most
/// one room, so this also identifies rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scheduled block of office hours for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeslot {
    /// When the room should open.
    pub starts_at: Timestamp,
    /// When the room stops accepting students.
    pub ends_at: Timestamp,
    /// Physical location for in-person hours, if any.
    #[serde(default)]
    pub location: Option<String>,
}

impl Timeslot {
    /// Online timeslot covering `[starts_at, ends_at)`.
    pub fn new(starts_at: Timestamp, ends_at: Timestamp) -> Self {
        Self { starts_at, ends_at, location: None }
    }

    /// Attach a physical location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Whether `now` falls inside the timeslot.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.starts_at <= now && now < self.ends_at
    }

    /// Whether the timeslot is over.
    pub fn has_ended(&self, now: Timestamp) -> bool {
        now >= self.ends_at
    }
}

/// Roster entry for a staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    /// Platform identity
    pub id: StaffId,
    /// Display name, also the name of their voice channel
    pub name: String,
    /// Scheduled hours
    #[serde(default)]
    pub timeslots: Vec<Timeslot>,
}

impl StaffMember {
    /// Staff member with no scheduled hours.
    pub fn new(id: StaffId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), timeslots: Vec::new() }
    }

    /// Add a scheduled timeslot.
    #[must_use]
    pub fn with_timeslot(mut self, timeslot: Timeslot) -> Self {
        self.timeslots.push(timeslot);
        self
    }

    /// The timeslot covering `now`, if any.
    pub fn active_timeslot(&self, now: Timestamp) -> Option<&Timeslot> {
        self.timeslots.iter().find(|slot| slot.is_active(now))
    }

    /// Voice channel name for a timeslot.
    ///
    /// Online hours use the staff member's name. In-person hours use
    /// `"First L. (location)"` so students can tell where to go.
    pub fn channel_name(&self, timeslot: &Timeslot) -> String {
        let Some(location) = &timeslot.location else {
            return self.name.clone();
        };

        let mut parts = self.name.split_whitespace();
        match (parts.next(), parts.next().and_then(|last| last.chars().next())) {
            (Some(first), Some(initial)) => format!("{first} {initial}. ({location})"),
            _ => format!("{} ({location})", self.name),
        }
    }
}
