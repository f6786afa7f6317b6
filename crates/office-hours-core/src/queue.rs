//! Student waiting queue.
//!
//! An ordered, duplicate-free wait-list. Students who leave are remembered
//! for a short rejoin window together with the position they held, so a brief
//! disconnect does not cost them their place.
//!
//! Every mutation renumbers the displayed positions and returns
//! `SetQueuePosition` actions only for students whose displayed position
//! actually changed.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use crate::{
    action::Action,
    error::QueueError,
    member::{StaffId, StudentId},
    time::Timestamp,
};

/// Platform limit on nickname length, in characters.
pub const MAX_NICKNAME_CHARS: usize = 32;

/// Where a queued student is headed, if they have been matched to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    /// Matched to a room still in its grace delay; no move issued yet.
    Reserved(StaffId),
    /// A move into the room has been issued and not yet resolved.
    Dispatched(StaffId),
}

impl Heading {
    /// Owner of the target room.
    pub fn staff(self) -> StaffId {
        match self {
            Self::Reserved(staff) | Self::Dispatched(staff) => staff,
        }
    }
}

/// A student waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStudent {
    /// Student identity
    pub student: StudentId,
    /// Set while the student is matched to a room, so later allocation passes
    /// skip them.
    pub heading: Option<Heading>,
}

impl QueueStudent {
    fn new(student: StudentId) -> Self {
        Self { student, heading: None }
    }
}

/// A student removed from the queue.
#[derive(Debug)]
pub struct Departed {
    /// The removed entry, including any heading marker
    pub entry: QueueStudent,
    /// Zero-based position the student held
    pub position: usize,
    /// Display updates caused by the removal
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy)]
struct Departure {
    left_at: Timestamp,
    position: usize,
}

/// Ordered wait-list of students.
#[derive(Debug)]
pub struct StudentQueue {
    entries: VecDeque<QueueStudent>,
    departures: HashMap<StudentId, Departure>,
    /// One-based position last shown to each student
    displayed: HashMap<StudentId, usize>,
    rejoin_window: Duration,
}

impl StudentQueue {
    /// Empty queue remembering departures for `rejoin_window`.
    pub fn new(rejoin_window: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            departures: HashMap::new(),
            displayed: HashMap::new(),
            rejoin_window,
        }
    }

    /// Number of queued students.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued students in wait-list order.
    pub fn iter(&self) -> impl Iterator<Item = &QueueStudent> {
        self.entries.iter()
    }

    /// Whether `student` is queued.
    pub fn contains(&self, student: StudentId) -> bool {
        self.position(student).is_some()
    }

    /// Zero-based position of `student`.
    pub fn position(&self, student: StudentId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.student == student)
    }

    /// Queue entry for `student`.
    pub fn get(&self, student: StudentId) -> Option<&QueueStudent> {
        self.entries.iter().find(|entry| entry.student == student)
    }

    /// Mutable queue entry for `student`.
    pub fn get_mut(&mut self, student: StudentId) -> Option<&mut QueueStudent> {
        self.entries.iter_mut().find(|entry| entry.student == student)
    }

    /// Add `student` at the tail.
    pub fn append(&mut self, student: StudentId) -> Result<Vec<Action>, QueueError> {
        self.insert(self.entries.len(), student)
    }

    /// Add `student` at `index`, clamped to the queue length.
    pub fn insert(&mut self, index: usize, student: StudentId) -> Result<Vec<Action>, QueueError> {
        if self.contains(student) {
            return Err(QueueError::AlreadyQueued(student));
        }

        let index = index.min(self.entries.len());
        self.entries.insert(index, QueueStudent::new(student));
        Ok(self.renumber())
    }

    /// Remove `student`, remembering when and from where they left.
    pub fn remove(&mut self, student: StudentId, now: Timestamp) -> Result<Departed, QueueError> {
        self.position(student)
            .and_then(|position| self.depart(position, now))
            .ok_or(QueueError::NotQueued(student))
    }

    /// Remove the student at the tail.
    pub fn pop(&mut self, now: Timestamp) -> Option<Departed> {
        let last = self.entries.len().checked_sub(1)?;
        self.depart(last, now)
    }

    /// Remove the student at the head.
    pub fn pop_front(&mut self, now: Timestamp) -> Option<Departed> {
        self.depart(0, now)
    }

    /// Move a queued student to `index` (clamped) without recording a
    /// departure.
    pub fn reposition(
        &mut self,
        student: StudentId,
        index: usize,
    ) -> Result<Vec<Action>, QueueError> {
        let position = self.position(student).ok_or(QueueError::NotQueued(student))?;
        if let Some(entry) = self.entries.remove(position) {
            let index = index.min(self.entries.len());
            self.entries.insert(index, entry);
        }
        Ok(self.renumber())
    }

    /// Whether `student` left within the rejoin window.
    pub fn recently_left(&self, student: StudentId, now: Timestamp) -> bool {
        self.departures
            .get(&student)
            .is_some_and(|departure| now - departure.left_at < self.rejoin_window)
    }

    /// Zero-based position `student` held when they last left.
    pub fn recent_position(&self, student: StudentId) -> Option<usize> {
        self.departures.get(&student).map(|departure| departure.position)
    }

    fn depart(&mut self, position: usize, now: Timestamp) -> Option<Departed> {
        let entry = self.entries.remove(position)?;

        let window = self.rejoin_window;
        self.departures.retain(|_, departure| now - departure.left_at < window);
        self.departures.insert(entry.student, Departure { left_at: now, position });

        let mut actions = Vec::new();
        if self.displayed.remove(&entry.student).is_some() {
            actions.push(Action::SetQueuePosition { student: entry.student, position: None });
        }
        actions.extend(self.renumber());

        Some(Departed { entry, position, actions })
    }

    fn renumber(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let shown = index + 1;
            if self.displayed.get(&entry.student) != Some(&shown) {
                self.displayed.insert(entry.student, shown);
                actions.push(Action::SetQueuePosition {
                    student: entry.student,
                    position: Some(shown),
                });
            }
        }
        actions
    }
}

/// Parse the `(#n)` position marker out of a display name.
///
/// Used to restore queue order from nicknames after a restart.
pub fn parse_queue_position(display_name: &str) -> Option<i64> {
    let mut rest = display_name;
    while let Some(start) = rest.find("(#") {
        let tail = &rest[start + 2..];
        if let Some(end) = tail.find(')') {
            if let Ok(position) = tail[..end].parse::<i64>() {
                return Some(position);
            }
        }
        rest = tail;
    }
    None
}

/// Render a nickname with a queue position marker.
///
/// Any existing `(#n)` marker is stripped first. The base name is shortened so
/// the result fits the platform's nickname limit.
pub fn format_queue_nickname(base: &str, position: Option<usize>) -> String {
    let mut cleaned = String::with_capacity(base.len());
    let mut rest = base;
    while let Some(start) = rest.find("(#") {
        let tail = &rest[start + 2..];
        match tail.find(')') {
            Some(end) if tail[..end].parse::<i64>().is_ok() => {
                cleaned.push_str(&rest[..start]);
                rest = &tail[end + 1..];
            },
            _ => {
                cleaned.push_str(&rest[..start + 2]);
                rest = tail;
            },
        }
    }
    cleaned.push_str(rest);
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let Some(position) = position else {
        return cleaned.chars().take(MAX_NICKNAME_CHARS).collect();
    };

    let suffix = format!(" (#{position})");
    let room = MAX_NICKNAME_CHARS.saturating_sub(suffix.chars().count());
    let mut name: String = cleaned.chars().take(room).collect();
    name.push_str(&suffix);
    name
}
