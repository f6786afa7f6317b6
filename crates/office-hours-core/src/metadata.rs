//! Per-student help request details.
//!
//! Requests expire so stale entries do not hold a place in the queue forever.
//! Setting a request (re)arms its expiry timer and cancels any pending
//! removal from an earlier expiry.

use std::{collections::HashMap, time::Duration};

use crate::{
    action::Action,
    member::{StaffId, StudentId},
    time::Timestamp,
    timer::TimerKey,
};

/// What a student submitted when asking for help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentMetadata {
    /// Student
    pub student: StudentId,
    /// Staff members the student wants; empty matches anyone
    pub preferences: Vec<StaffId>,
    /// What they need help with
    pub purpose: String,
    /// What they already tried
    pub tried: String,
    /// When the request goes stale
    pub expires_at: Timestamp,
}

impl StudentMetadata {
    /// Whether the student may be placed with `staff`.
    pub fn accepts(&self, staff: StaffId) -> bool {
        self.preferences.is_empty() || self.preferences.contains(&staff)
    }

    /// Whether the student asked for `staff` by name.
    pub fn requested(&self, staff: StaffId) -> bool {
        self.preferences.contains(&staff)
    }

    /// Whether the request is stale at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Request details keyed by student.
#[derive(Debug)]
pub struct MetadataMapping {
    entries: HashMap<StudentId, StudentMetadata>,
    ttl: Duration,
}

impl MetadataMapping {
    /// Empty mapping whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self { entries: HashMap::new(), ttl }
    }

    /// Request details for `student`.
    pub fn get(&self, student: StudentId) -> Option<&StudentMetadata> {
        self.entries.get(&student)
    }

    /// Whether `student` may be placed with `staff`. Students without a
    /// request match anyone.
    pub fn accepts(&self, student: StudentId, staff: StaffId) -> bool {
        self.entries.get(&student).is_none_or(|meta| meta.accepts(staff))
    }

    /// Store or replace the request for `student`.
    pub fn set(
        &mut self,
        student: StudentId,
        preferences: Vec<StaffId>,
        purpose: String,
        tried: String,
        now: Timestamp,
    ) -> Vec<Action> {
        let expires_at = now + self.ttl;
        self.entries
            .insert(student, StudentMetadata { student, preferences, purpose, tried, expires_at });

        vec![
            Action::CancelTimer { key: TimerKey::MetadataRemoval(student) },
            Action::ScheduleTimer { key: TimerKey::MetadataExpiry(student), at: expires_at },
        ]
    }

    /// Drop the request for `student` and cancel its timers.
    pub fn remove(&mut self, student: StudentId) -> Vec<Action> {
        if self.entries.remove(&student).is_none() {
            return Vec::new();
        }
        vec![
            Action::CancelTimer { key: TimerKey::MetadataExpiry(student) },
            Action::CancelTimer { key: TimerKey::MetadataRemoval(student) },
        ]
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no requests are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
