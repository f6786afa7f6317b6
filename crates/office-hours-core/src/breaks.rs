//! Staff breaks.
//!
//! A staff member is either on break until a timestamp, or waiting for their
//! current student to leave before a break of a requested length starts.
//! Both states live on the persisted [`crate::StaffRecord`], so a restart
//! resumes them (see [`OfficeHours::load_breaks`]).

use std::time::Duration;

use crate::{
    action::{Action, LogLevel, Notice},
    env::Environment,
    error::BreakError,
    member::StaffId,
    office_hours::OfficeHours,
    room::RoomState,
    time::Timestamp,
    timer::TimerKey,
};

/// Result of a break request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOutcome {
    /// The break started right away.
    Started {
        /// When it ends
        until: Timestamp,
    },
    /// A student is present; the break starts once they leave.
    Deferred {
        /// Requested length in minutes
        minutes: u32,
    },
}

/// Break operations over an [`OfficeHours`].
pub struct BreakManager<'a, E: Environment> {
    hours: &'a mut OfficeHours<E>,
}

impl<E: Environment> BreakManager<'_, E> {
    /// Put `staff` on break until `until`.
    pub fn start_break(&mut self, staff: StaffId, until: Timestamp) -> Vec<Action> {
        self.hours.start_break(staff, until)
    }

    /// Break for `minutes` once the current student leaves.
    pub fn desire_break(&mut self, staff: StaffId, minutes: u32) -> Vec<Action> {
        self.hours.desire_break(staff, minutes)
    }

    /// End `staff`'s break. A no-op if the break already ended.
    pub fn end_break(&mut self, staff: StaffId) -> Vec<Action> {
        self.hours.end_break(staff)
    }

    /// Validate and start or defer a break.
    pub fn request_break(
        &mut self,
        staff: StaffId,
        minutes: u32,
    ) -> Result<(BreakOutcome, Vec<Action>), BreakError> {
        self.hours.request_break(staff, minutes)
    }
}

impl<E: Environment> OfficeHours<E> {
    /// Break operations.
    pub fn breaks(&mut self) -> BreakManager<'_, E> {
        BreakManager { hours: self }
    }

    /// Put `staff` on break until `until`: the room closes and a `BreakEnd`
    /// timer is armed.
    pub fn start_break(&mut self, staff: StaffId, until: Timestamp) -> Vec<Action> {
        let name = self.roster.get(&staff).map(|member| member.name.clone()).unwrap_or_default();
        let record = self.ledger.entry(staff, &name);
        record.breaking_until = Some(until);
        record.desiring_break = None;

        let _ = self.rooms.update_state(staff, RoomState::Closed);

        let mut actions: Vec<Action> = self.ledger.persist(staff).into_iter().collect();
        actions.push(Action::MarkOnBreak { staff, on_break: true });
        actions.push(Action::ScheduleTimer { key: TimerKey::BreakEnd(staff), at: until });
        actions.push(Action::log(
            LogLevel::Info,
            format!("staff {staff} on break until {until}"),
        ));
        actions
    }

    /// Record a deferred break. If the room is already empty of students the
    /// break starts immediately.
    pub fn desire_break(&mut self, staff: StaffId, minutes: u32) -> Vec<Action> {
        if self.occupancy(staff).students == 0 {
            return self.convert_desired_break(staff, minutes);
        }

        let name = self.roster.get(&staff).map(|member| member.name.clone()).unwrap_or_default();
        self.ledger.entry(staff, &name).desiring_break = Some(minutes);
        self.ledger.persist(staff).into_iter().collect()
    }

    /// End `staff`'s break, reopen the room and allocate.
    ///
    /// Re-checks the persisted break first: two triggers (timer and manual
    /// end) may both arrive, and only the first has any effect.
    pub fn end_break(&mut self, staff: StaffId) -> Vec<Action> {
        let Some(record) = self.ledger.get_mut(staff) else {
            return Vec::new();
        };
        if record.breaking_until.take().is_none() {
            return vec![Action::log(
                LogLevel::Debug,
                format!("break for staff {staff} already ended"),
            )];
        }

        let mut actions: Vec<Action> = self.ledger.persist(staff).into_iter().collect();
        actions.push(Action::MarkOnBreak { staff, on_break: false });
        actions.push(Action::CancelTimer { key: TimerKey::BreakEnd(staff) });
        actions.push(Action::Notify(Notice::BreakEnded { staff }));

        let state = self.resting_state(staff);
        if self.rooms.update_state(staff, state).is_ok() {
            actions.extend(self.allocate());
        }
        actions
    }

    /// Handle a staff member asking for a break of `minutes`.
    pub fn request_break(
        &mut self,
        staff: StaffId,
        minutes: u32,
    ) -> Result<(BreakOutcome, Vec<Action>), BreakError> {
        let now = self.now();
        let occupancy = self.occupancy(staff);
        let room = self.rooms.get_room(staff).ok_or(BreakError::NotHosting(staff))?;

        if !occupancy.staff_present {
            return Err(BreakError::NotHosting(staff));
        }
        if self.ledger.desiring_break(staff).is_some() {
            return Err(BreakError::AlreadyDesiring(staff));
        }
        if room.is_closing(now) {
            return Err(BreakError::RoomClosing(staff));
        }

        if occupancy.students > 0 {
            let actions = self.desire_break(staff, minutes);
            return Ok((BreakOutcome::Deferred { minutes }, actions));
        }

        let until = now + minutes_to_duration(minutes);
        Ok((BreakOutcome::Started { until }, self.start_break(staff, until)))
    }

    /// Resume persisted break state after a restart.
    ///
    /// Future breaks are re-armed, breaks that ended while the process was
    /// down are ended, and deferred breaks are re-requested.
    pub fn load_breaks(&mut self) -> Vec<Action> {
        let now = self.now();
        let pending: Vec<(StaffId, Option<Timestamp>, Option<u32>)> = self
            .ledger
            .iter()
            .map(|record| (record.id, record.breaking_until, record.desiring_break))
            .collect();

        let mut actions = Vec::new();
        for (staff, breaking_until, desiring) in pending {
            match (breaking_until, desiring) {
                (Some(until), _) if until > now => actions.extend(self.start_break(staff, until)),
                (Some(_), _) => actions.extend(self.end_break(staff)),
                (None, Some(minutes)) => actions.extend(self.desire_break(staff, minutes)),
                (None, None) => {},
            }
        }
        actions
    }

    /// The room emptied while a break was pending: start it now.
    pub(crate) fn convert_desired_break(&mut self, staff: StaffId, minutes: u32) -> Vec<Action> {
        let until = self.now() + minutes_to_duration(minutes);
        let mut actions = self.start_break(staff, until);
        actions.push(Action::Notify(Notice::BreakStarted { staff, until }));
        actions
    }
}

fn minutes_to_duration(minutes: u32) -> Duration {
    Duration::from_secs(u64::from(minutes) * 60)
}
