//! Office hours driver.
//!
//! [`OfficeHours`] owns every piece of office hours state: roster, staff
//! ledger, rooms, queue, pacing and time tracking. It is constructed once at
//! startup (directly or through [`OfficeHours::recover`]) and driven by a
//! single writer through [`OfficeHours::process_event`].

use std::collections::BTreeMap;

use crate::{
    action::{Action, AudioClip, LogLevel, Notice},
    config::OfficeHoursConfig,
    env::Environment,
    error::{OfficeHoursError, QueueError, RoomError},
    event::Event,
    member::{StaffId, StaffMember, StudentId, Timeslot},
    queue::Heading,
    queue_manager::QueueManager,
    room::{CloseOutcome, Occupancy, RoomManager, RoomState},
    staff::StaffLedger,
    time::Timestamp,
    time_control::TimeControl,
    timer::TimerKey,
    tracker::TimeTracker,
};

/// Action-based office hours state machine.
pub struct OfficeHours<E: Environment> {
    pub(crate) env: E,
    pub(crate) config: OfficeHoursConfig,
    pub(crate) roster: BTreeMap<StaffId, StaffMember>,
    pub(crate) ledger: StaffLedger,
    pub(crate) rooms: RoomManager,
    pub(crate) queue: QueueManager,
    pub(crate) time_control: TimeControl,
    pub(crate) tracker: TimeTracker,
    /// Who is in each staff member's channel, whether or not a room is open
    pub(crate) occupancy: BTreeMap<StaffId, Occupancy>,
}

impl<E: Environment> std::fmt::Debug for OfficeHours<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficeHours")
            .field("rooms", &self.rooms.len())
            .field("queued", &self.queue.queue().len())
            .field("roster", &self.roster.len())
            .finish_non_exhaustive()
    }
}

impl<E: Environment> OfficeHours<E> {
    /// Empty office hours: no roster, no rooms, nobody queued.
    pub fn new(env: E, config: OfficeHoursConfig) -> Self {
        Self {
            queue: QueueManager::new(&config),
            time_control: TimeControl::new(config.min_allotment),
            env,
            config,
            roster: BTreeMap::new(),
            ledger: StaffLedger::new(),
            rooms: RoomManager::new(),
            tracker: TimeTracker::new(),
            occupancy: BTreeMap::new(),
        }
    }

    /// Environment (time, RNG)
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Configuration
    pub fn config(&self) -> &OfficeHoursConfig {
        &self.config
    }

    /// Room manager
    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    /// Queue manager
    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    /// Staff ledger
    pub fn ledger(&self) -> &StaffLedger {
        &self.ledger
    }

    /// Time pacing
    pub fn time_control(&self) -> &TimeControl {
        &self.time_control
    }

    /// Roster entry for `staff`.
    pub fn staff_member(&self, staff: StaffId) -> Option<&StaffMember> {
        self.roster.get(&staff)
    }

    /// Who is in `staff`'s channel.
    pub fn occupancy(&self, staff: StaffId) -> Occupancy {
        self.occupancy.get(&staff).copied().unwrap_or_default()
    }

    /// Replace the roster. Every rostered staff member gets a ledger record.
    pub fn set_roster(&mut self, roster: impl IntoIterator<Item = StaffMember>) -> Vec<Action> {
        self.roster = roster.into_iter().map(|member| (member.id, member)).collect();

        let mut actions = Vec::new();
        for member in self.roster.values() {
            if self.ledger.get(member.id).is_none() {
                self.ledger.entry(member.id, &member.name);
                actions.extend(self.ledger.persist(member.id));
            }
        }
        actions
    }

    /// Process an event and return actions to execute.
    ///
    /// This is the main entry point for the office hours state machine.
    pub fn process_event(&mut self, event: Event) -> Result<Vec<Action>, OfficeHoursError> {
        match event {
            Event::Tick => Ok(self.handle_tick()),
            Event::StaffEnteredVoice { staff, own_room } => {
                Ok(self.handle_staff_entered(staff, own_room))
            },
            Event::StaffLeftVoice { staff } => Ok(self.handle_staff_left(staff)),
            Event::StaffJoinedQueue { staff } => Ok(vec![
                Action::DisconnectStaff { staff },
                Action::Notify(Notice::QueueIsForStudents { staff }),
            ]),
            Event::StudentJoinedQueue { student } => self.add_student(student),
            Event::StudentLeftQueue { student } => self.remove_student(student),
            Event::StudentEnteredRoom { student, staff } => {
                Ok(self.handle_student_entered_room(student, staff))
            },
            Event::StudentLeftRoom { student, staff } => {
                Ok(self.handle_student_left_room(student, staff))
            },
            Event::MoveFinished { student, staff, moved } => {
                Ok(self.handle_move_finished(student, staff, moved))
            },
            Event::TimerFired(key) => Ok(self.handle_timer(key)),
            Event::MetadataSubmitted { student, preferences, purpose, tried } => {
                Ok(self.set_student_metadata(student, preferences, purpose, tried))
            },
            Event::BreakRequested { staff, minutes } => {
                let (_, actions) = self.request_break(staff, minutes)?;
                Ok(actions)
            },
            Event::BreakEndRequested { staff } => {
                if self.ledger.breaking_until(staff).is_none() {
                    return Err(crate::error::BreakError::NotOnBreak(staff).into());
                }
                Ok(self.end_break(staff))
            },
            Event::QueuePositionOverride { student, position } => {
                Ok(self.move_student_position(student, position)?)
            },
            Event::RosterUpdated(roster) => Ok(self.set_roster(roster)),
        }
    }

    /// Add a student to the queue and run an allocation pass.
    pub fn add_student(&mut self, student: StudentId) -> Result<Vec<Action>, OfficeHoursError> {
        let now = self.env.now();
        let mut actions = self.queue.add_student(student, now)?;

        let allotment = self.allotment();
        actions.extend(self.time_control.recalculate(allotment));
        actions.extend(self.allocate());
        Ok(actions)
    }

    /// Remove a student from the queue.
    ///
    /// A reservation the student held is released and the freed room is
    /// offered to the rest of the queue.
    pub fn remove_student(&mut self, student: StudentId) -> Result<Vec<Action>, OfficeHoursError> {
        let now = self.env.now();
        let departed = self.queue.remove_student(student, now)?;
        let mut actions = departed.actions;

        if let Some(Heading::Reserved(staff)) = departed.entry.heading {
            actions.extend(self.release_reservation(student, staff));
        }
        actions.extend(self.allocate());
        Ok(actions)
    }

    /// Move a queued student to `index` (administrative reorder).
    pub fn move_student_position(
        &mut self,
        student: StudentId,
        index: usize,
    ) -> Result<Vec<Action>, QueueError> {
        self.queue.move_student_position(student, index)
    }

    /// Store a student's request and run an allocation pass, since new
    /// preferences may now match an open room.
    pub fn set_student_metadata(
        &mut self,
        student: StudentId,
        preferences: Vec<StaffId>,
        purpose: String,
        tried: String,
    ) -> Vec<Action> {
        let now = self.env.now();
        let mut actions =
            self.queue.set_student_metadata(student, preferences, purpose, tried, now);
        actions.extend(self.allocate());
        actions
    }

    /// Run one allocation pass.
    pub fn allocate(&mut self) -> Vec<Action> {
        let now = self.env.now();
        self.queue.allocate(&mut self.rooms, &self.ledger, now)
    }

    /// Open a room for `staff` during `timeslot`, then allocate.
    ///
    /// Returns no actions if the room already exists.
    pub fn open_room(
        &mut self,
        staff: StaffId,
        timeslot: Timeslot,
    ) -> Result<Vec<Action>, OfficeHoursError> {
        let member = self.roster.get(&staff).ok_or(RoomError::UnknownStaff(staff))?;
        let occupancy = self.occupancy(staff);
        let on_break = self.ledger.breaking_until(staff).is_some();

        let (_, mut actions) = self.rooms.open_room(member, timeslot, occupancy, on_break);
        if !actions.is_empty() {
            actions.extend(self.allocate());
        }
        Ok(actions)
    }

    /// Close `staff`'s room, or mark it closing while people remain inside.
    pub fn close_room(&mut self, staff: StaffId) -> Vec<Action> {
        let clip = self.closing_clip();
        let occupancy = self.occupancy(staff);
        let (outcome, mut actions) = self.rooms.close_room(staff, occupancy, clip);

        if let CloseOutcome::Removed(Some(room)) = outcome {
            actions.push(Action::log(LogLevel::Info, format!("closed room for staff {staff}")));
            if let Some(student) = room.incoming {
                if self.queue.heading(student).is_some_and(|h| h.staff() == staff) {
                    self.queue.set_heading(student, None);
                    actions.push(Action::CancelTimer { key: TimerKey::PreemptiveTimeout(student) });
                }
            }
            actions.extend(self.time_control.forget(staff));
            actions.extend(self.allocate());
        }
        actions
    }

    /// Set the state of `staff`'s room.
    pub fn update_state(&mut self, staff: StaffId, state: RoomState) -> Result<(), RoomError> {
        self.rooms.update_state(staff, state)
    }

    /// Start `staff`'s grace delay and run an allocation pass, which may
    /// reserve the room for the next student.
    pub fn finish_delay(&mut self, staff: StaffId) -> Result<Vec<Action>, RoomError> {
        let now = self.env.now();
        let mut actions = self.rooms.finish_delay(staff, now, self.config.grace_delay)?;
        actions.extend(self.allocate());
        Ok(actions)
    }

    /// State a room settles into when nothing else is going on.
    pub(crate) fn resting_state(&self, staff: StaffId) -> RoomState {
        if self.ledger.breaking_until(staff).is_some() {
            return RoomState::Closed;
        }
        RoomState::from_occupancy(self.occupancy(staff))
    }

    pub(crate) fn allotment(&self) -> std::time::Duration {
        self.time_control.allotted_time(self.queue.queue().len(), self.rooms.len())
    }

    fn closing_clip(&self) -> AudioClip {
        let clips = u64::from(self.config.closing_clips.max(1));
        AudioClip::Closing((self.env.random_u64() % clips) as u8 + 1)
    }

    fn occupancy_mut(&mut self, staff: StaffId) -> &mut Occupancy {
        self.occupancy.entry(staff).or_default()
    }

    fn handle_tick(&mut self) -> Vec<Action> {
        let now = self.env.now();
        let mut actions = Vec::new();

        let schedule: Vec<(StaffId, Option<Timeslot>)> = self
            .roster
            .values()
            .map(|member| (member.id, member.active_timeslot(now).cloned()))
            .collect();

        for (staff, active) in schedule {
            let current = self.rooms.get_room(staff).map(|room| room.timeslot.clone());
            match (active, current) {
                (Some(slot), None) => match self.open_room(staff, slot) {
                    Ok(opened) => actions.extend(opened),
                    Err(e) => actions.push(Action::log(LogLevel::Warn, e.to_string())),
                },
                (Some(slot), Some(current)) if slot != current => {
                    // back-to-back timeslots keep the same room
                    if let Some(room) = self.rooms.get_room_mut(staff) {
                        room.timeslot = slot;
                        room.closing_announced = false;
                    }
                    actions.extend(self.allocate());
                },
                (None, Some(_)) => actions.extend(self.close_room(staff)),
                _ => {},
            }
        }
        actions
    }

    fn handle_staff_entered(&mut self, staff: StaffId, own_room: bool) -> Vec<Action> {
        if !own_room {
            let mut actions = Vec::new();
            if self.occupancy(staff).staff_present {
                actions.extend(self.handle_staff_left(staff));
            }
            actions.push(Action::log(
                LogLevel::Info,
                format!("staff {staff} joined a channel other than their room"),
            ));
            return actions;
        }

        if self.occupancy(staff).staff_present {
            return vec![Action::log(
                LogLevel::Debug,
                format!("staff {staff} already in their room"),
            )];
        }

        let now = self.env.now();
        let occupancy = {
            let occupancy = self.occupancy_mut(staff);
            occupancy.staff_present = true;
            *occupancy
        };

        let mut actions = Vec::new();
        if let Err(e) = self.tracker.start_tracking(staff, occupancy.students > 0, now) {
            actions.push(Action::log(LogLevel::Debug, e.to_string()));
        }

        if self.rooms.get_room(staff).is_some() {
            let state = self.resting_state(staff);
            let _ = self.rooms.update_state(staff, state);
            if state == RoomState::Open {
                actions.extend(self.allocate());
            }
        }
        actions
    }

    fn handle_staff_left(&mut self, staff: StaffId) -> Vec<Action> {
        let now = self.env.now();
        self.occupancy_mut(staff).staff_present = false;

        let mut actions = Vec::new();
        match self.tracker.stop_tracking(staff, now, &mut self.ledger) {
            Ok(persist) => actions.extend(persist),
            Err(e) => actions.push(Action::log(LogLevel::Debug, e.to_string())),
        }

        let Some(room) = self.rooms.get_room(staff) else {
            return actions;
        };
        let closing = room.is_closing(now);
        let _ = self.rooms.update_state(staff, RoomState::Inaccessible);

        if closing && self.occupancy(staff).students == 0 {
            actions.extend(self.close_room(staff));
        }
        actions
    }

    fn handle_student_entered_room(&mut self, student: StudentId, staff: StaffId) -> Vec<Action> {
        let now = self.env.now();
        let students = {
            let occupancy = self.occupancy_mut(staff);
            occupancy.students += 1;
            occupancy.students
        };

        let mut actions = Vec::new();
        if let Some(room) = self.rooms.get_room_mut(staff) {
            room.state = RoomState::Closed;
            if room.incoming == Some(student) {
                room.incoming = None;
            }
        }
        if students == 1 {
            actions.extend(self.tracker.student_joined(staff, now, &mut self.ledger));
        }
        let allotment = self.allotment();
        actions.extend(self.time_control.on_student_join(staff, students, now, allotment));
        actions
    }

    fn handle_student_left_room(&mut self, student: StudentId, staff: StaffId) -> Vec<Action> {
        let now = self.env.now();
        let occupancy = {
            let occupancy = self.occupancy_mut(staff);
            occupancy.students = occupancy.students.saturating_sub(1);
            *occupancy
        };

        let mut actions = Vec::new();
        if occupancy.students == 0 {
            actions.extend(self.tracker.student_left(staff, now, &mut self.ledger));
        }
        actions.extend(self.time_control.on_student_leave(staff, occupancy.students));

        let Some(room) = self.rooms.get_room(staff) else {
            actions.push(Action::log(
                LogLevel::Debug,
                format!("student {student} left staff {staff}'s channel, which has no room"),
            ));
            return actions;
        };

        if room.is_closing(now) {
            if occupancy.total() <= 1 {
                actions.extend(self.close_room(staff));
            }
            return actions;
        }
        if occupancy.students > 0 || !occupancy.staff_present {
            return actions;
        }
        // a student who was already on their way when the break started
        if self.ledger.breaking_until(staff).is_some() {
            return actions;
        }

        if let Some(minutes) = self.ledger.desiring_break(staff) {
            actions.extend(self.convert_desired_break(staff, minutes));
            return actions;
        }

        match self.finish_delay(staff) {
            Ok(delay) => actions.extend(delay),
            Err(e) => actions.push(Action::log(LogLevel::Warn, e.to_string())),
        }
        actions
    }

    fn handle_move_finished(
        &mut self,
        student: StudentId,
        staff: StaffId,
        moved: bool,
    ) -> Vec<Action> {
        let mut actions = Vec::new();

        if moved {
            // voice events may have overtaken the report; the room has moved on
            match self.rooms.get_room_mut(staff) {
                Some(room) if room.incoming == Some(student) => {
                    room.incoming = None;
                    room.state = RoomState::Closed;
                },
                _ => actions.push(Action::log(
                    LogLevel::Debug,
                    format!("stale move report for student {student} in staff {staff}'s room"),
                )),
            }
            return actions;
        }

        actions.push(Action::log(
            LogLevel::Warn,
            format!(
                "failed to move student {student} to staff {staff}'s room, \
                 they must have left voice"
            ),
        ));
        if self.queue.heading(student) == Some(Heading::Dispatched(staff)) {
            self.queue.set_heading(student, None);
        }
        let resting = self.resting_state(staff);
        if let Some(room) = self.rooms.get_room_mut(staff) {
            if room.incoming == Some(student) {
                room.incoming = None;
                room.state = resting;
            }
        }
        actions.extend(self.allocate());
        actions
    }

    fn handle_timer(&mut self, key: TimerKey) -> Vec<Action> {
        match key {
            TimerKey::GraceExpiry(staff) => self.handle_grace_expiry(staff),
            TimerKey::BreakEnd(staff) => self.end_break(staff),
            TimerKey::PreemptiveTimeout(student) => self.handle_reservation_timeout(student),
            TimerKey::MetadataExpiry(student) => self.handle_metadata_expiry(student),
            TimerKey::MetadataRemoval(student) => self.handle_metadata_removal(student),
            TimerKey::Reminder(staff) => {
                if self.occupancy(staff).students > 0 {
                    vec![Action::PlayAudio { staff, clip: AudioClip::MoveOn }]
                } else {
                    Vec::new()
                }
            },
        }
    }

    fn handle_grace_expiry(&mut self, staff: StaffId) -> Vec<Action> {
        let students = self.occupancy(staff).students;
        let resting = self.resting_state(staff);
        let Some(room) = self.rooms.get_room_mut(staff) else {
            return Vec::new();
        };
        room.grace_ends_at = None;

        match room.state {
            RoomState::OpeningSoon => {
                room.state = RoomState::Open;
                self.allocate()
            },
            RoomState::StudentReservedOpeningSoon => {
                let reserved = room.incoming.filter(|student| {
                    self.queue.heading(*student) == Some(Heading::Reserved(staff))
                });
                match reserved {
                    Some(student) if students == 0 => {
                        room.state = RoomState::Open;
                        let channel = room.channel.clone();
                        self.queue.set_heading(student, Some(Heading::Dispatched(staff)));
                        vec![
                            Action::CancelTimer { key: TimerKey::PreemptiveTimeout(student) },
                            Action::MoveStudent { student, staff, channel },
                        ]
                    },
                    _ => {
                        room.incoming = None;
                        room.state = resting;
                        let mut actions = Vec::new();
                        if let Some(student) = reserved {
                            self.queue.set_heading(student, None);
                            actions.push(Action::CancelTimer {
                                key: TimerKey::PreemptiveTimeout(student),
                            });
                        }
                        actions.extend(self.allocate());
                        actions
                    },
                }
            },
            _ => {
                // closed underneath the reservation (break, staff left)
                match room.incoming {
                    Some(student)
                        if self.queue.heading(student) == Some(Heading::Reserved(staff)) =>
                    {
                        room.incoming = None;
                        self.queue.set_heading(student, None);
                        let mut actions =
                            vec![Action::CancelTimer { key: TimerKey::PreemptiveTimeout(student) }];
                        actions.extend(self.allocate());
                        actions
                    },
                    _ => Vec::new(),
                }
            },
        }
    }

    fn handle_reservation_timeout(&mut self, student: StudentId) -> Vec<Action> {
        let Some(Heading::Reserved(staff)) = self.queue.heading(student) else {
            return Vec::new();
        };
        self.queue.set_heading(student, None);

        let mut actions = vec![Action::log(
            LogLevel::Info,
            format!("reservation of student {student} for staff {staff} timed out"),
        )];
        actions.extend(self.release_reservation(student, staff));
        actions.extend(self.allocate());
        actions
    }

    /// Undo a reservation held by `student` on `staff`'s room.
    fn release_reservation(&mut self, student: StudentId, staff: StaffId) -> Vec<Action> {
        let resting = self.resting_state(staff);
        if let Some(room) = self.rooms.get_room_mut(staff) {
            if room.incoming == Some(student) {
                room.incoming = None;
                if room.state == RoomState::StudentReservedOpeningSoon {
                    room.state = if room.grace_ends_at.is_some() {
                        RoomState::OpeningSoon
                    } else {
                        resting
                    };
                }
            }
        }
        vec![Action::CancelTimer { key: TimerKey::PreemptiveTimeout(student) }]
    }

    fn handle_metadata_expiry(&mut self, student: StudentId) -> Vec<Action> {
        let now = self.env.now();
        if !self.queue.queue().contains(student) {
            return self.queue.remove_student_metadata(student);
        }
        let expired = self.queue.metadata().get(student).is_some_and(|meta| meta.is_expired(now));
        if !expired {
            return Vec::new();
        }

        let resubmit_by = now + self.config.resubmit_window;
        vec![
            Action::Notify(Notice::MetadataExpired { student, resubmit_by }),
            Action::ScheduleTimer { key: TimerKey::MetadataRemoval(student), at: resubmit_by },
        ]
    }

    fn handle_metadata_removal(&mut self, student: StudentId) -> Vec<Action> {
        let now = self.env.now();
        let stale = self.queue.queue().contains(student)
            && self.queue.metadata().get(student).is_some_and(|meta| meta.is_expired(now));
        if !stale {
            return Vec::new();
        }
        vec![
            Action::DisconnectStudent { student },
            Action::Notify(Notice::RemovedForStaleRequest { student }),
        ]
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.env.now()
    }
}
