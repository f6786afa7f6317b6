//! Simulated chat platform around an [`OfficeHours`] state machine.
//!
//! [`SimWorld`] executes every [`Action`] the state machine returns the way
//! the live platform would, and turns the consequences (members moving,
//! channels disappearing, timers firing) back into [`Event`]s. Follow-up
//! events are queued and processed in order, so one call never recurses.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    time::Duration,
};

use office_hours_core::{
    Action, AudioClip, ChannelSnapshot, Environment, Event, LogLevel, Notice, OfficeHours,
    OfficeHoursConfig, OfficeHoursError, RecoverySnapshot, StaffId, StaffMember, StaffRecord,
    StudentId, TimerKey, Timestamp, WaitingMember, format_queue_nickname,
};

use crate::{invariants::SystemSnapshot, sim_env::SimEnv};

/// Where simulated clocks start: a day past the epoch, so timeslots can
/// start "earlier" without underflowing.
pub const SIM_START: Timestamp = Timestamp::from_secs(86_400);

/// When a successful move is reported, relative to the voice events it
/// causes. The live gateway gives no ordering between the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, arbitrary::Arbitrary)]
pub enum ReportOrder {
    /// Report first, then the student leaves the queue and enters the room.
    #[default]
    BeforeVoice,
    /// Voice events first, then the report.
    AfterVoice,
    /// Voice events first; reports wait for [`SimWorld::release_reports`].
    Held,
}

/// A staff member's voice channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    /// Current channel name.
    pub name: String,
    /// Whether the owner is inside.
    pub staff_present: bool,
    /// Students inside.
    pub students: BTreeSet<StudentId>,
}

/// Deterministic office hours world.
pub struct SimWorld {
    env: SimEnv,
    config: OfficeHoursConfig,
    hours: OfficeHours<SimEnv>,
    roster: Vec<StaffMember>,

    inbox: VecDeque<Event>,
    timers: BTreeSet<(Timestamp, TimerKey)>,
    armed: HashMap<TimerKey, Timestamp>,

    waiting: BTreeSet<StudentId>,
    channels: BTreeMap<StaffId, Channel>,
    positions: HashMap<StudentId, usize>,
    on_break: BTreeSet<StaffId>,
    records: BTreeMap<StaffId, StaffRecord>,

    pending_moves: VecDeque<(StudentId, StaffId)>,
    auto_move: bool,
    report_order: ReportOrder,
    held_reports: VecDeque<Event>,

    actions: Vec<Action>,
    moves: Vec<(StudentId, StaffId)>,
    notices: Vec<Notice>,
    audio: Vec<(StaffId, AudioClip)>,
    errors: Vec<OfficeHoursError>,
}

impl SimWorld {
    /// World with default configuration.
    pub fn new(seed: u64, roster: Vec<StaffMember>) -> Self {
        Self::with_config(seed, roster, OfficeHoursConfig::default())
    }

    /// World with a custom configuration.
    ///
    /// The roster is loaded and one tick runs, so rooms whose timeslot is
    /// active exist straight away.
    pub fn with_config(seed: u64, roster: Vec<StaffMember>, config: OfficeHoursConfig) -> Self {
        let env = SimEnv::starting_at(seed, SIM_START);
        let hours = OfficeHours::new(env.clone(), config.clone());
        let mut world = Self::assemble(env, config, hours, roster.clone());

        let actions = world.hours.set_roster(roster);
        world.execute_all(actions);
        world.tick();
        world
    }

    fn assemble(
        env: SimEnv,
        config: OfficeHoursConfig,
        hours: OfficeHours<SimEnv>,
        roster: Vec<StaffMember>,
    ) -> Self {
        Self {
            env,
            config,
            hours,
            roster,
            inbox: VecDeque::new(),
            timers: BTreeSet::new(),
            armed: HashMap::new(),
            waiting: BTreeSet::new(),
            channels: BTreeMap::new(),
            positions: HashMap::new(),
            on_break: BTreeSet::new(),
            records: BTreeMap::new(),
            pending_moves: VecDeque::new(),
            auto_move: true,
            report_order: ReportOrder::default(),
            held_reports: VecDeque::new(),
            actions: Vec::new(),
            moves: Vec::new(),
            notices: Vec::new(),
            audio: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Simulate a process restart.
    ///
    /// Everything the platform and the store hold survives: channels,
    /// waiting members with their nicknames, staff records. Queue, rooms and
    /// timers are rebuilt through recovery. Held move reports die with the
    /// process.
    pub fn restart(self) -> Self {
        let snapshot = RecoverySnapshot {
            roster: self.roster.clone(),
            records: self.records.values().cloned().collect(),
            channels: self
                .channels
                .iter()
                .map(|(staff, channel)| ChannelSnapshot {
                    staff: *staff,
                    staff_present: channel.staff_present,
                    students: channel.students.iter().copied().collect(),
                })
                .collect(),
            waiting: self
                .waiting
                .iter()
                .map(|student| WaitingMember {
                    student: *student,
                    display_name: format_queue_nickname(
                        &format!("Student {student}"),
                        self.positions.get(student).copied(),
                    ),
                })
                .collect(),
        };

        let (hours, actions) =
            OfficeHours::recover(self.env.clone(), self.config.clone(), snapshot);
        let mut world = Self::assemble(self.env, self.config, hours, self.roster);
        world.waiting = self.waiting;
        world.channels = self.channels;
        world.positions = self.positions;
        world.on_break = self.on_break;
        world.records = self.records;
        world.auto_move = self.auto_move;
        world.report_order = self.report_order;
        world.execute_all(actions);
        world.drain();
        world
    }

    /// The state machine.
    pub fn hours(&self) -> &OfficeHours<SimEnv> {
        &self.hours
    }

    /// The simulated environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Current simulated time.
    pub fn now(&self) -> Timestamp {
        self.env.now()
    }

    /// Invariant snapshot of the state machine.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::capture(&self.hours)
    }

    /// Students in queue order.
    pub fn queue_order(&self) -> Vec<StudentId> {
        self.hours.queue().queue().iter().map(|entry| entry.student).collect()
    }

    /// Members of the waiting channel.
    pub fn waiting(&self) -> &BTreeSet<StudentId> {
        &self.waiting
    }

    /// `staff`'s channel, if it exists on the platform.
    pub fn channel(&self, staff: StaffId) -> Option<&Channel> {
        self.channels.get(&staff)
    }

    /// Queue position shown in `student`'s nickname.
    pub fn displayed_position(&self, student: StudentId) -> Option<usize> {
        self.positions.get(&student).copied()
    }

    /// Whether `staff` carries the on-break marker.
    pub fn marked_on_break(&self, staff: StaffId) -> bool {
        self.on_break.contains(&staff)
    }

    /// Last persisted record for `staff`.
    pub fn record(&self, staff: StaffId) -> Option<&StaffRecord> {
        self.records.get(&staff)
    }

    /// When `key` is due, if armed.
    pub fn timer(&self, key: TimerKey) -> Option<Timestamp> {
        self.armed.get(&key).copied()
    }

    /// Every action executed so far.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Completed moves in order.
    pub fn moves(&self) -> &[(StudentId, StaffId)] {
        &self.moves
    }

    /// Notices delivered so far.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Audio played so far.
    pub fn audio(&self) -> &[(StaffId, AudioClip)] {
        &self.audio
    }

    /// Errors returned while processing follow-up events.
    pub fn errors(&self) -> &[OfficeHoursError] {
        &self.errors
    }

    /// Moves issued but not yet carried out.
    pub fn pending_moves(&self) -> usize {
        self.pending_moves.len()
    }

    /// Whether moves are carried out as soon as they are issued.
    ///
    /// With this off, moves wait for [`SimWorld::complete_moves`], which
    /// leaves room for students to vanish in between.
    pub fn set_auto_move(&mut self, auto_move: bool) {
        self.auto_move = auto_move;
    }

    /// Order in which successful moves are reported. Failed moves are always
    /// reported straight away.
    pub fn set_report_order(&mut self, order: ReportOrder) {
        self.report_order = order;
    }

    /// Move reports held back by [`ReportOrder::Held`].
    pub fn held_reports(&self) -> usize {
        self.held_reports.len()
    }

    /// Deliver every held move report, oldest first.
    pub fn release_reports(&mut self) {
        self.inbox.extend(self.held_reports.drain(..));
        self.drain();
    }

    /// Carry out every pending move, including moves issued while doing so.
    pub fn complete_moves(&mut self) {
        while let Some((student, staff)) = self.pending_moves.pop_front() {
            self.perform_move(student, staff);
            self.drain();
        }
    }

    /// Process `event` and everything it sets off.
    ///
    /// Returns the error of `event` itself. Errors of follow-up events are
    /// collected in [`SimWorld::errors`].
    pub fn dispatch(&mut self, event: Event) -> Result<(), OfficeHoursError> {
        let actions = self.hours.process_event(event)?;
        self.execute_all(actions);
        self.drain();
        Ok(())
    }

    /// Run a periodic tick.
    pub fn tick(&mut self) {
        self.inbox.push_back(Event::Tick);
        self.drain();
    }

    /// Advance the clock, firing due timers in order, then tick.
    pub fn advance(&mut self, by: Duration) {
        let target = self.now() + by;
        while let Some(&(at, key)) = self.timers.first() {
            if at > target {
                break;
            }
            self.timers.remove(&(at, key));
            self.armed.remove(&key);
            self.env.set(at);
            self.inbox.push_back(Event::TimerFired(key));
            self.drain();
        }
        self.env.set(target);
        self.tick();
    }

    /// A student enters the waiting channel.
    pub fn student_joins(&mut self, student: StudentId) -> Result<(), OfficeHoursError> {
        self.waiting.insert(student);
        self.dispatch(Event::StudentJoinedQueue { student })
    }

    /// A student leaves the waiting channel. No-op if they are not in it.
    pub fn student_leaves_queue(&mut self, student: StudentId) -> Result<(), OfficeHoursError> {
        if !self.waiting.remove(&student) {
            return Ok(());
        }
        self.dispatch(Event::StudentLeftQueue { student })
    }

    /// A student leaves whichever staff channel they are in.
    pub fn student_leaves_room(&mut self, student: StudentId) -> Result<(), OfficeHoursError> {
        let Some(staff) = self.room_of(student) else {
            return Ok(());
        };
        if let Some(channel) = self.channels.get_mut(&staff) {
            channel.students.remove(&student);
        }
        self.dispatch(Event::StudentLeftRoom { student, staff })
    }

    /// A student walks straight into `staff`'s channel.
    pub fn student_walks_in(
        &mut self,
        student: StudentId,
        staff: StaffId,
    ) -> Result<(), OfficeHoursError> {
        let Some(channel) = self.channels.get_mut(&staff) else {
            return Ok(());
        };
        channel.students.insert(student);
        self.dispatch(Event::StudentEnteredRoom { student, staff })
    }

    /// A staff member enters their channel, or some other channel if theirs
    /// does not exist.
    pub fn staff_enters(&mut self, staff: StaffId) -> Result<(), OfficeHoursError> {
        let own_room = match self.channels.get_mut(&staff) {
            Some(channel) => {
                channel.staff_present = true;
                true
            },
            None => false,
        };
        self.dispatch(Event::StaffEnteredVoice { staff, own_room })
    }

    /// A staff member leaves their channel.
    pub fn staff_leaves(&mut self, staff: StaffId) -> Result<(), OfficeHoursError> {
        match self.channels.get_mut(&staff) {
            Some(channel) if channel.staff_present => channel.staff_present = false,
            _ => return Ok(()),
        }
        self.dispatch(Event::StaffLeftVoice { staff })
    }

    /// A student submits their request.
    pub fn submit_request(
        &mut self,
        student: StudentId,
        preferences: Vec<StaffId>,
    ) -> Result<(), OfficeHoursError> {
        self.dispatch(Event::MetadataSubmitted {
            student,
            preferences,
            purpose: format!("question from student {student}"),
            tried: "reading the notes".into(),
        })
    }

    /// Staff channel `student` is in, if any.
    pub fn room_of(&self, student: StudentId) -> Option<StaffId> {
        self.channels
            .iter()
            .find(|(_, channel)| channel.students.contains(&student))
            .map(|(staff, _)| *staff)
    }

    fn drain(&mut self) {
        while let Some(event) = self.inbox.pop_front() {
            match self.hours.process_event(event.clone()) {
                Ok(actions) => self.execute_all(actions),
                Err(e) => {
                    tracing::warn!(?event, error = %e, "follow-up event rejected");
                    self.errors.push(e);
                },
            }
        }
    }

    fn execute_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: Action) {
        self.actions.push(action.clone());
        match action {
            Action::MoveStudent { student, staff, .. } => {
                if self.auto_move {
                    self.perform_move(student, staff);
                } else {
                    self.pending_moves.push_back((student, staff));
                }
            },
            Action::DisconnectStudent { student } => {
                if self.waiting.remove(&student) {
                    self.inbox.push_back(Event::StudentLeftQueue { student });
                } else if let Some(staff) = self.room_of(student) {
                    if let Some(channel) = self.channels.get_mut(&staff) {
                        channel.students.remove(&student);
                    }
                    self.inbox.push_back(Event::StudentLeftRoom { student, staff });
                }
            },
            Action::DisconnectStaff { .. } => {},
            Action::SetQueuePosition { student, position } => match position {
                Some(position) => {
                    self.positions.insert(student, position);
                },
                None => {
                    self.positions.remove(&student);
                },
            },
            Action::EnsureChannel { staff, name } => {
                self.channels.entry(staff).or_default().name = name;
            },
            Action::RenameChannel { staff, name } => {
                if let Some(channel) = self.channels.get_mut(&staff) {
                    channel.name = name;
                }
            },
            Action::DeleteChannel { staff, farewell } => {
                if let Some(clip) = farewell {
                    self.audio.push((staff, clip));
                }
                let Some(channel) = self.channels.remove(&staff) else { return };
                for student in channel.students {
                    self.inbox.push_back(Event::StudentLeftRoom { student, staff });
                }
                if channel.staff_present {
                    self.inbox.push_back(Event::StaffLeftVoice { staff });
                }
            },
            Action::PlayAudio { staff, clip } => self.audio.push((staff, clip)),
            Action::Notify(notice) => self.notices.push(notice),
            Action::MarkOnBreak { staff, on_break } => {
                if on_break {
                    self.on_break.insert(staff);
                } else {
                    self.on_break.remove(&staff);
                }
            },
            Action::ScheduleTimer { key, at } => {
                if let Some(previous) = self.armed.insert(key, at) {
                    self.timers.remove(&(previous, key));
                }
                self.timers.insert((at, key));
            },
            Action::CancelTimer { key } => {
                if let Some(at) = self.armed.remove(&key) {
                    self.timers.remove(&(at, key));
                }
            },
            Action::PersistStaff(record) => {
                self.records.insert(record.id, record);
            },
            Action::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
            },
        }
    }

    /// Move `student` from the waiting channel into `staff`'s channel, or
    /// report failure if either side is gone.
    fn perform_move(&mut self, student: StudentId, staff: StaffId) {
        let movable = self.waiting.contains(&student) && self.channels.contains_key(&staff);
        if !movable {
            self.inbox.push_back(Event::MoveFinished { student, staff, moved: false });
            return;
        }

        self.waiting.remove(&student);
        if let Some(channel) = self.channels.get_mut(&staff) {
            channel.students.insert(student);
        }
        self.moves.push((student, staff));

        let report = Event::MoveFinished { student, staff, moved: true };
        if self.report_order == ReportOrder::BeforeVoice {
            self.inbox.push_back(report.clone());
        }
        self.inbox.push_back(Event::StudentLeftQueue { student });
        self.inbox.push_back(Event::StudentEnteredRoom { student, staff });
        match self.report_order {
            ReportOrder::BeforeVoice => {},
            ReportOrder::AfterVoice => self.inbox.push_back(report),
            ReportOrder::Held => self.held_reports.push_back(report),
        }
    }
}

impl std::fmt::Debug for SimWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimWorld")
            .field("now", &self.now())
            .field("queue", &self.queue_order())
            .field("channels", &self.channels)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}
