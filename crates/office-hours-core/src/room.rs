//! Rooms and the room state machine.
//!
//! Each hosting staff member owns one room backed by a voice channel. A room
//! holds at most one student at a time: the room is offered to the allocation
//! pass only while it is ready and no student is already on the way in.
//!
//! ```text
//! INACCESSIBLE --staff joins alone--> OPEN --student moved in--> CLOSED
//!                                       ^                            |
//!                            grace over |                   student leaves
//!                                       |                            v
//!   STUDENT_RESERVED_OPENING_SOON <--matched-- OPENING_SOON <--------+
//! ```
//!
//! Breaks and staff leaving force `CLOSED` from any state.

use std::{collections::BTreeMap, time::Duration};

use crate::{
    action::{Action, AudioClip},
    config::CLOSING_SUFFIX,
    error::RoomError,
    member::{StaffId, StaffMember, StudentId, Timeslot},
    staff::StaffLedger,
    time::Timestamp,
    timer::TimerKey,
};

/// Occupancy state of a room.
///
/// Variant order is the allocation priority: lower values are offered first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoomState {
    /// Staff present, no student, accepting.
    Open,
    /// Grace delay after the previous student left.
    OpeningSoon,
    /// A student is reserved and will be moved once the grace delay ends.
    StudentReservedOpeningSoon,
    /// Occupied by a student, or explicitly closed (break, staff away).
    Closed,
    /// No staff present.
    Inaccessible,
}

impl RoomState {
    /// Initial state from what is actually in the channel.
    pub fn from_occupancy(occupancy: Occupancy) -> Self {
        match (occupancy.staff_present, occupancy.students) {
            (false, _) => Self::Inaccessible,
            (true, 0) => Self::Open,
            (true, _) => Self::Closed,
        }
    }

    /// States the allocation pass may place a student into.
    pub fn accepts_students(self) -> bool {
        matches!(self, Self::Open | Self::OpeningSoon)
    }
}

/// Who is in a room's voice channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Occupancy {
    /// Whether the owning staff member is in the channel
    pub staff_present: bool,
    /// Number of students in the channel
    pub students: usize,
}

impl Occupancy {
    /// Everyone in the channel.
    pub fn total(self) -> usize {
        usize::from(self.staff_present) + self.students
    }
}

/// One staff member's meeting space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Owning staff member
    pub staff: StaffId,
    /// Channel name without any closing suffix
    pub channel: String,
    /// Current state
    pub state: RoomState,
    /// Timeslot the room was opened for
    pub timeslot: Timeslot,
    /// Student reserved for or being moved into the room
    pub incoming: Option<StudentId>,
    /// End of the current grace delay
    pub grace_ends_at: Option<Timestamp>,
    /// Whether the closing announcement already ran
    pub closing_announced: bool,
}

impl Room {
    /// Whether the room's timeslot is over.
    pub fn is_closing(&self, now: Timestamp) -> bool {
        self.timeslot.has_ended(now)
    }

    /// Whether the allocation pass may offer this room.
    pub fn ready_for_students(&self, now: Timestamp) -> bool {
        self.state.accepts_students() && self.incoming.is_none() && !self.is_closing(now)
    }
}

/// Outcome of [`RoomManager::close_room`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// People are still inside; the room stays until they leave.
    Deferred,
    /// The channel is being torn down. Carries the removed room, if one was
    /// tracked.
    Removed(Option<Room>),
}

/// Owns every open room, keyed by staff member.
#[derive(Debug, Default)]
pub struct RoomManager {
    rooms: BTreeMap<StaffId, Room>,
}

impl RoomManager {
    /// No rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether there are no rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// All rooms, ordered by staff id.
    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Room owned by `staff`.
    pub fn get_room(&self, staff: StaffId) -> Option<&Room> {
        self.rooms.get(&staff)
    }

    /// Mutable room owned by `staff`.
    pub fn get_room_mut(&mut self, staff: StaffId) -> Option<&mut Room> {
        self.rooms.get_mut(&staff)
    }

    /// Open a room for `staff` during `timeslot`.
    ///
    /// Idempotent: an existing room is returned untouched with no actions.
    /// Otherwise the channel is ensured (an existing channel with the same
    /// name is reused by the runtime) and the initial state is derived from
    /// `occupancy`, forced to `Closed` while the staff member is on break.
    pub fn open_room(
        &mut self,
        staff: &StaffMember,
        timeslot: Timeslot,
        occupancy: Occupancy,
        on_break: bool,
    ) -> (&Room, Vec<Action>) {
        let mut actions = Vec::new();
        let room = self.rooms.entry(staff.id).or_insert_with(|| {
            let channel = staff.channel_name(&timeslot);
            let state =
                if on_break { RoomState::Closed } else { RoomState::from_occupancy(occupancy) };
            actions.push(Action::EnsureChannel { staff: staff.id, name: channel.clone() });
            actions.push(Action::log(
                crate::action::LogLevel::Info,
                format!("opened room {channel:?} for staff {} in state {state:?}", staff.id),
            ));
            Room {
                staff: staff.id,
                channel,
                state,
                timeslot,
                incoming: None,
                grace_ends_at: None,
                closing_announced: false,
            }
        });
        (room, actions)
    }

    /// Close the room for `staff`.
    ///
    /// With anyone besides the staff member still inside, the room survives:
    /// the channel gets a closing suffix and `clip` plays, once per
    /// transition. Otherwise the channel is deleted after `clip` plays and
    /// the room record is removed.
    pub fn close_room(
        &mut self,
        staff: StaffId,
        occupancy: Occupancy,
        clip: AudioClip,
    ) -> (CloseOutcome, Vec<Action>) {
        if occupancy.total() > 1 {
            let mut actions = Vec::new();
            if let Some(room) = self.rooms.get_mut(&staff) {
                if !room.closing_announced {
                    room.closing_announced = true;
                    actions.push(Action::RenameChannel {
                        staff,
                        name: format!("{} {CLOSING_SUFFIX}", room.channel),
                    });
                    actions.push(Action::PlayAudio { staff, clip });
                }
            }
            return (CloseOutcome::Deferred, actions);
        }

        let removed = self.rooms.remove(&staff);
        let actions = vec![
            Action::DeleteChannel { staff, farewell: Some(clip) },
            Action::CancelTimer { key: TimerKey::GraceExpiry(staff) },
            Action::CancelTimer { key: TimerKey::Reminder(staff) },
        ];
        (CloseOutcome::Removed(removed), actions)
    }

    /// Set the state of `staff`'s room.
    pub fn update_state(&mut self, staff: StaffId, state: RoomState) -> Result<(), RoomError> {
        let room = self.rooms.get_mut(&staff).ok_or(RoomError::RoomNotFound(staff))?;
        room.state = state;
        Ok(())
    }

    /// Start the grace delay after a student left `staff`'s room.
    ///
    /// The room becomes `OpeningSoon`, which the allocation pass may reserve
    /// but not move into, and a `GraceExpiry` timer is armed.
    pub fn finish_delay(
        &mut self,
        staff: StaffId,
        now: Timestamp,
        grace: Duration,
    ) -> Result<Vec<Action>, RoomError> {
        let room = self.rooms.get_mut(&staff).ok_or(RoomError::RoomNotFound(staff))?;
        let ends_at = now + grace;
        room.state = RoomState::OpeningSoon;
        room.grace_ends_at = Some(ends_at);
        Ok(vec![Action::ScheduleTimer { key: TimerKey::GraceExpiry(staff), at: ends_at }])
    }

    /// Rooms the allocation pass may fill, best candidate first.
    ///
    /// Ordered by state priority, then by the staff member's share of hosted
    /// time spent with students (less busy first), then by staff id.
    pub fn open_rooms(&self, now: Timestamp, ledger: &StaffLedger) -> Vec<&Room> {
        let mut ready: Vec<&Room> =
            self.rooms.values().filter(|room| room.ready_for_students(now)).collect();
        ready.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then_with(|| ledger.ratio(a.staff).total_cmp(&ledger.ratio(b.staff)))
                .then_with(|| a.staff.cmp(&b.staff))
        });
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staff::StaffRecord;

    fn staff(id: u64) -> StaffMember {
        StaffMember::new(StaffId(id), format!("Staff {id}"))
    }

    fn slot() -> Timeslot {
        Timeslot::new(Timestamp::EPOCH, Timestamp::from_secs(3_600))
    }

    const PRESENT: Occupancy = Occupancy { staff_present: true, students: 0 };

    #[test]
    fn initial_state_follows_occupancy() {
        assert_eq!(RoomState::from_occupancy(Occupancy::default()), RoomState::Inaccessible);
        assert_eq!(RoomState::from_occupancy(PRESENT), RoomState::Open);
        assert_eq!(
            RoomState::from_occupancy(Occupancy { staff_present: true, students: 1 }),
            RoomState::Closed
        );
    }

    #[test]
    fn open_room_is_idempotent() {
        let mut rooms = RoomManager::new();
        let (room, actions) = rooms.open_room(&staff(1), slot(), PRESENT, false);
        assert_eq!(room.state, RoomState::Open);
        assert!(matches!(actions[0], Action::EnsureChannel { staff: StaffId(1), .. }));

        rooms.update_state(StaffId(1), RoomState::Closed).unwrap();
        let (room, actions) = rooms.open_room(&staff(1), slot(), PRESENT, false);
        assert_eq!(room.state, RoomState::Closed);
        assert!(actions.is_empty());
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn break_forces_closed_on_open() {
        let mut rooms = RoomManager::new();
        let (room, _) = rooms.open_room(&staff(1), slot(), PRESENT, true);
        assert_eq!(room.state, RoomState::Closed);
    }

    #[test]
    fn close_with_occupants_announces_once() {
        let mut rooms = RoomManager::new();
        rooms.open_room(&staff(1), slot(), PRESENT, false);
        let busy = Occupancy { staff_present: true, students: 1 };

        let (outcome, actions) = rooms.close_room(StaffId(1), busy, AudioClip::Closing(2));
        assert_eq!(outcome, CloseOutcome::Deferred);
        assert_eq!(actions, vec![
            Action::RenameChannel { staff: StaffId(1), name: "Staff 1 (closing)".into() },
            Action::PlayAudio { staff: StaffId(1), clip: AudioClip::Closing(2) },
        ]);

        let (_, actions) = rooms.close_room(StaffId(1), busy, AudioClip::Closing(3));
        assert!(actions.is_empty());
    }

    #[test]
    fn close_when_empty_tears_down() {
        let mut rooms = RoomManager::new();
        rooms.open_room(&staff(1), slot(), PRESENT, false);

        let (outcome, actions) = rooms.close_room(StaffId(1), PRESENT, AudioClip::Closing(1));
        assert!(matches!(outcome, CloseOutcome::Removed(Some(_))));
        assert_eq!(actions[0], Action::DeleteChannel {
            staff: StaffId(1),
            farewell: Some(AudioClip::Closing(1))
        });
        assert!(rooms.get_room(StaffId(1)).is_none());
    }

    #[test]
    fn update_state_requires_room() {
        let mut rooms = RoomManager::new();
        assert_eq!(
            rooms.update_state(StaffId(4), RoomState::Open),
            Err(RoomError::RoomNotFound(StaffId(4)))
        );
    }

    #[test]
    fn finish_delay_arms_grace_timer() {
        let mut rooms = RoomManager::new();
        rooms.open_room(&staff(1), slot(), Occupancy { staff_present: true, students: 1 }, false);
        let now = Timestamp::from_secs(10);

        let actions = rooms.finish_delay(StaffId(1), now, Duration::from_secs(30)).unwrap();
        assert_eq!(actions, vec![Action::ScheduleTimer {
            key: TimerKey::GraceExpiry(StaffId(1)),
            at: Timestamp::from_secs(40)
        }]);
        assert_eq!(rooms.get_room(StaffId(1)).map(|r| r.state), Some(RoomState::OpeningSoon));
    }

    #[test]
    fn open_rooms_prefers_state_then_lower_ratio() {
        let mut rooms = RoomManager::new();
        for id in 1..=4 {
            rooms.open_room(&staff(id), slot(), PRESENT, false);
        }
        rooms.update_state(StaffId(3), RoomState::OpeningSoon).unwrap();
        rooms.update_state(StaffId(4), RoomState::Closed).unwrap();

        let mut busy = StaffRecord::new(StaffId(1), "Staff 1");
        busy.seconds_with = 90.0;
        busy.seconds_without = 10.0;
        let mut idle = StaffRecord::new(StaffId(2), "Staff 2");
        idle.seconds_with = 10.0;
        idle.seconds_without = 90.0;
        let ledger = StaffLedger::from_records([busy, idle]);

        let order: Vec<StaffId> =
            rooms.open_rooms(Timestamp::from_secs(5), &ledger).iter().map(|r| r.staff).collect();
        assert_eq!(order, vec![StaffId(2), StaffId(1), StaffId(3)]);
    }

    #[test]
    fn closing_and_claimed_rooms_are_not_offered() {
        let mut rooms = RoomManager::new();
        rooms.open_room(&staff(1), slot(), PRESENT, false);
        rooms.open_room(&staff(2), slot(), PRESENT, false);
        if let Some(room) = rooms.get_room_mut(StaffId(2)) {
            room.incoming = Some(StudentId(7));
        }

        let ledger = StaffLedger::new();
        assert_eq!(rooms.open_rooms(Timestamp::from_secs(5), &ledger).len(), 1);
        assert!(rooms.open_rooms(Timestamp::from_secs(3_600), &ledger).is_empty());
    }
}
