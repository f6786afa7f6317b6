//! End-to-end allocation scenarios driven through the simulated platform.

use std::time::Duration;

use office_hours_core::{
    Action, AudioClip, Event, Heading, LogLevel, Notice, OfficeHoursConfig, RoomState, StaffId,
    StaffMember, StudentId, TimerKey, Timeslot,
};
use office_hours_harness::{InvariantRegistry, ReportOrder, SIM_START, SimWorld};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3_600);

fn hosting(staff: u64) -> StaffMember {
    hosting_for(staff, Duration::ZERO, 3 * HOUR)
}

fn hosting_for(staff: u64, starts_in: Duration, length: Duration) -> StaffMember {
    let starts_at = SIM_START + starts_in;
    StaffMember::new(StaffId(staff), format!("Staff {staff}"))
        .with_timeslot(Timeslot::new(starts_at, starts_at + length))
}

fn student(id: u64) -> StudentId {
    StudentId(id)
}

fn state(world: &SimWorld, staff: u64) -> Option<RoomState> {
    world.hours().rooms().get_room(StaffId(staff)).map(|room| room.state)
}

fn heading(world: &SimWorld, id: u64) -> Option<Heading> {
    world.hours().queue().heading(student(id))
}

fn check(world: &SimWorld) {
    InvariantRegistry::standard().assert_all(&world.snapshot(), "at end of scenario");
    assert!(world.errors().is_empty(), "follow-up errors: {:?}", world.errors());
}

#[test]
fn first_student_goes_to_first_room() {
    let mut world = SimWorld::new(1, vec![hosting(10)]);
    for id in 1..=3 {
        world.student_joins(student(id)).unwrap();
    }
    assert!(world.moves().is_empty());

    world.staff_enters(StaffId(10)).unwrap();

    assert_eq!(world.moves(), &[(student(1), StaffId(10))]);
    assert_eq!(world.queue_order(), vec![student(2), student(3)]);
    assert_eq!(world.displayed_position(student(1)), None);
    assert_eq!(world.displayed_position(student(2)), Some(1));
    assert_eq!(world.displayed_position(student(3)), Some(2));
    assert_eq!(state(&world, 10), Some(RoomState::Closed));
    check(&world);
}

#[test]
fn preference_for_absent_staff_is_skipped() {
    let mut world =
        SimWorld::new(2, vec![hosting(10), hosting_for(20, 30 * MINUTE, 2 * HOUR)]);
    world.student_joins(student(1)).unwrap();
    world.submit_request(student(1), vec![StaffId(20)]).unwrap();
    world.student_joins(student(2)).unwrap();

    world.staff_enters(StaffId(10)).unwrap();
    assert_eq!(world.moves(), &[(student(2), StaffId(10))]);
    assert_eq!(world.queue_order(), vec![student(1)]);
    assert_eq!(heading(&world, 1), None);

    world.advance(30 * MINUTE);
    world.staff_enters(StaffId(20)).unwrap();
    assert_eq!(world.moves().last(), Some(&(student(1), StaffId(20))));

    let requested = world.notices().iter().any(|notice| {
        matches!(notice, Notice::IncomingStudent { staff, student, requested: true, .. }
            if *staff == StaffId(20) && *student == StudentId(1))
    });
    assert!(requested);
    check(&world);
}

#[test]
fn rejoin_within_window_restores_position() {
    let mut world = SimWorld::new(3, Vec::new());
    for id in 1..=4 {
        world.student_joins(student(id)).unwrap();
    }

    world.student_leaves_queue(student(2)).unwrap();
    assert_eq!(world.queue_order(), vec![student(1), student(3), student(4)]);
    assert_eq!(world.displayed_position(student(3)), Some(2));

    world.advance(Duration::from_secs(30));
    world.student_joins(student(2)).unwrap();
    assert_eq!(world.queue_order(), vec![student(1), student(2), student(3), student(4)]);
    assert_eq!(world.displayed_position(student(2)), Some(2));
    assert_eq!(world.displayed_position(student(3)), Some(3));
    check(&world);
}

#[test]
fn rejoin_after_window_goes_to_back() {
    let mut world = SimWorld::new(4, Vec::new());
    for id in 1..=4 {
        world.student_joins(student(id)).unwrap();
    }

    world.student_leaves_queue(student(2)).unwrap();
    world.advance(Duration::from_secs(121));
    world.student_joins(student(2)).unwrap();
    assert_eq!(world.queue_order(), vec![student(1), student(3), student(4), student(2)]);
    check(&world);
}

/// Two students: the first is with staff, the second has just been reserved
/// the room after the first left.
fn reserved_world(config: OfficeHoursConfig) -> SimWorld {
    let mut world = SimWorld::with_config(5, vec![hosting(10)], config);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();
    world.student_joins(student(2)).unwrap();
    world.student_leaves_room(student(1)).unwrap();
    world
}

#[test]
fn reserved_student_is_moved_when_grace_ends() {
    let mut world = reserved_world(OfficeHoursConfig::default());
    assert_eq!(state(&world, 10), Some(RoomState::StudentReservedOpeningSoon));
    assert_eq!(heading(&world, 2), Some(Heading::Reserved(StaffId(10))));
    assert_eq!(world.moves().len(), 1);

    world.advance(Duration::from_secs(30));
    assert_eq!(world.moves().last(), Some(&(student(2), StaffId(10))));
    assert_eq!(world.timer(TimerKey::PreemptiveTimeout(student(2))), None);
    check(&world);
}

#[test]
fn reserved_student_leaving_frees_room() {
    let mut world = reserved_world(OfficeHoursConfig::default());
    world.student_leaves_queue(student(2)).unwrap();
    assert_eq!(state(&world, 10), Some(RoomState::OpeningSoon));
    assert_eq!(world.timer(TimerKey::PreemptiveTimeout(student(2))), None);

    world.student_joins(student(3)).unwrap();
    assert_eq!(heading(&world, 3), Some(Heading::Reserved(StaffId(10))));

    world.advance(Duration::from_secs(30));
    assert_eq!(world.moves().last(), Some(&(student(3), StaffId(10))));
    check(&world);
}

#[test]
fn reservation_released_when_room_fills_during_grace() {
    let mut world = reserved_world(OfficeHoursConfig::default());
    world.student_walks_in(student(9), StaffId(10)).unwrap();
    assert_eq!(state(&world, 10), Some(RoomState::Closed));

    world.advance(Duration::from_secs(30));
    assert_eq!(heading(&world, 2), None);
    assert_eq!(world.queue_order(), vec![student(2)]);
    assert_eq!(world.moves().len(), 1);

    world.student_leaves_room(student(9)).unwrap();
    assert_eq!(heading(&world, 2), Some(Heading::Reserved(StaffId(10))));
    check(&world);
}

#[test]
fn reservation_timeout_runs_fresh_allocation() {
    let config =
        OfficeHoursConfig { grace_delay: Duration::from_secs(60), ..OfficeHoursConfig::default() };
    let mut world = reserved_world(config);
    let first_deadline = world.now() + Duration::from_secs(30);
    assert_eq!(world.timer(TimerKey::PreemptiveTimeout(student(2))), Some(first_deadline));

    world.advance(Duration::from_secs(30));
    assert_eq!(heading(&world, 2), Some(Heading::Reserved(StaffId(10))));
    assert_eq!(
        world.timer(TimerKey::PreemptiveTimeout(student(2))),
        Some(first_deadline + Duration::from_secs(30))
    );

    world.advance(Duration::from_secs(30));
    assert_eq!(world.moves().last(), Some(&(student(2), StaffId(10))));
    check(&world);
}

#[test]
fn lowest_ratio_room_is_offered_first() {
    let mut world = SimWorld::new(6, vec![hosting(10), hosting(20)]);
    world.staff_enters(StaffId(10)).unwrap();
    world.staff_enters(StaffId(20)).unwrap();

    world.student_joins(student(1)).unwrap();
    assert_eq!(world.moves(), &[(student(1), StaffId(10))]);

    world.advance(10 * MINUTE);
    world.student_leaves_room(student(1)).unwrap();
    world.advance(Duration::from_secs(31));
    assert_eq!(state(&world, 10), Some(RoomState::Open));

    world.student_joins(student(2)).unwrap();
    assert_eq!(world.moves().last(), Some(&(student(2), StaffId(20))));
    check(&world);
}

#[test]
fn open_room_beats_opening_soon_room() {
    let mut world = SimWorld::new(7, vec![hosting(10), hosting(20)]);
    world.staff_enters(StaffId(10)).unwrap();
    world.advance(HOUR);
    world.student_joins(student(1)).unwrap();

    world.staff_enters(StaffId(20)).unwrap();
    world.student_joins(student(2)).unwrap();
    assert_eq!(world.moves(), &[(student(1), StaffId(10)), (student(2), StaffId(20))]);

    world.advance(10 * MINUTE);
    world.student_leaves_room(student(2)).unwrap();
    world.advance(Duration::from_secs(31));
    world.student_leaves_room(student(1)).unwrap();
    assert_eq!(state(&world, 10), Some(RoomState::OpeningSoon));
    assert!(world.hours().ledger().ratio(StaffId(10)) < world.hours().ledger().ratio(StaffId(20)));

    world.student_joins(student(3)).unwrap();
    assert_eq!(world.moves().last(), Some(&(student(3), StaffId(20))));
    assert_eq!(state(&world, 10), Some(RoomState::OpeningSoon));
    check(&world);
}

#[test]
fn failed_move_reopens_room_for_next_student() {
    let mut world = SimWorld::new(8, vec![hosting(10)]);
    world.set_auto_move(false);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();
    world.student_joins(student(2)).unwrap();
    assert_eq!(world.pending_moves(), 1);

    world.student_leaves_queue(student(1)).unwrap();
    world.complete_moves();

    assert_eq!(world.moves(), &[(student(2), StaffId(10))]);
    assert!(
        world
            .actions()
            .iter()
            .any(|action| matches!(action, Action::Log { level: LogLevel::Warn, .. }))
    );
    check(&world);
}

#[test]
fn rejoining_during_move_is_not_dispatched_twice() {
    let mut world = SimWorld::new(9, vec![hosting(10), hosting(20)]);
    world.set_auto_move(false);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();

    world.student_leaves_queue(student(1)).unwrap();
    world.student_joins(student(1)).unwrap();
    world.staff_enters(StaffId(20)).unwrap();
    assert_eq!(world.pending_moves(), 1);
    InvariantRegistry::standard().assert_all(&world.snapshot(), "while move is in flight");

    world.complete_moves();
    assert_eq!(world.moves(), &[(student(1), StaffId(10))]);
    check(&world);
}

#[test]
fn move_reported_after_arrival_closes_room() {
    let mut world = SimWorld::new(8, vec![hosting(10)]);
    world.set_report_order(ReportOrder::AfterVoice);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();
    world.student_joins(student(2)).unwrap();

    assert_eq!(world.moves(), &[(student(1), StaffId(10))]);
    assert_eq!(state(&world, 10), Some(RoomState::Closed));
    assert_eq!(world.queue_order(), vec![student(2)]);

    world.student_leaves_room(student(1)).unwrap();
    world.advance(Duration::from_secs(30));
    assert_eq!(world.moves().last(), Some(&(student(2), StaffId(10))));
    check(&world);
}

#[test]
fn late_move_report_does_not_close_reopening_room() {
    let mut world = SimWorld::new(8, vec![hosting(10)]);
    world.set_report_order(ReportOrder::Held);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();
    world.student_joins(student(2)).unwrap();
    world.student_leaves_room(student(1)).unwrap();
    assert_eq!(state(&world, 10), Some(RoomState::StudentReservedOpeningSoon));

    world.release_reports();
    assert_eq!(state(&world, 10), Some(RoomState::StudentReservedOpeningSoon));
    assert_eq!(heading(&world, 2), Some(Heading::Reserved(StaffId(10))));
    let stale = world.actions().iter().any(|action| {
        matches!(action, Action::Log { level: LogLevel::Debug, message }
            if message.starts_with("stale move report"))
    });
    assert!(stale);

    world.advance(Duration::from_secs(30));
    assert_eq!(world.moves().last(), Some(&(student(2), StaffId(10))));
    assert_eq!(state(&world, 10), Some(RoomState::Closed));
    check(&world);
}

#[test]
fn deferred_break_starts_when_student_leaves() {
    let mut world = SimWorld::new(10, vec![hosting(10)]);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();
    world.dispatch(Event::BreakRequested { staff: StaffId(10), minutes: 5 }).unwrap();
    world.student_joins(student(2)).unwrap();
    assert!(!world.marked_on_break(StaffId(10)));

    world.student_leaves_room(student(1)).unwrap();
    assert!(world.marked_on_break(StaffId(10)));
    assert_eq!(state(&world, 10), Some(RoomState::Closed));
    assert_eq!(world.queue_order(), vec![student(2)]);
    assert!(world.notices().iter().any(|n| matches!(n, Notice::BreakStarted { .. })));

    world.advance(5 * MINUTE);
    assert!(!world.marked_on_break(StaffId(10)));
    assert!(world.notices().contains(&Notice::BreakEnded { staff: StaffId(10) }));
    assert_eq!(world.moves().last(), Some(&(student(2), StaffId(10))));
    check(&world);
}

#[test]
fn ended_timeslot_closes_room_after_last_student() {
    let mut world = SimWorld::new(11, vec![hosting_for(10, Duration::ZERO, HOUR)]);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();

    world.advance(HOUR);
    let channel = world.channel(StaffId(10)).unwrap();
    assert!(channel.name.ends_with("(closing)"), "{}", channel.name);
    assert!(world.audio().iter().any(|(_, clip)| matches!(clip, AudioClip::Closing(_))));

    world.student_joins(student(2)).unwrap();
    assert_eq!(world.moves().len(), 1);

    world.student_leaves_room(student(1)).unwrap();
    assert!(world.channel(StaffId(10)).is_none());
    assert!(world.hours().rooms().is_empty());
    assert_eq!(world.queue_order(), vec![student(2)]);
    check(&world);
}

#[test]
fn stale_request_is_removed_after_resubmit_window() {
    let mut world = SimWorld::new(12, Vec::new());
    world.student_joins(student(1)).unwrap();
    world.submit_request(student(1), Vec::new()).unwrap();

    world.advance(HOUR);
    let resubmit_by = world.now() + 15 * MINUTE;
    assert!(
        world.notices().contains(&Notice::MetadataExpired { student: student(1), resubmit_by })
    );

    world.advance(15 * MINUTE);
    assert!(world.notices().contains(&Notice::RemovedForStaleRequest { student: student(1) }));
    assert!(world.queue_order().is_empty());
    assert!(world.waiting().is_empty());
    check(&world);
}

#[test]
fn resubmitted_request_keeps_place() {
    let mut world = SimWorld::new(13, Vec::new());
    world.student_joins(student(1)).unwrap();
    world.submit_request(student(1), Vec::new()).unwrap();
    world.advance(HOUR);

    world.submit_request(student(1), Vec::new()).unwrap();
    world.advance(15 * MINUTE);
    assert_eq!(world.queue_order(), vec![student(1)]);
    check(&world);
}

#[test]
fn staff_in_waiting_channel_are_turned_away() {
    let mut world = SimWorld::new(14, vec![hosting(10)]);
    world.dispatch(Event::StaffJoinedQueue { staff: StaffId(10) }).unwrap();
    assert!(world.actions().contains(&Action::DisconnectStaff { staff: StaffId(10) }));
    assert!(world.notices().contains(&Notice::QueueIsForStudents { staff: StaffId(10) }));
}

#[test]
fn long_session_gets_move_on_reminder() {
    let mut world = SimWorld::new(15, vec![hosting(10)]);
    world.staff_enters(StaffId(10)).unwrap();
    world.student_joins(student(1)).unwrap();
    assert!(world.timer(TimerKey::Reminder(StaffId(10))).is_some());

    world.advance(HOUR);
    assert!(world.audio().contains(&(StaffId(10), AudioClip::MoveOn)));
    check(&world);
}
