//! Restart tests.
//!
//! Queue and room state are rebuilt from the platform (channel membership,
//! nicknames) and the staff store. These tests restart a [`SimWorld`] midway
//! through a session and check that office hours carry on.

use std::time::Duration;

use office_hours_core::{Event, Heading, RoomState, StaffId, StaffMember, StudentId, Timeslot};
use office_hours_harness::{InvariantRegistry, SIM_START, SimWorld};

fn hosting(staff: u64) -> StaffMember {
    StaffMember::new(StaffId(staff), format!("Staff {staff}")).with_timeslot(Timeslot::new(
        SIM_START,
        SIM_START + Duration::from_secs(3 * 3_600),
    ))
}

fn busy_world() -> SimWorld {
    let mut world = SimWorld::new(21, vec![hosting(10)]);
    world.staff_enters(StaffId(10)).unwrap();
    for id in 1..=4 {
        world.student_joins(StudentId(id)).unwrap();
    }
    world
}

#[test]
fn queue_order_survives_restart() {
    let mut world = busy_world();
    world.dispatch(Event::QueuePositionOverride { student: StudentId(4), position: 0 }).unwrap();
    assert_eq!(world.queue_order(), vec![StudentId(4), StudentId(2), StudentId(3)]);

    let world = world.restart();
    assert_eq!(world.queue_order(), vec![StudentId(4), StudentId(2), StudentId(3)]);
    assert_eq!(world.displayed_position(StudentId(3)), Some(3));
    assert!(world.errors().is_empty());
}

#[test]
fn occupied_room_resumes_after_restart() {
    let world = busy_world().restart();
    assert_eq!(
        world.hours().rooms().get_room(StaffId(10)).map(|room| room.state),
        Some(RoomState::Closed)
    );

    let mut world = world;
    world.student_leaves_room(StudentId(1)).unwrap();
    assert_eq!(
        world.hours().queue().heading(StudentId(2)),
        Some(Heading::Reserved(StaffId(10)))
    );

    world.advance(Duration::from_secs(30));
    assert_eq!(world.moves(), &[(StudentId(2), StaffId(10))]);
    InvariantRegistry::standard().assert_all(&world.snapshot(), "after restart and move");
}

#[test]
fn time_with_student_is_kept_across_restart() {
    let mut world = busy_world();
    world.advance(Duration::from_secs(600));

    let mut world = world.restart();
    world.advance(Duration::from_secs(300));
    world.student_leaves_room(StudentId(1)).unwrap();

    // only time since the restart is measured; the rest was lost with the
    // process
    let record = world.record(StaffId(10)).unwrap();
    assert!((record.seconds_with - 300.0).abs() < 1e-6, "{record:?}");
}

#[test]
fn break_resumes_after_restart() {
    let mut world = SimWorld::new(22, vec![hosting(10)]);
    world.staff_enters(StaffId(10)).unwrap();
    world.dispatch(Event::BreakRequested { staff: StaffId(10), minutes: 10 }).unwrap();
    assert!(world.marked_on_break(StaffId(10)));

    world.advance(Duration::from_secs(120));
    let mut world = world.restart();
    world.student_joins(StudentId(1)).unwrap();
    assert!(world.moves().is_empty());

    world.advance(Duration::from_secs(480));
    assert!(!world.marked_on_break(StaffId(10)));
    assert_eq!(world.moves(), &[(StudentId(1), StaffId(10))]);
}
