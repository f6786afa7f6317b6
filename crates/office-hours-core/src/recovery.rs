//! Startup recovery.
//!
//! Queue and room state are transient. After a restart they are rebuilt from
//! two sources: the durable staff records and a snapshot of live voice
//! membership. The rebuild is a plain function of the snapshot and the
//! current time, so it can be tested without a platform connection.
//!
//! Order matters and mirrors how the pieces depend on each other:
//! occupancy and time tracking first, then breaks (so rooms open closed for
//! staff on break), then rooms, then the queue, then one allocation pass.

use std::collections::BTreeMap;

use crate::{
    action::{Action, LogLevel},
    config::OfficeHoursConfig,
    env::Environment,
    member::{StaffId, StaffMember, StudentId},
    office_hours::OfficeHours,
    queue::parse_queue_position,
    room::Occupancy,
    staff::{StaffLedger, StaffRecord},
};

/// Sort key for waiting members without a position marker.
const UNNUMBERED: i64 = 9999;

/// A member sitting in the waiting channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingMember {
    /// Student
    pub student: StudentId,
    /// Current display name, possibly carrying a `(#n)` marker
    pub display_name: String,
}

/// Live membership of one staff member's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    /// Channel owner
    pub staff: StaffId,
    /// Whether the owner is in it
    pub staff_present: bool,
    /// Students in it
    pub students: Vec<StudentId>,
}

/// Everything needed to rebuild office hours state.
#[derive(Debug, Clone, Default)]
pub struct RecoverySnapshot {
    /// Staff roster with timeslots
    pub roster: Vec<StaffMember>,
    /// Durable staff records
    pub records: Vec<StaffRecord>,
    /// Existing staff channels
    pub channels: Vec<ChannelSnapshot>,
    /// Waiting channel members in platform order
    pub waiting: Vec<WaitingMember>,
}

impl<E: Environment> OfficeHours<E> {
    /// Rebuild office hours state from `snapshot`.
    ///
    /// Returns the rebuilt state and the actions needed to bring the platform
    /// and timers in line with it.
    pub fn recover(
        env: E,
        config: OfficeHoursConfig,
        snapshot: RecoverySnapshot,
    ) -> (Self, Vec<Action>) {
        let mut hours = Self::new(env, config);
        let now = hours.now();
        let mut actions = Vec::new();

        hours.ledger = StaffLedger::from_records(snapshot.records);
        actions.extend(hours.set_roster(snapshot.roster));

        let occupancy: BTreeMap<StaffId, Occupancy> = snapshot
            .channels
            .iter()
            .map(|channel| {
                (channel.staff, Occupancy {
                    staff_present: channel.staff_present,
                    students: channel.students.len(),
                })
            })
            .collect();
        for (staff, occupied) in &occupancy {
            if occupied.staff_present {
                let _ = hours.tracker.start_tracking(*staff, occupied.students > 0, now);
            }
        }
        hours.occupancy = occupancy;

        actions.extend(hours.load_breaks());

        for channel in &snapshot.channels {
            let active = hours
                .roster
                .get(&channel.staff)
                .and_then(|member| member.active_timeslot(now))
                .cloned();
            match active {
                Some(slot) => match hours.open_room(channel.staff, slot) {
                    Ok(opened) => actions.extend(opened),
                    Err(e) => actions.push(Action::log(LogLevel::Warn, e.to_string())),
                },
                // left over from a timeslot that ended while we were down
                None => actions.extend(hours.close_room(channel.staff)),
            }
        }

        let mut waiting = snapshot.waiting;
        waiting.sort_by_key(|member| {
            parse_queue_position(&member.display_name).map_or(UNNUMBERED, |n| n - 1)
        });
        for member in waiting {
            match hours.queue.add_student(member.student, now) {
                Ok(renumbered) => actions.extend(renumbered),
                Err(e) => {
                    actions.push(Action::log(LogLevel::Warn, e.to_string()));
                    continue;
                },
            }
            actions.extend(hours.queue.set_student_metadata(
                member.student,
                Vec::new(),
                String::new(),
                String::new(),
                now,
            ));
        }
        actions.push(Action::log(
            LogLevel::Info,
            format!(
                "recovered {} rooms and {} queued students",
                hours.rooms.len(),
                hours.queue.queue().len()
            ),
        ));

        actions.extend(hours.allocate());
        (hours, actions)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        Action, RoomState, Timeslot, Timestamp, TimerKey, action::Notice, testing::TestEnv,
    };

    fn member(id: u64, ends_secs: u64) -> StaffMember {
        StaffMember::new(StaffId(id), format!("Staff {id}"))
            .with_timeslot(Timeslot::new(Timestamp::EPOCH, Timestamp::from_secs(ends_secs)))
    }

    fn waiting(student: u64, name: &str) -> WaitingMember {
        WaitingMember { student: StudentId(student), display_name: name.into() }
    }

    fn recover(snapshot: RecoverySnapshot) -> (OfficeHours<TestEnv>, Vec<Action>) {
        OfficeHours::recover(TestEnv::at(1_000), OfficeHoursConfig::default(), snapshot)
    }

    #[test]
    fn waiting_members_keep_their_displayed_order() {
        let (hours, _) = recover(RecoverySnapshot {
            waiting: vec![
                waiting(1, "Bo (#3)"),
                waiting(2, "Al"),
                waiting(3, "Cy (#1)"),
                waiting(4, "Di (#2)"),
            ],
            ..RecoverySnapshot::default()
        });

        let order: Vec<u64> = hours.queue().queue().iter().map(|entry| entry.student.0).collect();
        assert_eq!(order, vec![3, 4, 1, 2]);
        assert!(hours.queue().metadata().get(StudentId(2)).is_some());
    }

    #[test]
    fn rooms_reopen_from_channel_membership() {
        let (hours, actions) = recover(RecoverySnapshot {
            roster: vec![member(10, 5_000), member(20, 5_000)],
            channels: vec![
                ChannelSnapshot { staff: StaffId(10), staff_present: true, students: vec![] },
                ChannelSnapshot {
                    staff: StaffId(20),
                    staff_present: true,
                    students: vec![StudentId(7)],
                },
            ],
            waiting: vec![waiting(1, "Ann (#1)")],
            ..RecoverySnapshot::default()
        });

        assert_eq!(hours.rooms().get_room(StaffId(20)).map(|r| r.state), Some(RoomState::Closed));
        assert!(actions.contains(&Action::MoveStudent {
            student: StudentId(1),
            staff: StaffId(10),
            channel: "Staff 10".into(),
        }));
    }

    #[test]
    fn persisted_breaks_resume_or_end() {
        let mut resting = StaffRecord::new(StaffId(10), "Staff 10");
        resting.breaking_until = Some(Timestamp::from_secs(1_600));
        let mut finished = StaffRecord::new(StaffId(20), "Staff 20");
        finished.breaking_until = Some(Timestamp::from_secs(400));

        let (hours, actions) = recover(RecoverySnapshot {
            roster: vec![member(10, 5_000), member(20, 5_000)],
            records: vec![resting, finished],
            channels: vec![
                ChannelSnapshot { staff: StaffId(10), staff_present: true, students: vec![] },
                ChannelSnapshot { staff: StaffId(20), staff_present: true, students: vec![] },
            ],
            ..RecoverySnapshot::default()
        });

        assert!(actions.contains(&Action::ScheduleTimer {
            key: TimerKey::BreakEnd(StaffId(10)),
            at: Timestamp::from_secs(1_600),
        }));
        assert!(actions.contains(&Action::Notify(Notice::BreakEnded { staff: StaffId(20) })));
        assert_eq!(hours.rooms().get_room(StaffId(10)).map(|r| r.state), Some(RoomState::Closed));
        assert_eq!(hours.rooms().get_room(StaffId(20)).map(|r| r.state), Some(RoomState::Open));
        assert_eq!(hours.ledger().breaking_until(StaffId(20)), None);
    }

    #[test]
    fn leftover_channel_is_deleted() {
        let (hours, actions) = recover(RecoverySnapshot {
            roster: vec![member(10, 500)],
            channels: vec![ChannelSnapshot {
                staff: StaffId(10),
                staff_present: false,
                students: vec![],
            }],
            ..RecoverySnapshot::default()
        });

        assert!(hours.rooms().is_empty());
        assert!(actions.iter().any(
            |a| matches!(a, Action::DeleteChannel { staff, .. } if *staff == StaffId(10))
        ));
    }

    #[test]
    fn recovered_tracking_credits_time_on_leave() {
        let env = TestEnv::at(1_000);
        let snapshot = RecoverySnapshot {
            roster: vec![member(10, 5_000)],
            channels: vec![ChannelSnapshot {
                staff: StaffId(10),
                staff_present: true,
                students: vec![StudentId(3)],
            }],
            ..RecoverySnapshot::default()
        };
        let (mut hours, _) =
            OfficeHours::recover(env.clone(), OfficeHoursConfig::default(), snapshot);

        env.advance(Duration::from_secs(90));
        hours.process_event(crate::Event::StaffLeftVoice { staff: StaffId(10) }).unwrap();
        let record = hours.ledger().get(StaffId(10)).cloned().unwrap();
        assert!((record.seconds_with - 90.0).abs() < f64::EPSILON);
    }
}
