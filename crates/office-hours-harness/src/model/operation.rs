//! Operations for model-based testing.

use std::time::Duration;

use arbitrary::Arbitrary;
use office_hours_core::{Event, OfficeHoursError, StaffId, StudentId};

use crate::sim_world::{ReportOrder, SimWorld};

/// Student identifier (kept small so sequences collide on the same people).
pub type StudentSlot = u8;

/// Staff identifier, mapped onto the roster by index.
pub type StaffSlot = u8;

/// Number of distinct students operations refer to.
pub const STUDENTS: u8 = 8;

/// Things that happen during office hours.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Student enters the waiting channel.
    StudentJoins {
        /// Student.
        student: StudentSlot,
    },
    /// Student leaves the waiting channel.
    StudentLeavesQueue {
        /// Student.
        student: StudentSlot,
    },
    /// Student leaves the staff channel they are in.
    StudentLeavesRoom {
        /// Student.
        student: StudentSlot,
    },
    /// Student submits a request, optionally asking for one staff member.
    SubmitRequest {
        /// Student.
        student: StudentSlot,
        /// Preferred staff member.
        prefers: Option<StaffSlot>,
    },
    /// Staff member enters their channel.
    StaffEnters {
        /// Staff member.
        staff: StaffSlot,
    },
    /// Staff member leaves their channel.
    StaffLeaves {
        /// Staff member.
        staff: StaffSlot,
    },
    /// Staff member asks for a break.
    RequestBreak {
        /// Staff member.
        staff: StaffSlot,
        /// Length in minutes.
        minutes: u8,
    },
    /// Staff member ends their break early.
    EndBreak {
        /// Staff member.
        staff: StaffSlot,
    },
    /// Admin moves a student within the queue.
    Reposition {
        /// Student.
        student: StudentSlot,
        /// New index.
        position: u8,
    },
    /// Carry out moves held back while auto-move is off.
    CompleteMoves,
    /// Toggle whether moves complete immediately.
    SetAutoMove {
        /// New setting.
        enabled: bool,
    },
    /// Change when successful moves are reported.
    SetReportOrder {
        /// New order.
        order: ReportOrder,
    },
    /// Deliver move reports held back by [`ReportOrder::Held`].
    ReleaseReports,
    /// Let time pass.
    AdvanceTime {
        /// Seconds to advance.
        secs: u16,
    },
}

impl Operation {
    /// Apply the operation to `world`.
    ///
    /// Rejections the state machine is expected to produce (a break while one
    /// is pending, ending a break that is not running) come back as errors;
    /// operations whose precondition does not hold in the world are no-ops.
    pub fn apply(&self, world: &mut SimWorld, staff: &[StaffId]) -> Result<(), OfficeHoursError> {
        let staff_at = |slot: StaffSlot| staff.get(usize::from(slot) % staff.len().max(1)).copied();

        match *self {
            Self::StudentJoins { student } => {
                let student = student_id(student);
                if world.waiting().contains(&student) || world.room_of(student).is_some() {
                    return Ok(());
                }
                world.student_joins(student)
            },
            Self::StudentLeavesQueue { student } => world.student_leaves_queue(student_id(student)),
            Self::StudentLeavesRoom { student } => world.student_leaves_room(student_id(student)),
            Self::SubmitRequest { student, prefers } => {
                let student = student_id(student);
                if !world.hours().queue().queue().contains(student) {
                    return Ok(());
                }
                let preferences = prefers.and_then(staff_at).into_iter().collect();
                world.submit_request(student, preferences)
            },
            Self::StaffEnters { staff } => match staff_at(staff) {
                Some(staff) => world.staff_enters(staff),
                None => Ok(()),
            },
            Self::StaffLeaves { staff } => match staff_at(staff) {
                Some(staff) => world.staff_leaves(staff),
                None => Ok(()),
            },
            Self::RequestBreak { staff, minutes } => match staff_at(staff) {
                Some(staff) => world.dispatch(Event::BreakRequested {
                    staff,
                    minutes: u32::from(minutes.max(1)),
                }),
                None => Ok(()),
            },
            Self::EndBreak { staff } => match staff_at(staff) {
                Some(staff) => world.dispatch(Event::BreakEndRequested { staff }),
                None => Ok(()),
            },
            Self::Reposition { student, position } => {
                let student = student_id(student);
                if !world.hours().queue().queue().contains(student) {
                    return Ok(());
                }
                world.dispatch(Event::QueuePositionOverride {
                    student,
                    position: usize::from(position),
                })
            },
            Self::CompleteMoves => {
                world.complete_moves();
                Ok(())
            },
            Self::SetAutoMove { enabled } => {
                world.set_auto_move(enabled);
                Ok(())
            },
            Self::SetReportOrder { order } => {
                world.set_report_order(order);
                Ok(())
            },
            Self::ReleaseReports => {
                world.release_reports();
                Ok(())
            },
            Self::AdvanceTime { secs } => {
                world.advance(Duration::from_secs(u64::from(secs)));
                Ok(())
            },
        }
    }
}

fn student_id(slot: StudentSlot) -> StudentId {
    StudentId(u64::from(slot % STUDENTS) + 1)
}
