//! Model-based testing vocabulary.
//!
//! [`Operation`] lists what students and staff can do. proptest (or a fuzzer,
//! through `arbitrary`) generates sequences of them, [`Operation::apply`]
//! plays each one against a [`crate::SimWorld`], and the invariant registry
//! checks the result after every step.

mod operation;

pub use operation::{Operation, STUDENTS, StaffSlot, StudentSlot};
