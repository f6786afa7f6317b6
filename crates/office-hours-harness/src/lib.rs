//! Deterministic simulation harness for office hours testing.
//!
//! [`SimEnv`] is a virtual clock plus a seeded RNG. [`SimWorld`] wraps an
//! [`office_hours_core::OfficeHours`] and plays the part of the chat
//! platform: it executes actions, keeps a timer wheel on the virtual clock and
//! feeds the resulting voice events back in.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after every
//! event, whatever sequence led there. Use [`InvariantRegistry::standard()`].
//!
//! # Model-Based Testing
//!
//! The `model` module defines [`Operation`], a small arbitrary-derived
//! vocabulary of things students and staff do, for proptest to combine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_env;
pub mod sim_world;

pub use invariants::{
    Invariant, InvariantRegistry, InvariantResult, OccupiedRoomsClosed, OnBreakRoomsClosed,
    QueueUniqueness, ReservationConsistency, RoomSnapshot, SingleDispatch, SystemSnapshot,
    Violation,
};
pub use model::{Operation, STUDENTS, StaffSlot, StudentSlot};
pub use sim_env::SimEnv;
pub use sim_world::{Channel, ReportOrder, SIM_START, SimWorld};
