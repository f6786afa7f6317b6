//! Office hours production runtime.
//!
//! Wraps [`office_hours_core`]'s action-based state machine with real I/O:
//! tokio timers, a chat platform, durable staff records and the system clock.
//!
//! # Components
//!
//! - [`Runtime`]: single-owner event loop that executes core actions
//! - [`TaskRegistry`]: named, cancellable tokio tasks backing core timers
//! - [`Platform`]: chat platform boundary, with [`LoggingPlatform`] for the
//!   development console
//! - [`StaffStore`]: staff record persistence ([`RedbStaffStore`],
//!   [`MemoryStaffStore`])
//! - [`SystemEnv`]: production environment (wall clock, OS randomness)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod console;
mod error;
pub mod notice;
pub mod platform;
pub mod roster;
mod runtime;
pub mod store;
mod system_env;
pub mod tasks;

pub use config::RuntimeConfig;
pub use error::ServerError;
pub use platform::{LoggingPlatform, Membership, Platform, PlatformError};
pub use roster::{RosterError, load_roster, parse_roster};
pub use runtime::{EventSender, Runtime};
pub use store::{MemoryStaffStore, RedbStaffStore, StaffStore, StoreError};
pub use system_env::SystemEnv;
pub use tasks::TaskRegistry;
