//! Office hours configuration.

use std::time::Duration;

/// Default pause after a student leaves before the room accepts the next one.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_secs(30);

/// Default time a reservation may stay unresolved before it is released.
pub const DEFAULT_RESERVATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default window in which a departed student gets their old position back.
pub const DEFAULT_REJOIN_WINDOW: Duration = Duration::from_secs(2 * 60);

/// Default lifetime of a submitted help request.
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(60 * 60);

/// Default time a student has to resubmit an expired request.
pub const DEFAULT_RESUBMIT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Default floor on the per-student time allotment (0.1 hours).
pub const DEFAULT_MIN_ALLOTMENT: Duration = Duration::from_secs(6 * 60);

/// Number of distinct closing announcements.
pub const DEFAULT_CLOSING_CLIPS: u8 = 6;

/// Suffix appended to a room's channel name while it waits to close.
pub const CLOSING_SUFFIX: &str = "(closing)";

/// Timing and presentation knobs for [`crate::OfficeHours`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficeHoursConfig {
    /// Grace delay between students
    pub grace_delay: Duration,
    /// Timeout for an unresolved reservation into an opening-soon room
    pub reservation_timeout: Duration,
    /// Rejoin window for queue position recovery
    pub rejoin_window: Duration,
    /// How long request metadata stays valid
    pub metadata_ttl: Duration,
    /// How long a student has to resubmit after expiry
    pub resubmit_window: Duration,
    /// Lower bound on the time allotment per student
    pub min_allotment: Duration,
    /// Number of closing clips to choose from
    pub closing_clips: u8,
}

impl Default for OfficeHoursConfig {
    fn default() -> Self {
        Self {
            grace_delay: DEFAULT_GRACE_DELAY,
            reservation_timeout: DEFAULT_RESERVATION_TIMEOUT,
            rejoin_window: DEFAULT_REJOIN_WINDOW,
            metadata_ttl: DEFAULT_METADATA_TTL,
            resubmit_window: DEFAULT_RESUBMIT_WINDOW,
            min_allotment: DEFAULT_MIN_ALLOTMENT,
            closing_clips: DEFAULT_CLOSING_CLIPS,
        }
    }
}
