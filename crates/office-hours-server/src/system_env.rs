//! Production Environment implementation using the system clock and OS RNG.
//!
//! `SystemEnv` reads wall-clock time (timeslots and break ends are calendar
//! times), sleeps on the tokio timer and draws randomness from getrandom.
//! Production behavior is therefore not reproducible; simulations use a
//! virtual clock instead.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use office_hours_core::{Environment, Timestamp};

/// Production environment using system time and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. RNG failure indicates an OS-level problem and
/// the process cannot continue meaningfully.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Timestamp {
        // a clock set before 1970 reads as the epoch
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Timestamp::from_millis(u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX))
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
