//! Environment abstraction for deterministic testing.
//!
//! Decouples office hours logic from system resources (time, randomness).
//! Production uses the system clock and OS entropy; simulation uses a virtual
//! clock that only moves when the test advances it and a seeded RNG.

use std::time::Duration;

use crate::time::Timestamp;

/// Abstract environment providing time, randomness, and async sleeping.
///
/// Implementations MUST guarantee that `now()` never goes backwards within a
/// single execution context.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;

    /// Sleeps for the specified duration.
    ///
    /// Only runtime code (timer tasks) awaits this. State machines never do.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// Given the same seed, a simulated environment produces the same bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
