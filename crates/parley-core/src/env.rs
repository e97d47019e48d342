//! Environment abstraction for deterministic testing.
//!
//! Decouples connection logic from the system clock. Production drivers use
//! `std::time::Instant` and tokio timers; the simulation harness uses a
//! virtual clock that only moves when the test advances it.

use std::{fmt::Debug, future::Future, ops::Sub, time::Duration};

/// Instant type accepted by the state machines.
///
/// Reconnect deadlines are computed from `now` and a policy delay, and the
/// delay is user-configurable, so advancing an instant must never overflow.
pub trait Timestamp: Copy + Ord + Send + Sync + Debug + Sub<Output = Duration> {
    /// `self + delay`, clamped at or near the latest representable instant.
    #[must_use]
    fn saturating_add(self, delay: Duration) -> Self;
}

impl Timestamp for std::time::Instant {
    fn saturating_add(self, delay: Duration) -> Self {
        // The platform bound on Instant is opaque, so halve until it fits.
        let mut step = delay;
        while !step.is_zero() {
            if let Some(later) = self.checked_add(step) {
                return later;
            }
            step /= 2;
        }
        self
    }
}

/// Abstract environment providing time and async sleep.
///
/// # Safety
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Timestamp;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; state machines never do.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Time remaining until `deadline`, zero if it has passed.
    fn until(&self, deadline: Self::Instant) -> Duration {
        let now = self.now();
        if deadline > now { deadline - now } else { Duration::ZERO }
    }
}
