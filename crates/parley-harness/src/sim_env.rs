//! Virtual clock for deterministic simulation.
//!
//! Time only moves when the test (or [`crate::SimDriver`]) advances it, so
//! reconnect delays of several seconds run instantly and every run of a
//! scenario observes the same instants.

use std::{
    ops::{Add, Sub},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parley_core::{Environment, Timestamp};

/// Point on the virtual timeline, measured from the start of the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Instant `offset` after the start of the simulation.
    pub fn from_start(offset: Duration) -> Self {
        Self(offset)
    }

    /// Time since the start of the simulation.
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl Timestamp for SimInstant {
    fn saturating_add(self, delay: Duration) -> Self {
        self + delay
    }
}

/// Shared virtual clock.
///
/// Clones observe the same time. Sleeping advances the clock instead of
/// waiting.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    nanos: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock at the start of the simulation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let step = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(step)))
            .ok();
    }

    /// Move the clock forward to `instant`. Earlier instants are ignored.
    pub fn advance_to(&self, instant: SimInstant) {
        let target = u64::try_from(instant.0.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_max(target, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(Duration::from_nanos(self.nanos.load(Ordering::SeqCst)))
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}
