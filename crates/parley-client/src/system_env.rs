//! Production Environment implementation using system time.
//!
//! `SystemEnv` uses `std::time::Instant` for the connection clock and tokio
//! timers for waiting on reconnect deadlines. Time advances on its own, so
//! behavior under it is not reproducible; tests use the virtual clock in the
//! simulation harness instead.

use std::time::Duration;

use parley_core::Environment;

/// Production environment using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
