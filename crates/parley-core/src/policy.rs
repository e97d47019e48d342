//! Reconnect scheduling policy.

use std::time::Duration;

/// Delay applied before the first retry when nothing else is configured.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// How long to wait before each reconnect attempt.
///
/// Retries are unbounded under every variant. A server that accepts the
/// socket and closes it immediately keeps the client cycling forever; with
/// [`ReconnectPolicy::FixedInterval`] that is one attempt per `delay`.
/// [`ReconnectPolicy::ExponentialBackoff`] bounds the rate at one attempt per
/// `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconnectPolicy {
    /// Same delay before every attempt.
    FixedInterval {
        /// Wait between a failure and the next attempt.
        delay: Duration,
    },
    /// Delay grows by `factor` per consecutive failure, capped at `max`.
    /// Resets after a successful open.
    ExponentialBackoff {
        /// Delay before the first attempt.
        initial: Duration,
        /// Upper bound on any single delay.
        max: Duration,
        /// Multiplier per consecutive failure.
        factor: f64,
    },
}

impl ReconnectPolicy {
    /// Fixed-interval policy.
    pub fn fixed(delay: Duration) -> Self {
        Self::FixedInterval { delay }
    }

    /// Delay before reconnect attempt number `attempt`, counting from 0 for
    /// the first retry after a successful open.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::FixedInterval { delay } => delay,
            Self::ExponentialBackoff { initial, max, factor } => {
                let exponent = attempt.min(64) as i32;
                let secs = initial.as_secs_f64() * factor.powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(secs.max(0.0))
                }
            },
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}
