// src/clock.rs

use std::fmt::Debug;
use std::time::Instant;

/// Source of "now" for the limiters.
///
/// Every limiter reads the clock exactly once per operation, while holding its lock.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// Monotonic process clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Seconds elapsed between two readings, zero if `now` is not after `earlier`.
pub(crate) fn elapsed_secs(earlier: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(earlier).as_secs_f64()
}
