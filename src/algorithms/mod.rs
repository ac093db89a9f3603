// src/algorithms/mod.rs

pub mod fixed_window;
pub mod leaky_bucket;
pub mod sliding_window_log;
pub mod token_bucket;

#[cfg(test)]
mod tests;

pub use fixed_window::{FixedWindowCounter, FixedWindowInfo};
pub use leaky_bucket::LeakyBucket;
pub use sliding_window_log::{SlidingWindowInfo, SlidingWindowLog};
pub use token_bucket::TokenBucket;

use super::error::{RateLimiterError, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Status returned by rate limiting operations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStatus {
    /// Whether the request was allowed
    pub allowed: bool,

    /// Requests that would still be admitted right now
    pub remaining: u64,

    /// Total capacity of the rate limiter
    pub limit: u64,

    /// Time until the next request can be admitted (zero if one can be admitted now)
    pub reset_after: Duration,

    /// Optional details specific to the algorithm
    pub details: Option<String>,
}

/// Core trait that all rate limiting algorithms implement
///
/// Every method takes the limiter's lock for its entire body, so each call observes
/// and updates a consistent state even with many concurrent callers.
pub trait RateLimitAlgorithm: Send + Sync + Debug {
    /// Stable algorithm name, matching the config tag
    fn name(&self) -> &'static str;

    /// Admits or denies one request, recording it if admitted
    fn allow_request(&self) -> bool;

    /// Combined operation to check if a request is allowed and record it if it is.
    /// Returns information about whether the request was allowed and current limit state
    fn check_and_record(&self) -> RateLimitStatus;

    /// Percentage of the limiter's capacity currently in use
    fn utilization(&self) -> f64;

    /// Time until a request would be admitted, `None` if that can never happen
    fn time_until_available(&self) -> Option<Duration>;

    /// Returns the limiter to its freshly constructed state
    fn reset(&self);

    /// Like [`allow_request`](Self::allow_request), reporting a denial as an error
    fn record_request(&self) -> Result<()> {
        if self.allow_request() {
            Ok(())
        } else {
            Err(RateLimiterError::LimitExceeded(format!(
                "{} denied the request",
                self.name()
            )))
        }
    }
}

/// Locks limiter state, recovering it if another caller panicked while holding it.
///
/// State updates never panic halfway, so a poisoned guard still holds valid state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Converts seconds to a duration, rounding up to the next nanosecond.
pub(crate) fn duration_ceil(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    let nanos = (secs * 1e9).ceil();
    if nanos >= u64::MAX as f64 {
        return Duration::MAX;
    }
    Duration::from_nanos(nanos as u64)
}

pub(crate) fn percent(used: f64, total: f64) -> f64 {
    if total > 0.0 {
        used / total * 100.0
    } else {
        0.0
    }
}
