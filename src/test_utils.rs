// src/test_utils.rs

use super::algorithms::RateLimitAlgorithm;
use super::clock::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Helper struct for testing rate limiters with controlled time.
///
/// Clones share the same "now", so a test keeps one handle and gives another to
/// the limiter.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_time: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock().unwrap();
        *time += duration;
    }

    pub fn advance_secs_f64(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }

    pub fn now(&self) -> Instant {
        *self.current_time.lock().unwrap()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        ManualClock::now(self)
    }
}

/// Issues `count` admissions back to back and returns how many were allowed
pub fn admit_burst<A>(limiter: &A, count: usize) -> usize
where
    A: RateLimitAlgorithm + ?Sized,
{
    (0..count).filter(|_| limiter.allow_request()).count()
}

/// Runs `request_count` admissions, calling `between` after each one, and checks
/// the number allowed.
pub fn test_rate_limit_scenario<A, F>(
    limiter: &A,
    request_count: usize,
    expected_allowed: usize,
    mut between: F,
) -> bool
where
    A: RateLimitAlgorithm + ?Sized,
    F: FnMut(usize),
{
    let mut allowed_count = 0;

    for i in 0..request_count {
        let status = limiter.check_and_record();
        if status.allowed {
            allowed_count += 1;
        }
        between(i);
    }

    allowed_count == expected_allowed
}
