// src/algorithms/sliding_window_log.rs

use crate::algorithms::{lock, percent, RateLimitAlgorithm, RateLimitStatus};
use crate::clock::{Clock, MonotonicClock};
use crate::config::SlidingWindowLogConfig;
use crate::error::Result;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Sliding Window Log rate limiting algorithm
///
/// Keeps the timestamp of every admitted request that is still inside the trailing
/// window. A request is admitted while fewer than `limit` timestamps remain. Unlike
/// the fixed window there is no boundary burst: any interval of length `window`
/// contains at most `limit` admissions.
///
/// Timestamps are appended at the back and pruned at the front under the same lock,
/// so the log is always sorted and never longer than `limit`. Pruning stops at the
/// first timestamp still inside the window, which makes admission amortized O(1)
/// and O(limit) in the worst case.
///
/// Every read accessor prunes first, so reads also drop expired entries.
#[derive(Debug)]
pub struct SlidingWindowLog<C = MonotonicClock>
where
    C: Clock,
{
    /// Configuration for the sliding window
    config: SlidingWindowLogConfig,

    clock: C,

    requests: Mutex<VecDeque<Instant>>,
}

/// Snapshot of the trailing window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlidingWindowInfo {
    pub count: usize,
    pub limit: u64,
    pub utilization_percent: f64,
    pub oldest_age: Duration,
}

impl SlidingWindowLog<MonotonicClock> {
    pub fn new(config: SlidingWindowLogConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<C> SlidingWindowLog<C>
where
    C: Clock,
{
    pub fn with_clock(config: SlidingWindowLogConfig, clock: C) -> Result<Self> {
        config.validate()?;
        debug!(
            limit = config.limit,
            window_ms = config.window.as_millis() as u64,
            "Sliding window log created"
        );

        // Bounded by limit; cap the upfront allocation for huge limits
        let reserve = usize::try_from(config.limit).unwrap_or(usize::MAX).min(10_000);

        Ok(Self {
            config,
            clock,
            requests: Mutex::new(VecDeque::with_capacity(reserve)),
        })
    }

    pub fn limit(&self) -> u64 {
        self.config.limit
    }

    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Drops timestamps at or before `now - window`
    fn cleanup_old_requests(&self, requests: &mut VecDeque<Instant>, now: Instant) {
        let before = requests.len();
        while let Some(&oldest) = requests.front() {
            if now.saturating_duration_since(oldest) < self.config.window {
                break;
            }
            requests.pop_front();
        }
        let pruned = before - requests.len();
        if pruned > 0 {
            trace!(pruned, "Sliding window pruned expired requests");
        }
    }

    fn has_room(&self, requests: &VecDeque<Instant>) -> bool {
        (requests.len() as u64) < self.config.limit
    }

    fn slot_available_after(&self, requests: &VecDeque<Instant>, now: Instant) -> Option<Duration> {
        if self.has_room(requests) {
            return Some(Duration::ZERO);
        }
        requests.front().map(|&oldest| {
            self.config
                .window
                .saturating_sub(now.saturating_duration_since(oldest))
        })
    }

    fn admit(&self, requests: &mut VecDeque<Instant>, now: Instant) -> bool {
        self.cleanup_old_requests(requests, now);

        let allowed = self.has_room(requests);
        if allowed {
            requests.push_back(now);
        }
        trace!(allowed, count = requests.len(), "Sliding window decision");
        allowed
    }

    pub fn allow_request(&self) -> bool {
        let mut requests = lock(&self.requests);
        self.admit(&mut requests, self.clock.now())
    }

    /// Number of admissions inside the trailing window
    pub fn current_count(&self) -> usize {
        let mut requests = lock(&self.requests);
        self.cleanup_old_requests(&mut requests, self.clock.now());
        requests.len()
    }

    /// Age of the oldest retained admission, zero when the log is empty
    pub fn oldest_request_age(&self) -> Duration {
        let mut requests = lock(&self.requests);
        let now = self.clock.now();
        self.cleanup_old_requests(&mut requests, now);
        requests
            .front()
            .map(|&oldest| now.saturating_duration_since(oldest))
            .unwrap_or(Duration::ZERO)
    }

    /// Time until the oldest admission leaves the window.
    ///
    /// Zero when under the limit; `None` for a zero limit, which never admits.
    pub fn time_until_slot_available(&self) -> Option<Duration> {
        let mut requests = lock(&self.requests);
        let now = self.clock.now();
        self.cleanup_old_requests(&mut requests, now);
        self.slot_available_after(&requests, now)
    }

    pub fn window_info(&self) -> SlidingWindowInfo {
        let mut requests = lock(&self.requests);
        let now = self.clock.now();
        self.cleanup_old_requests(&mut requests, now);

        let count = requests.len();
        SlidingWindowInfo {
            count,
            limit: self.config.limit,
            utilization_percent: percent(count as f64, self.config.limit as f64),
            oldest_age: requests
                .front()
                .map(|&oldest| now.saturating_duration_since(oldest))
                .unwrap_or(Duration::ZERO),
        }
    }

    /// Timestamps of the admissions inside the window, oldest first
    pub fn request_timestamps(&self) -> Vec<Instant> {
        let mut requests = lock(&self.requests);
        self.cleanup_old_requests(&mut requests, self.clock.now());
        requests.iter().copied().collect()
    }
}

impl<C> RateLimitAlgorithm for SlidingWindowLog<C>
where
    C: Clock,
{
    fn name(&self) -> &'static str {
        "sliding_window_log"
    }

    fn allow_request(&self) -> bool {
        SlidingWindowLog::allow_request(self)
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut requests = lock(&self.requests);
        let now = self.clock.now();
        let allowed = self.admit(&mut requests, now);

        RateLimitStatus {
            allowed,
            remaining: self.config.limit.saturating_sub(requests.len() as u64),
            limit: self.config.limit,
            reset_after: self
                .slot_available_after(&requests, now)
                .unwrap_or(Duration::MAX),
            details: Some(format!("logged={}", requests.len())),
        }
    }

    fn utilization(&self) -> f64 {
        self.window_info().utilization_percent
    }

    fn time_until_available(&self) -> Option<Duration> {
        self.time_until_slot_available()
    }

    fn reset(&self) {
        lock(&self.requests).clear();
        debug!("Sliding window log reset");
    }
}
