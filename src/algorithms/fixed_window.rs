// src/algorithms/fixed_window.rs

use super::super::algorithms::{lock, percent, RateLimitAlgorithm, RateLimitStatus};
use super::super::clock::{Clock, MonotonicClock};
use super::super::config::FixedWindowConfig;
use super::super::error::Result;
use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Fixed Window rate limiting algorithm
///
/// The fixed window algorithm divides time into fixed windows (e.g., 10 seconds)
/// and limits the number of requests in each window. The first window opens when
/// the counter is constructed, and a new one opens at the first admission attempt
/// after the current one has elapsed.
///
/// # Observed-but-not-committed expiry
///
/// Only [`allow_request`](Self::allow_request) (and the trait's admission methods)
/// commits a window reset. The read accessors report what a reset *would* yield
/// (count 0, nothing left until reset) for an expired window but leave the state
/// untouched, so the next admission still sees the expired window and resets it at
/// its own "now".
///
/// # Boundary effect
///
/// Up to `2 * limit` requests can be admitted within an arbitrarily short interval
/// that straddles a window edge. This is inherent to the algorithm.
#[derive(Debug)]
pub struct FixedWindowCounter<C = MonotonicClock>
where
    C: Clock,
{
    /// Configuration for the fixed window
    config: FixedWindowConfig,

    clock: C,

    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    count: u64,
    window_start: Instant,
}

/// Snapshot of the current window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedWindowInfo {
    pub count: u64,
    pub limit: u64,
    pub time_until_reset: Duration,
    pub utilization_percent: f64,
}

impl FixedWindowCounter<MonotonicClock> {
    pub fn new(config: FixedWindowConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<C> FixedWindowCounter<C>
where
    C: Clock,
{
    /// Creates a counter whose first window opens now
    pub fn with_clock(config: FixedWindowConfig, clock: C) -> Result<Self> {
        config.validate()?;
        debug!(
            limit = config.limit,
            window_ms = config.window.as_millis() as u64,
            "Fixed window counter created"
        );

        let state = WindowState {
            count: 0,
            window_start: clock.now(),
        };

        Ok(Self {
            config,
            clock,
            state: Mutex::new(state),
        })
    }

    pub fn limit(&self) -> u64 {
        self.config.limit
    }

    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Time left in the window, `None` once it has expired
    fn remaining_in_window(&self, state: &WindowState, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(state.window_start);
        self.config.window.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    /// Resets an expired window and admits if there is room. Returns the decision
    /// and the time left in the (possibly new) window.
    fn admit(&self, state: &mut WindowState) -> (bool, Duration) {
        let now = self.clock.now();
        let left = match self.remaining_in_window(state, now) {
            Some(left) => left,
            None => {
                state.window_start = now;
                state.count = 0;
                trace!("Fixed window rolled over");
                self.config.window
            }
        };

        let allowed = state.count < self.config.limit;
        if allowed {
            state.count += 1;
        }
        trace!(allowed, count = state.count, "Fixed window decision");
        (allowed, left)
    }

    pub fn allow_request(&self) -> bool {
        let mut state = lock(&self.state);
        self.admit(&mut state).0
    }

    /// Requests counted in the current window, 0 if it has expired (not committed)
    pub fn current_count(&self) -> u64 {
        let state = lock(&self.state);
        match self.remaining_in_window(&state, self.clock.now()) {
            Some(_) => state.count,
            None => 0,
        }
    }

    /// Time until the window resets, zero if it has already expired (not committed)
    pub fn time_until_reset(&self) -> Duration {
        let state = lock(&self.state);
        self.remaining_in_window(&state, self.clock.now())
            .unwrap_or(Duration::ZERO)
    }

    pub fn window_info(&self) -> FixedWindowInfo {
        let state = lock(&self.state);
        match self.remaining_in_window(&state, self.clock.now()) {
            Some(left) => FixedWindowInfo {
                count: state.count,
                limit: self.config.limit,
                time_until_reset: left,
                utilization_percent: percent(state.count as f64, self.config.limit as f64),
            },
            None => FixedWindowInfo {
                count: 0,
                limit: self.config.limit,
                time_until_reset: Duration::ZERO,
                utilization_percent: 0.0,
            },
        }
    }
}

impl<C> RateLimitAlgorithm for FixedWindowCounter<C>
where
    C: Clock,
{
    fn name(&self) -> &'static str {
        "fixed_window"
    }

    fn allow_request(&self) -> bool {
        FixedWindowCounter::allow_request(self)
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut state = lock(&self.state);
        let (allowed, left) = self.admit(&mut state);

        let remaining = self.config.limit.saturating_sub(state.count);
        RateLimitStatus {
            allowed,
            remaining,
            limit: self.config.limit,
            reset_after: if remaining > 0 { Duration::ZERO } else { left },
            details: Some(format!("window_resets_in_ms={}", left.as_millis())),
        }
    }

    fn utilization(&self) -> f64 {
        self.window_info().utilization_percent
    }

    fn time_until_available(&self) -> Option<Duration> {
        if self.config.limit == 0 {
            return None;
        }
        let state = lock(&self.state);
        match self.remaining_in_window(&state, self.clock.now()) {
            Some(left) if state.count >= self.config.limit => Some(left),
            _ => Some(Duration::ZERO),
        }
    }

    fn reset(&self) {
        let mut state = lock(&self.state);
        state.count = 0;
        state.window_start = self.clock.now();
        debug!("Fixed window counter reset");
    }
}
