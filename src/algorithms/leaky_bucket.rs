// src/algorithms/leaky_bucket.rs

use crate::algorithms::{duration_ceil, lock, percent, RateLimitAlgorithm, RateLimitStatus};
use crate::clock::{elapsed_secs, Clock, MonotonicClock};
use crate::config::LeakyBucketConfig;
use crate::error::Result;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Leaky Bucket rate limiting algorithm
///
/// Every admitted request pours one unit of water into the bucket, and the bucket
/// drains at `leak_rate` units per second. A request is admitted while the level,
/// measured before pouring, is below capacity. The level can therefore reach
/// `capacity` exactly but never go past it. Bursts are smoothed into the leak rate.
#[derive(Debug)]
pub struct LeakyBucket<C = MonotonicClock>
where
    C: Clock,
{
    config: LeakyBucketConfig,
    clock: C,
    state: Mutex<WaterState>,
}

#[derive(Debug)]
struct WaterState {
    water: f64,
    last_leak: Instant,
}

impl LeakyBucket<MonotonicClock> {
    pub fn new(config: LeakyBucketConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<C> LeakyBucket<C>
where
    C: Clock,
{
    /// Creates an empty bucket reading time from `clock`
    pub fn with_clock(config: LeakyBucketConfig, clock: C) -> Result<Self> {
        config.validate()?;
        debug!(
            capacity = config.capacity,
            leak_rate = config.leak_rate,
            "Leaky bucket created"
        );

        let state = WaterState {
            water: 0.0,
            last_leak: clock.now(),
        };

        Ok(Self {
            config,
            clock,
            state: Mutex::new(state),
        })
    }

    pub fn capacity(&self) -> f64 {
        self.config.capacity
    }

    pub fn leak_rate(&self) -> f64 {
        self.config.leak_rate
    }

    fn leak(&self, state: &mut WaterState, now: Instant) {
        let leaked = elapsed_secs(state.last_leak, now) * self.config.leak_rate;
        state.water = (state.water - leaked).max(0.0);
        state.last_leak = now;
    }

    fn available_after(&self, water: f64) -> Option<Duration> {
        if water < self.config.capacity {
            Some(Duration::ZERO)
        } else if self.config.leak_rate > 0.0 && self.config.capacity > 0.0 {
            // The level must drop strictly below capacity
            let excess = water - self.config.capacity;
            let wait = duration_ceil(excess / self.config.leak_rate);
            Some(wait.saturating_add(Duration::from_nanos(1)))
        } else {
            None
        }
    }

    fn admit(&self, state: &mut WaterState) -> bool {
        self.leak(state, self.clock.now());

        let allowed = state.water < self.config.capacity;
        if allowed {
            state.water += 1.0;
        }
        trace!(allowed, water = state.water, "Leaky bucket decision");
        allowed
    }

    pub fn allow_request(&self) -> bool {
        let mut state = lock(&self.state);
        self.admit(&mut state)
    }

    /// Current water level, drained first (advances the leak clock)
    pub fn water_level(&self) -> f64 {
        let mut state = lock(&self.state);
        self.leak(&mut state, self.clock.now());
        state.water
    }

    /// Water level as a percentage of capacity, drained first
    pub fn capacity_used(&self) -> f64 {
        let mut state = lock(&self.state);
        self.leak(&mut state, self.clock.now());
        percent(state.water, self.config.capacity)
    }

    /// Time until the level drops below capacity, `None` if it never drains
    pub fn time_until_available(&self) -> Option<Duration> {
        let mut state = lock(&self.state);
        self.leak(&mut state, self.clock.now());
        self.available_after(state.water)
    }
}

impl<C> RateLimitAlgorithm for LeakyBucket<C>
where
    C: Clock,
{
    fn name(&self) -> &'static str {
        "leaky_bucket"
    }

    fn allow_request(&self) -> bool {
        LeakyBucket::allow_request(self)
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut state = lock(&self.state);
        let allowed = self.admit(&mut state);

        let headroom = (self.config.capacity - state.water).max(0.0);
        RateLimitStatus {
            allowed,
            remaining: headroom.ceil() as u64,
            limit: self.config.capacity.ceil() as u64,
            reset_after: self.available_after(state.water).unwrap_or(Duration::MAX),
            details: Some(format!("water={:.3}", state.water)),
        }
    }

    fn utilization(&self) -> f64 {
        self.capacity_used()
    }

    fn time_until_available(&self) -> Option<Duration> {
        LeakyBucket::time_until_available(self)
    }

    fn reset(&self) {
        let mut state = lock(&self.state);
        state.water = 0.0;
        state.last_leak = self.clock.now();
        debug!("Leaky bucket reset");
    }
}
