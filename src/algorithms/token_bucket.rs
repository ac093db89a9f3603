// src/algorithms/token_bucket.rs

use crate::algorithms::{duration_ceil, lock, percent, RateLimitAlgorithm, RateLimitStatus};
use crate::clock::{elapsed_secs, Clock, MonotonicClock};
use crate::config::TokenBucketConfig;
use crate::error::Result;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Token Bucket rate limiting algorithm
///
/// The token bucket algorithm works by maintaining a "bucket" of tokens that are
/// replenished at a constant rate. Each request consumes a token, and if there
/// are no tokens available, the request is rejected. The bucket starts full, so
/// bursts of up to `capacity` requests are admitted at once.
#[derive(Debug)]
pub struct TokenBucket<C = MonotonicClock>
where
    C: Clock,
{
    /// Configuration for the token bucket
    config: TokenBucketConfig,

    clock: C,

    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket<MonotonicClock> {
    /// Creates a full token bucket on the monotonic clock
    pub fn new(config: TokenBucketConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<C> TokenBucket<C>
where
    C: Clock,
{
    /// Creates a full token bucket reading time from `clock`
    pub fn with_clock(config: TokenBucketConfig, clock: C) -> Result<Self> {
        config.validate()?;
        debug!(
            capacity = config.capacity,
            refill_rate = config.refill_rate,
            "Token bucket created"
        );

        let state = BucketState {
            tokens: config.capacity,
            last_refill: clock.now(),
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

    pub fn refill_rate(&self) -> f64 {
        self.config.refill_rate
    }

    /// Adds the tokens earned since the last refill, capped at capacity
    fn refill(&self, state: &mut BucketState, now: Instant) {
        let earned = elapsed_secs(state.last_refill, now) * self.config.refill_rate;
        state.tokens = self.config.capacity.min(state.tokens + earned);
        state.last_refill = now;
    }

    fn next_token_after(&self, tokens: f64) -> Option<Duration> {
        if tokens >= 1.0 {
            Some(Duration::ZERO)
        } else if self.config.refill_rate > 0.0 && self.config.capacity >= 1.0 {
            Some(duration_ceil((1.0 - tokens) / self.config.refill_rate))
        } else {
            None
        }
    }

    /// Consumes one token if available
    pub fn allow_request(&self) -> bool {
        let mut state = lock(&self.state);
        self.refill(&mut state, self.clock.now());

        let allowed = state.tokens >= 1.0;
        if allowed {
            state.tokens -= 1.0;
        }
        trace!(allowed, tokens = state.tokens, "Token bucket decision");
        allowed
    }

    /// Current token level.
    ///
    /// This read refills the bucket first, so it advances the refill clock.
    pub fn tokens(&self) -> f64 {
        let mut state = lock(&self.state);
        self.refill(&mut state, self.clock.now());
        state.tokens
    }

    /// Time until one whole token is available, `None` if the bucket never refills
    pub fn time_until_next_token(&self) -> Option<Duration> {
        let mut state = lock(&self.state);
        self.refill(&mut state, self.clock.now());
        self.next_token_after(state.tokens)
    }
}

impl<C> RateLimitAlgorithm for TokenBucket<C>
where
    C: Clock,
{
    fn name(&self) -> &'static str {
        "token_bucket"
    }

    fn allow_request(&self) -> bool {
        TokenBucket::allow_request(self)
    }

    fn check_and_record(&self) -> RateLimitStatus {
        let mut state = lock(&self.state);
        self.refill(&mut state, self.clock.now());

        let allowed = state.tokens >= 1.0;
        if allowed {
            state.tokens -= 1.0;
        }

        RateLimitStatus {
            allowed,
            remaining: state.tokens.floor() as u64,
            limit: self.config.capacity.floor() as u64,
            reset_after: self
                .next_token_after(state.tokens)
                .unwrap_or(Duration::MAX),
            details: Some(format!("tokens={:.3}", state.tokens)),
        }
    }

    fn utilization(&self) -> f64 {
        let mut state = lock(&self.state);
        self.refill(&mut state, self.clock.now());
        percent(self.config.capacity - state.tokens, self.config.capacity)
    }

    fn time_until_available(&self) -> Option<Duration> {
        self.time_until_next_token()
    }

    fn reset(&self) {
        let mut state = lock(&self.state);
        state.tokens = self.config.capacity;
        state.last_refill = self.clock.now();
        debug!("Token bucket reset");
    }
}
