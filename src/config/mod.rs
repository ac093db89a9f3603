// src/config/mod.rs

use crate::algorithms::{
    FixedWindowCounter, LeakyBucket, RateLimitAlgorithm, SlidingWindowLog, TokenBucket,
};
use crate::error::{RateLimiterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const ENV_ALGORITHM: &str = "RATE_LIMITER_ALGORITHM";
pub const ENV_CAPACITY: &str = "RATE_LIMITER_CAPACITY";
pub const ENV_RATE: &str = "RATE_LIMITER_RATE";
pub const ENV_LIMIT: &str = "RATE_LIMITER_LIMIT";
pub const ENV_WINDOW_MS: &str = "RATE_LIMITER_WINDOW_MS";

/// Configuration for token bucket algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenBucketConfig {
    /// Capacity of the token bucket, also the initial token count
    pub capacity: f64,

    /// Rate at which tokens are refilled (tokens per second)
    pub refill_rate: f64,
}

impl TokenBucketConfig {
    pub fn validate(&self) -> Result<()> {
        check_amount("capacity", self.capacity)?;
        check_amount("refill_rate", self.refill_rate)
    }
}

/// Configuration for leaky bucket algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakyBucketConfig {
    /// Maximum water level
    pub capacity: f64,

    /// Rate at which the bucket drains (units per second)
    pub leak_rate: f64,
}

impl LeakyBucketConfig {
    pub fn validate(&self) -> Result<()> {
        check_amount("capacity", self.capacity)?;
        check_amount("leak_rate", self.leak_rate)
    }
}

/// Configuration for fixed window algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedWindowConfig {
    /// Maximum number of requests allowed in the window
    pub limit: u64,

    /// Window duration
    #[serde(with = "duration_millis")]
    pub window: Duration,
}

impl FixedWindowConfig {
    pub fn validate(&self) -> Result<()> {
        check_window(self.window)
    }
}

/// Configuration for sliding window log algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlidingWindowLogConfig {
    /// Maximum number of requests retained in the window
    pub limit: u64,

    /// Window duration
    #[serde(with = "duration_millis")]
    pub window: Duration,
}

impl SlidingWindowLogConfig {
    pub fn validate(&self) -> Result<()> {
        check_window(self.window)
    }
}

fn check_amount(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(RateLimiterError::config(format!(
            "{} must be finite, got {}",
            name, value
        )));
    }
    if value < 0.0 {
        return Err(RateLimiterError::config(format!(
            "{} must not be negative, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_window(window: Duration) -> Result<()> {
    if window.is_zero() {
        return Err(RateLimiterError::config("window must be greater than zero"));
    }
    Ok(())
}

/// One limiter configuration, tagged with the algorithm it selects.
///
/// ```json
/// { "algorithm": "sliding_window_log", "limit": 5, "window": 10000 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    TokenBucket(TokenBucketConfig),
    LeakyBucket(LeakyBucketConfig),
    FixedWindow(FixedWindowConfig),
    SlidingWindowLog(SlidingWindowLogConfig),
}

impl AlgorithmConfig {
    pub const NAMES: [&'static str; 4] = [
        "token_bucket",
        "leaky_bucket",
        "fixed_window",
        "sliding_window_log",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmConfig::TokenBucket(_) => "token_bucket",
            AlgorithmConfig::LeakyBucket(_) => "leaky_bucket",
            AlgorithmConfig::FixedWindow(_) => "fixed_window",
            AlgorithmConfig::SlidingWindowLog(_) => "sliding_window_log",
        }
    }

    /// Builds a config from the `--algorithm` style name plus the generic knobs.
    ///
    /// Buckets use `capacity` and `rate`; windows use `limit` and `window`.
    pub fn from_parts(
        algorithm: &str,
        capacity: f64,
        rate: f64,
        limit: u64,
        window: Duration,
    ) -> Result<Self> {
        let config = match algorithm {
            "token_bucket" => AlgorithmConfig::TokenBucket(TokenBucketConfig {
                capacity,
                refill_rate: rate,
            }),
            "leaky_bucket" => AlgorithmConfig::LeakyBucket(LeakyBucketConfig {
                capacity,
                leak_rate: rate,
            }),
            "fixed_window" => AlgorithmConfig::FixedWindow(FixedWindowConfig { limit, window }),
            "sliding_window_log" => {
                AlgorithmConfig::SlidingWindowLog(SlidingWindowLogConfig { limit, window })
            }
            other => {
                return Err(RateLimiterError::config(format!(
                    "unknown algorithm '{}', expected one of {:?}",
                    other,
                    Self::NAMES
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AlgorithmConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading limiter config");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Reads the `RATE_LIMITER_*` variables. Only the ones the chosen algorithm
    /// uses are required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let algorithm = lookup(ENV_ALGORITHM).ok_or_else(|| missing(ENV_ALGORITHM))?;
        let is_bucket = matches!(algorithm.as_str(), "token_bucket" | "leaky_bucket");

        let (capacity, rate, limit, window) = if is_bucket {
            (
                parse_var::<f64, _>(&lookup, ENV_CAPACITY)?,
                parse_var::<f64, _>(&lookup, ENV_RATE)?,
                0,
                Duration::ZERO,
            )
        } else {
            (
                0.0,
                0.0,
                parse_var::<u64, _>(&lookup, ENV_LIMIT)?,
                Duration::from_millis(parse_var::<u64, _>(&lookup, ENV_WINDOW_MS)?),
            )
        };

        Self::from_parts(&algorithm, capacity, rate, limit, window)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            AlgorithmConfig::TokenBucket(c) => c.validate(),
            AlgorithmConfig::LeakyBucket(c) => c.validate(),
            AlgorithmConfig::FixedWindow(c) => c.validate(),
            AlgorithmConfig::SlidingWindowLog(c) => c.validate(),
        }
    }

    /// Constructs the limiter this config describes, on the monotonic clock.
    pub fn build(self) -> Result<Box<dyn RateLimitAlgorithm>> {
        let limiter: Box<dyn RateLimitAlgorithm> = match self {
            AlgorithmConfig::TokenBucket(c) => Box::new(TokenBucket::new(c)?),
            AlgorithmConfig::LeakyBucket(c) => Box::new(LeakyBucket::new(c)?),
            AlgorithmConfig::FixedWindow(c) => Box::new(FixedWindowCounter::new(c)?),
            AlgorithmConfig::SlidingWindowLog(c) => Box::new(SlidingWindowLog::new(c)?),
        };
        Ok(limiter)
    }
}

fn missing(var: &str) -> RateLimiterError {
    RateLimiterError::Env {
        var: var.to_string(),
        reason: "not set".to_string(),
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(var).ok_or_else(|| missing(var))?;
    raw.trim().parse::<T>().map_err(|e| RateLimiterError::Env {
        var: var.to_string(),
        reason: format!("cannot parse '{}': {}", raw, e),
    })
}

// Durations travel as whole milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
