// library entry
pub mod algorithms;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use algorithms::{
    FixedWindowCounter, LeakyBucket, RateLimitAlgorithm, RateLimitStatus, SlidingWindowLog,
    TokenBucket,
};
pub use clock::{Clock, MonotonicClock};
pub use config::AlgorithmConfig;
pub use error::{RateLimiterError, Result};
pub use logging::init as init_logging;
