// for error definitions
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateLimiterError {
    /// Returned when a request is denied by `record_request`
    #[error("Rate limit exceeded: {0}")]
    LimitExceeded(String),

    /// Invalid limiter parameters, rejected at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment error: {var}: {reason}")]
    Env { var: String, reason: String },
}

impl RateLimiterError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        RateLimiterError::Config(msg.into())
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, RateLimiterError>;
