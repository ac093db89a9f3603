use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=debug,rate_limiter_algorithms=trace
pub fn init() {
    init_with_default("info");
}

/// Same as [`init`], with a caller-chosen filter used when RUST_LOG is unset.
pub fn init_with_default(default_filter: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true) // concurrent callers share one limiter
                    .with_line_number(true),
            )
            .try_init();

        // An embedding application may already own the global subscriber
        if let Err(e) = installed {
            tracing::debug!(error = %e, "Keeping existing global subscriber");
        }
        tracing::info!("Logging initialized");
    });
}

/// Macro for logging one admission decision
#[macro_export]
macro_rules! rate_limit_event {
    ($algorithm:expr, $status:expr) => {
        tracing::info!(
            algorithm = $algorithm,
            allowed = $status.allowed,
            remaining = $status.remaining,
            limit = $status.limit,
            reset_after_ms = $status.reset_after.as_millis() as u64,
            "Rate limit check"
        )
    };
}
