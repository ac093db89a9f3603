use dotenv::dotenv;
use rate_limiter_algorithms::config::{
    AlgorithmConfig, FixedWindowConfig, LeakyBucketConfig, SlidingWindowLogConfig,
    TokenBucketConfig, ENV_ALGORITHM,
};
use rate_limiter_algorithms::{
    init_logging, FixedWindowCounter, LeakyBucket, SlidingWindowLog, TokenBucket,
};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const ENV_DEMO: &str = "RATE_LIMITER_DEMO";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    // An explicit limiter config wins over the demo defaults
    let config = if std::env::var(ENV_ALGORITHM).is_ok() {
        AlgorithmConfig::from_env()?
    } else {
        let demo = std::env::var(ENV_DEMO).unwrap_or_else(|_| "token_bucket".to_string());
        default_config(&demo)?
    };
    debug!(?config, "Configuration loaded");

    info!(algorithm = config.name(), "Rate limiter demo starting");
    println!("Rust project rate-limiter-algorithms");

    match config {
        AlgorithmConfig::TokenBucket(c) => token_bucket_demo(c)?,
        AlgorithmConfig::LeakyBucket(c) => leaky_bucket_demo(c)?,
        AlgorithmConfig::FixedWindow(c) => fixed_window_demo(c)?,
        AlgorithmConfig::SlidingWindowLog(c) => sliding_window_log_demo(c)?,
    }

    Ok(())
}

fn default_config(demo: &str) -> rate_limiter_algorithms::Result<AlgorithmConfig> {
    // 5 tokens, 1 per second; 5 units leaking 0.25 per second; 5 requests per 10s
    let (capacity, rate) = match demo {
        "leaky_bucket" => (5.0, 0.25),
        _ => (5.0, 1.0),
    };
    AlgorithmConfig::from_parts(demo, capacity, rate, 5, Duration::from_secs(10))
}

fn token_bucket_demo(config: TokenBucketConfig) -> rate_limiter_algorithms::Result<()> {
    let bucket = TokenBucket::new(config)?;

    println!("Token Bucket Rate Limiter Demo");
    println!(
        "Capacity: {}, Refill rate: {} per second",
        config.capacity, config.refill_rate
    );
    println!("Request interval: 500ms");
    println!("================================");

    for i in 0..10 {
        let verdict = if bucket.allow_request() {
            "allowed"
        } else {
            "denied"
        };
        println!(
            "Request {}: {} (tokens remaining: {:.2})",
            i + 1,
            verdict,
            bucket.tokens()
        );
        sleep(Duration::from_millis(500));
    }

    Ok(())
}

fn leaky_bucket_demo(config: LeakyBucketConfig) -> rate_limiter_algorithms::Result<()> {
    let bucket = LeakyBucket::new(config)?;

    println!("Leaky Bucket Rate Limiter Demo");
    println!(
        "Bucket capacity: {}, Leak rate: {} per second",
        config.capacity, config.leak_rate
    );
    println!("Request interval: 500ms");
    println!("================================");

    for i in 0..10 {
        let verdict = if bucket.allow_request() {
            "allowed"
        } else {
            "denied"
        };
        println!(
            "Request {}: {} (water level: {:.2}/{:.0}, usage: {:.1}%)",
            i + 1,
            verdict,
            bucket.water_level(),
            bucket.capacity(),
            bucket.capacity_used()
        );
        sleep(Duration::from_millis(500));
    }

    println!("\nWaiting 3 seconds to see bucket drain...");
    sleep(Duration::from_secs(3));
    println!(
        "Final water level: {:.2}/{:.0} ({:.1}% full)",
        bucket.water_level(),
        bucket.capacity(),
        bucket.capacity_used()
    );

    Ok(())
}

fn fixed_window_demo(config: FixedWindowConfig) -> rate_limiter_algorithms::Result<()> {
    let window = FixedWindowCounter::new(config)?;

    println!("Fixed Window Counter Rate Limiter Demo");
    println!(
        "Limit: {} requests per {} seconds",
        config.limit,
        config.window.as_secs_f64()
    );
    println!("Request interval: 2 seconds");
    println!("=====================================");

    for i in 0..12 {
        // Snapshot before the request, as a caller deciding whether to send it would
        let info = window.window_info();

        if window.allow_request() {
            println!(
                "Request {:2}: allowed  (count: {}/{}, utilization: {:5.1}%, reset in: {:6.1}s)",
                i + 1,
                info.count + 1,
                info.limit,
                info.utilization_percent,
                info.time_until_reset.as_secs_f64()
            );
        } else {
            println!(
                "Request {:2}: denied   (count: {}/{}, utilization: {:5.1}%, reset in: {:6.1}s)",
                i + 1,
                info.count,
                info.limit,
                info.utilization_percent,
                info.time_until_reset.as_secs_f64()
            );
        }

        if i == 4 {
            println!("--- Window will reset after next request ---");
        }

        sleep(Duration::from_secs(2));
    }

    println!("\nFinal window state:");
    let info = window.window_info();
    println!(
        "Count: {}/{}, Utilization: {:.1}%, Time until reset: {:.1}s",
        info.count,
        info.limit,
        info.utilization_percent,
        info.time_until_reset.as_secs_f64()
    );

    Ok(())
}

fn sliding_window_log_demo(config: SlidingWindowLogConfig) -> rate_limiter_algorithms::Result<()> {
    let log = SlidingWindowLog::new(config)?;

    println!("Sliding Window Log Rate Limiter Demo");
    println!(
        "Limit: {} requests per {} seconds",
        config.limit,
        config.window.as_secs_f64()
    );
    println!("Request interval: 2 seconds");
    println!("====================================");

    for i in 0..12 {
        let info = log.window_info();
        let next_slot = log.time_until_slot_available();

        if log.allow_request() {
            println!(
                "Request {:2}: allowed  (count: {}/{}, util: {:5.1}%, oldest: {:4.1}s ago)",
                i + 1,
                info.count + 1,
                info.limit,
                info.utilization_percent,
                info.oldest_age.as_secs_f64()
            );
        } else {
            let next_slot = next_slot
                .map(|d| format!("{:4.1}s", d.as_secs_f64()))
                .unwrap_or_else(|| "never".to_string());
            println!(
                "Request {:2}: denied   (count: {}/{}, util: {:5.1}%, next slot in: {})",
                i + 1,
                info.count,
                info.limit,
                info.utilization_percent,
                next_slot
            );
        }

        if i == 4 {
            println!("--- Notice how the window slides continuously ---");
        }

        sleep(Duration::from_secs(2));
    }

    println!("\nRequest timeline in current window:");
    let now = Instant::now();
    for (i, ts) in log.request_timestamps().iter().enumerate() {
        println!(
            "Request {}: {:.1}s ago",
            i + 1,
            now.saturating_duration_since(*ts).as_secs_f64()
        );
    }

    Ok(())
}
