// src/bin/rate_limiter_cli.rs

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::time;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rate_limiter_algorithms::config::AlgorithmConfig;
use rate_limiter_algorithms::{rate_limit_event, RateLimitAlgorithm, RateLimitStatus};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rate_limiter_cli",
    about = "A CLI for testing rate limiting algorithms"
)]
struct Opt {
    /// Rate limiting algorithm to use
    #[structopt(short, long, possible_values = &AlgorithmConfig::NAMES, default_value = "fixed_window")]
    algorithm: String,

    /// JSON limiter config; overrides the algorithm and limit flags
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Bucket capacity (token_bucket, leaky_bucket)
    #[structopt(long, default_value = "10")]
    capacity: f64,

    /// Refill or leak rate per second (token_bucket, leaky_bucket)
    #[structopt(short, long, default_value = "1.0")]
    rate: f64,

    /// Maximum number of requests per window (fixed_window, sliding_window_log)
    #[structopt(short, long, default_value = "10")]
    limit: u64,

    /// Window duration in seconds (fixed_window, sliding_window_log)
    #[structopt(short, long, default_value = "60")]
    window_seconds: u64,

    /// Simulation mode
    #[structopt(long, possible_values = &["burst", "steady", "sine_wave", "custom"], default_value = "burst")]
    simulation: String,

    /// Number of requests to simulate
    #[structopt(short = "n", long, default_value = "20")]
    num_requests: usize,

    /// Time between requests in milliseconds (for steady and sine_wave modes)
    #[structopt(short = "t", long, default_value = "100")]
    request_interval_ms: u64,

    /// Print each status as a JSON line
    #[structopt(long)]
    json: bool,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

#[derive(Debug, Default)]
struct Tally {
    allowed: usize,
    denied: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let opt = Opt::from_args();

    let log_level = if opt.disable_logs {
        "error"
    } else {
        match opt.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "rate_limiter_cli={},rate_limiter_algorithms={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &opt.config {
        Some(path) => AlgorithmConfig::from_file(path)?,
        None => AlgorithmConfig::from_parts(
            &opt.algorithm,
            opt.capacity,
            opt.rate,
            opt.limit,
            Duration::from_secs(opt.window_seconds),
        )?,
    };
    info!("Starting rate limiter CLI with {} algorithm", config.name());
    info!("Configuration: {}", serde_json::to_string(&config)?);

    let limiter = config.build().map_err(|e| {
        error!("Invalid limiter configuration: {}", e);
        e
    })?;

    // Ctrl-C ends the running simulation; the summary is still printed
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let start_time = Instant::now();
    let tally = match opt.simulation.as_str() {
        "burst" => simulate_burst(&opt, limiter.as_ref(), &stop),
        "steady" => simulate_paced(&opt, limiter.as_ref(), &stop, |_| 1.0).await,
        "sine_wave" => {
            let n = opt.num_requests.max(1) as f64;
            simulate_paced(&opt, limiter.as_ref(), &stop, move |i| {
                // Full cycle over the run, interval between 0.5x and 1.5x the base
                let phase = (i as f64 * std::f64::consts::PI * 2.0) / n;
                1.0 + 0.5 * phase.sin()
            })
            .await
        }
        "custom" => simulate_custom(&opt, limiter.as_ref(), &stop)?,
        other => {
            error!("Unknown simulation mode: {}", other);
            return Err("Unknown simulation mode".into());
        }
    };

    println!("\n{} Simulation Results:", opt.simulation);
    println!("-------------------------");
    println!("Algorithm: {}", limiter.name());
    println!("Allowed: {}", tally.allowed);
    println!("Denied: {}", tally.denied);
    println!("Utilization: {:.1}%", limiter.utilization());
    println!("Time elapsed: {:?}", start_time.elapsed());

    Ok(())
}

fn report(opt: &Opt, limiter: &dyn RateLimitAlgorithm, i: usize, status: &RateLimitStatus) {
    rate_limit_event!(limiter.name(), status);

    let now = chrono::Local::now().format("%H:%M:%S%.3f");
    if opt.json {
        match serde_json::to_string(status) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Cannot encode status: {}", e),
        }
    } else if status.allowed {
        println!(
            "[{}] Request {}: ALLOWED (remaining: {})",
            now,
            i + 1,
            status.remaining
        );
    } else {
        println!(
            "[{}] Request {}: DENIED (limit: {}, retry in {:?})",
            now,
            i + 1,
            status.limit,
            status.reset_after
        );
    }
}

fn record(tally: &mut Tally, status: &RateLimitStatus) {
    if status.allowed {
        tally.allowed += 1;
    } else {
        tally.denied += 1;
    }
}

// Simulate a burst of requests all at once
fn simulate_burst(opt: &Opt, limiter: &dyn RateLimitAlgorithm, stop: &AtomicBool) -> Tally {
    info!("Simulating burst of {} requests", opt.num_requests);

    let mut tally = Tally::default();
    for i in 0..opt.num_requests {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let status = limiter.check_and_record();
        report(opt, limiter, i, &status);
        record(&mut tally, &status);
    }
    tally
}

// Requests on a timer; `factor(i)` scales the base interval after request `i`
async fn simulate_paced<F>(
    opt: &Opt,
    limiter: &dyn RateLimitAlgorithm,
    stop: &AtomicBool,
    factor: F,
) -> Tally
where
    F: Fn(usize) -> f64,
{
    info!(
        "Simulating {} requests with {}ms base interval",
        opt.num_requests, opt.request_interval_ms
    );

    let base_interval = Duration::from_millis(opt.request_interval_ms);
    let mut tally = Tally::default();

    for i in 0..opt.num_requests {
        if stop.load(Ordering::SeqCst) {
            warn!("Interrupted after {} requests", i);
            break;
        }
        let request_time = Instant::now();

        let status = limiter.check_and_record();
        report(opt, limiter, i, &status);
        record(&mut tally, &status);

        let this_interval = base_interval.mul_f64(factor(i));
        let elapsed = request_time.elapsed();
        if elapsed < this_interval {
            time::sleep(this_interval - elapsed).await;
        }
    }
    tally
}

// Simulate custom pattern with interactive input
fn simulate_custom(
    opt: &Opt,
    limiter: &dyn RateLimitAlgorithm,
    stop: &AtomicBool,
) -> std::io::Result<Tally> {
    println!("\nCustom Simulation Mode");
    println!("----------------------");
    println!("Press Enter to make a request, or type 'quit' to exit");

    let mut tally = Tally::default();
    let mut input_buffer = String::new();
    let mut i = 0;

    while !stop.load(Ordering::SeqCst) {
        input_buffer.clear();
        if std::io::stdin().read_line(&mut input_buffer)? == 0 {
            break;
        }

        let trimmed = input_buffer.trim();
        if trimmed == "quit" || trimmed == "exit" || trimmed == "q" {
            break;
        }

        let status = limiter.check_and_record();
        report(opt, limiter, i, &status);
        record(&mut tally, &status);
        i += 1;
    }
    Ok(tally)
}
