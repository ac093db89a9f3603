// src/bin/rate_limiter_bench.rs

use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::sync::Barrier;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rate_limiter_algorithms::config::AlgorithmConfig;
use rate_limiter_algorithms::RateLimitAlgorithm;

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "rate_limiter_bench",
    about = "A benchmarking tool for rate limiting algorithms"
)]
struct Opt {
    /// Rate limiting algorithm to benchmark
    #[structopt(short, long, possible_values = &["token_bucket", "leaky_bucket", "fixed_window", "sliding_window_log", "all"], default_value = "all")]
    algorithm: String,

    /// Capacity for the buckets, limit for the windows
    #[structopt(short, long, default_value = "1000")]
    max_requests: u64,

    /// Window duration in seconds; buckets refill or leak max_requests per window
    #[structopt(short, long, default_value = "60")]
    window_seconds: u64,

    /// Number of concurrent callers sharing one limiter
    #[structopt(short = "u", long, default_value = "10")]
    num_users: usize,

    /// Number of requests per caller
    #[structopt(short = "r", long, default_value = "100")]
    requests_per_user: usize,

    /// Number of iterations to run
    #[structopt(short, long, default_value = "3")]
    iterations: usize,

    /// Maximum random pause between a caller's requests, in microseconds
    #[structopt(short, long, default_value = "0")]
    jitter_us: u64,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

struct BenchResult {
    name: &'static str,
    allowed: usize,
    denied: usize,
    duration: Duration,
    max_allowed_iteration: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
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
            "rate_limiter_bench={},rate_limiter_algorithms={}",
            log_level, log_level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Determine which algorithms to benchmark
    let algorithms: Vec<&str> = if opt.algorithm == "all" {
        AlgorithmConfig::NAMES.to_vec()
    } else {
        vec![opt.algorithm.as_str()]
    };

    let window = Duration::from_secs(opt.window_seconds);
    let rate = opt.max_requests as f64 / window.as_secs_f64().max(1e-9);

    let mut results = Vec::with_capacity(algorithms.len());
    for alg in algorithms {
        let config = AlgorithmConfig::from_parts(
            alg,
            opt.max_requests as f64,
            rate,
            opt.max_requests,
            window,
        )?;
        info!(
            "Benchmarking {} with max_requests={}, window={}s",
            alg, opt.max_requests, opt.window_seconds
        );
        let limiter: Arc<dyn RateLimitAlgorithm> = Arc::from(config.build()?);
        results.push(run_benchmark(limiter, &opt).await?);
    }

    print_results(&results, &opt);
    Ok(())
}

async fn run_benchmark(
    limiter: Arc<dyn RateLimitAlgorithm>,
    opt: &Opt,
) -> Result<BenchResult, Box<dyn std::error::Error>> {
    let name = limiter.name();
    let total_per_iteration = (opt.num_users * opt.requests_per_user) as u64;

    let progress = ProgressBar::new(total_per_iteration * opt.iterations as u64);
    progress.set_style(
        ProgressStyle::with_template("{msg:>20} [{bar:40}] {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );
    progress.set_message(name);

    let mut total_duration = Duration::ZERO;
    let mut total_allowed = 0;
    let mut total_denied = 0;
    let mut max_allowed_iteration = 0;

    for iteration in 0..opt.iterations {
        limiter.reset();

        let start_time = Instant::now();

        // Create a barrier to start all tasks at once
        let barrier = Arc::new(Barrier::new(opt.num_users));
        let mut handles = Vec::with_capacity(opt.num_users);

        for _ in 0..opt.num_users {
            let limiter = limiter.clone();
            let barrier = barrier.clone();
            let progress = progress.clone();
            let requests_per_user = opt.requests_per_user;
            let jitter_us = opt.jitter_us;

            handles.push(tokio::spawn(async move {
                barrier.wait().await;

                let mut allowed = 0;
                let mut denied = 0;
                for _ in 0..requests_per_user {
                    if limiter.allow_request() {
                        allowed += 1;
                    } else {
                        denied += 1;
                    }
                    progress.inc(1);

                    if jitter_us > 0 {
                        let pause = (rand::random::<f64>() * jitter_us as f64) as u64;
                        tokio::time::sleep(Duration::from_micros(pause)).await;
                    }
                }
                (allowed, denied)
            }));
        }

        let mut iteration_allowed = 0;
        let mut iteration_denied = 0;
        for result in futures::future::join_all(handles).await {
            match result {
                Ok((allowed, denied)) => {
                    iteration_allowed += allowed;
                    iteration_denied += denied;
                }
                Err(e) => warn!("Benchmark task failed: {}", e),
            }
        }

        let elapsed = start_time.elapsed();
        total_duration += elapsed;
        total_allowed += iteration_allowed;
        total_denied += iteration_denied;
        max_allowed_iteration = max_allowed_iteration.max(iteration_allowed);

        info!(
            "{} iteration {}: {:?}, {} allowed, {} denied",
            name,
            iteration + 1,
            elapsed,
            iteration_allowed,
            iteration_denied
        );
    }

    progress.finish_with_message(format!("{} done", name));

    Ok(BenchResult {
        name,
        allowed: total_allowed,
        denied: total_denied,
        duration: total_duration,
        max_allowed_iteration,
    })
}

/// Upper bound on admissions for one iteration: the initial allowance plus whatever
/// the limiter can regain while the iteration runs.
fn admission_bound(result: &BenchResult, opt: &Opt) -> f64 {
    let iterations = opt.iterations.max(1) as u32;
    let per_iteration = (result.duration / iterations).as_secs_f64();
    let window = (opt.window_seconds as f64).max(1e-9);
    let windows_touched = (per_iteration / window).ceil() + 1.0;
    opt.max_requests as f64 * windows_touched
}

fn print_results(results: &[BenchResult], opt: &Opt) {
    let mut table = Table::new();
    table.set_titles(row![
        "Algorithm",
        "Requests",
        "Allowed",
        "Denied",
        "Avg. duration",
        "Throughput (req/s)",
        "Within bound"
    ]);

    for result in results {
        let total = result.allowed + result.denied;
        let throughput = total as f64 / result.duration.as_secs_f64().max(1e-9);
        let avg = result.duration / opt.iterations.max(1) as u32;
        let within = result.max_allowed_iteration as f64 <= admission_bound(result, opt);
        if !within {
            warn!("{} admitted more than its serial bound", result.name);
        }

        table.add_row(row![
            result.name,
            total,
            format!(
                "{} ({:.1}%)",
                result.allowed,
                100.0 * result.allowed as f64 / total.max(1) as f64
            ),
            result.denied,
            format!("{:?}", avg),
            format!("{:.2}", throughput),
            if within { "yes" } else { "NO" }
        ]);
    }

    table.printstd();
}
