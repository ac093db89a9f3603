// src/algorithms/tests/mod.rs


/// Tests for Leaky Bucket algorithm
mod leaky_bucket_tests;



/// Common tests for all algorithms
#[cfg(test)]
mod common_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use tokio::sync::Barrier;

    use crate::{
        algorithms::{
            FixedWindowCounter, LeakyBucket, RateLimitAlgorithm, SlidingWindowLog, TokenBucket,
        },
        config::{FixedWindowConfig, LeakyBucketConfig, SlidingWindowLogConfig, TokenBucketConfig},
        error::RateLimiterError,
        test_utils::{admit_burst, ManualClock},
    };

    /// One limiter of each kind, all admitting 5 requests and never recovering
    /// unless the clock moves.
    fn all_limiters(clock: &ManualClock) -> Vec<Arc<dyn RateLimitAlgorithm>> {
        vec![
            Arc::new(
                TokenBucket::with_clock(
                    TokenBucketConfig {
                        capacity: 5.0,
                        refill_rate: 1.0,
                    },
                    clock.clone(),
                )
                .unwrap(),
            ),
            Arc::new(
                LeakyBucket::with_clock(
                    LeakyBucketConfig {
                        capacity: 5.0,
                        leak_rate: 1.0,
                    },
                    clock.clone(),
                )
                .unwrap(),
            ),
            Arc::new(
                FixedWindowCounter::with_clock(
                    FixedWindowConfig {
                        limit: 5,
                        window: Duration::from_secs(10),
                    },
                    clock.clone(),
                )
                .unwrap(),
            ),
            Arc::new(
                SlidingWindowLog::with_clock(
                    SlidingWindowLogConfig {
                        limit: 5,
                        window: Duration::from_secs(10),
                    },
                    clock.clone(),
                )
                .unwrap(),
            ),
        ]
    }

    /// Test consistent behavior across all algorithm implementations
    #[test]
    fn test_algorithm_trait_consistency() {
        let clock = ManualClock::new();

        for limiter in all_limiters(&clock) {
            let name = limiter.name();
            assert_eq!(limiter.time_until_available(), Some(Duration::ZERO));

            for i in 0..5 {
                let status = limiter.check_and_record();
                assert!(status.allowed, "{}: request {} should be allowed", name, i);
                assert_eq!(status.limit, 5, "{}: limit", name);
                assert_eq!(status.remaining, 4 - i, "{}: remaining after {}", name, i);
            }

            let status = limiter.check_and_record();
            assert!(!status.allowed, "{}: 6th request should be denied", name);
            assert_eq!(status.remaining, 0);
            assert!(status.reset_after > Duration::ZERO, "{}: reset_after", name);
            assert!((limiter.utilization() - 100.0).abs() < 1e-9, "{}", name);

            let wait = limiter.time_until_available();
            assert!(matches!(wait, Some(d) if d > Duration::ZERO), "{}", name);

            // record_request reports the denial as an error
            let err = limiter.record_request().unwrap_err();
            assert!(matches!(err, RateLimiterError::LimitExceeded(_)));

            limiter.reset();
            assert!(limiter.allow_request(), "{}: allowed after reset", name);
            assert!(limiter.record_request().is_ok(), "{}", name);
        }
    }

    /// Waiting out the reported delay makes a request admissible
    #[test]
    fn test_time_until_available_is_sufficient() {
        let clock = ManualClock::new();

        for limiter in all_limiters(&clock) {
            assert_eq!(admit_burst(limiter.as_ref(), 10), 5);
        }
        for limiter in all_limiters(&clock) {
            admit_burst(limiter.as_ref(), 5);
            let wait = limiter.time_until_available().unwrap();
            clock.advance(wait);
            assert!(limiter.allow_request(), "{} after {:?}", limiter.name(), wait);
        }
    }

    /// Reading twice with no elapsed time and no admission gives the same answer
    #[test]
    fn test_reads_are_idempotent() {
        let clock = ManualClock::new();

        for limiter in all_limiters(&clock) {
            admit_burst(limiter.as_ref(), 3);
            clock.advance(Duration::from_millis(1500));

            assert_eq!(limiter.utilization(), limiter.utilization());
            assert_eq!(
                limiter.time_until_available(),
                limiter.time_until_available()
            );
        }
    }

    /// Concurrent callers never get more admissions than a serial run would
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_over_admission_under_contention() {
        let clock = ManualClock::new();
        let tasks = 16;
        let per_task = 50;

        for limiter in all_limiters(&clock) {
            let barrier = Arc::new(Barrier::new(tasks));

            let handles = (0..tasks).map(|_| {
                let limiter = limiter.clone();
                let barrier = barrier.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    (0..per_task).filter(|_| limiter.allow_request()).count()
                })
            });

            let allowed: usize = join_all(handles)
                .await
                .into_iter()
                .map(|r| r.unwrap())
                .sum();

            // The clock is frozen, so the serial answer is exactly the capacity
            assert_eq!(allowed, 5, "{}", limiter.name());
        }
    }
}
