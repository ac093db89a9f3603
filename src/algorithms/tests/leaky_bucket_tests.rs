#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use tokio::sync::Barrier;

    use crate::{
        algorithms::{LeakyBucket, RateLimitAlgorithm},
        config::LeakyBucketConfig,
        test_utils::{admit_burst, ManualClock},
    };

    fn new_bucket(capacity: f64, leak_rate: f64) -> (LeakyBucket<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = LeakyBucketConfig {
            capacity,
            leak_rate,
        };
        let bucket = LeakyBucket::with_clock(config, clock.clone()).unwrap();
        (bucket, clock)
    }

    /// Test filling a bucket that starts empty
    #[test]
    fn test_fill_to_capacity() {
        let (bucket, _clock) = new_bucket(5.0, 1.0);
        assert_eq!(bucket.water_level(), 0.0);
        assert_eq!(bucket.capacity_used(), 0.0);

        for i in 0..5 {
            assert!(bucket.allow_request(), "Request {} should be allowed", i);
        }
        assert_eq!(bucket.water_level(), 5.0, "Water reaches capacity exactly");
        assert_eq!(bucket.capacity_used(), 100.0);

        assert!(!bucket.allow_request(), "Full bucket should deny");
        assert_eq!(bucket.water_level(), 5.0, "Denials add no water");
    }

    /// Waiting 1/leak_rate seconds frees exactly one slot
    #[test]
    fn test_leak_frees_one_slot() {
        let (bucket, clock) = new_bucket(5.0, 0.25);
        assert_eq!(admit_burst(&bucket, 5), 5);

        clock.advance(Duration::from_secs(4));
        assert_eq!(bucket.water_level(), 4.0);
        assert!(bucket.allow_request(), "One unit leaked out");
        assert!(!bucket.allow_request(), "Only one unit leaked out");
    }

    /// Strict comparison against the level before pouring
    #[test]
    fn test_admission_checks_level_before_pouring() {
        let (bucket, clock) = new_bucket(5.0, 1.0);
        admit_burst(&bucket, 5);

        // 4.5 < 5, so one more fits even though it overshoots to 5.5
        clock.advance(Duration::from_millis(500));
        assert!(bucket.allow_request());
        assert_eq!(bucket.water_level(), 5.5);
        assert!(!bucket.allow_request());

        // Must drain strictly below capacity: 0.5 units, then a hair more
        assert_eq!(
            bucket.time_until_available(),
            Some(Duration::from_millis(500) + Duration::from_nanos(1))
        );
        clock.advance(Duration::from_millis(500));
        assert!(!bucket.allow_request(), "Exactly at capacity is still full");
        clock.advance(Duration::from_nanos(1));
        assert!(bucket.allow_request());
    }

    /// Water never goes negative after a long idle period
    #[test]
    fn test_water_floor_at_zero() {
        let (bucket, clock) = new_bucket(3.0, 2.0);
        admit_burst(&bucket, 2);
        clock.advance(Duration::from_secs(60));
        assert_eq!(bucket.water_level(), 0.0);
        assert_eq!(admit_burst(&bucket, 5), 3);
    }

    #[test]
    fn test_degenerate_parameters() {
        let (saturated, clock) = new_bucket(2.0, 0.0);
        assert_eq!(admit_burst(&saturated, 3), 2);
        clock.advance(Duration::from_secs(3600));
        assert!(!saturated.allow_request(), "Bucket without leak stays full");
        assert_eq!(saturated.time_until_available(), None);

        let (closed, _clock) = new_bucket(0.0, 1.0);
        assert!(!closed.allow_request(), "Zero capacity denies everything");
        assert_eq!(closed.capacity_used(), 0.0);
        assert_eq!(closed.time_until_available(), None);
    }

    /// Waits saturate at `Duration::MAX` for rates near zero
    #[test]
    fn test_extreme_leak_rates() {
        let (slow, clock) = new_bucket(0.5, 1e-12);
        assert!(slow.allow_request());
        assert_eq!(slow.time_until_available(), Some(Duration::MAX));

        let status = slow.check_and_record();
        assert!(!status.allowed);
        assert_eq!(status.reset_after, Duration::MAX);
        assert_eq!(
            RateLimitAlgorithm::time_until_available(&slow),
            Some(Duration::MAX)
        );

        clock.advance(Duration::from_secs(3600));
        assert!(!slow.allow_request(), "An hour drains almost nothing");

        let (fast, clock) = new_bucket(2.0, 1e300);
        assert_eq!(admit_burst(&fast, 3), 2);
        assert_eq!(fast.time_until_available(), Some(Duration::from_nanos(1)));
        clock.advance(Duration::from_nanos(1));
        assert_eq!(fast.water_level(), 0.0);
        assert_eq!(admit_burst(&fast, 3), 2);
    }

    #[test]
    fn test_status_reports_headroom() {
        let (bucket, clock) = new_bucket(5.0, 1.0);
        admit_burst(&bucket, 3);
        clock.advance(Duration::from_millis(200));

        // 2.8 units after this admission would be 3.8, leaving room for 2
        let status = bucket.check_and_record();
        assert!(status.allowed);
        assert_eq!(status.remaining, 2);
        assert_eq!(status.limit, 5);
        assert_eq!(status.reset_after, Duration::ZERO);
    }

    #[test]
    fn test_reset_empties_bucket() {
        let (bucket, _clock) = new_bucket(2.0, 0.0);
        admit_burst(&bucket, 2);
        bucket.reset();
        assert_eq!(bucket.water_level(), 0.0);
        assert_eq!(admit_burst(&bucket, 3), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let (bucket, _clock) = new_bucket(25.0, 0.0);
        let bucket = Arc::new(bucket);
        let clients = 8;
        let barrier = Arc::new(Barrier::new(clients));

        let handles = (0..clients).map(|_| {
            let bucket = bucket.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                (0..10).filter(|_| bucket.allow_request()).count()
            })
        });

        let allowed: usize = join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .sum();
        assert_eq!(allowed, 25);
        assert_eq!(bucket.water_level(), 25.0);
    }
}
