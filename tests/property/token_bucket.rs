//! Property tests for the dual token bucket.
//!
//! Invariant tested: rate conformance (spec §8) — the observed number of
//! granted calls in a burst never exceeds the configured per-second
//! capacity, however many callers contend for it concurrently.

use gateway_tokenbucket::{ConsumeOutcome, TokenBucket};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: a burst of concurrent callers never grants more than the
    /// configured per-second capacity within a window too short for any
    /// refill to land.
    #[test]
    fn never_grants_more_than_per_second_capacity_in_a_burst(
        capacity in 1u32..=20,
        num_concurrent in 1u32..=60,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let bucket = Arc::new(
                TokenBucket::builder()
                    .per_second_capacity(capacity as f64)
                    .per_minute_capacity(1_000.0)
                    .base_per_second_rate(0.0)
                    .base_per_minute_rate(0.0)
                    .poll_interval(Duration::from_millis(5))
                    .build(),
            );

            let mut handles = Vec::with_capacity(num_concurrent as usize);
            for _ in 0..num_concurrent {
                let bucket = Arc::clone(&bucket);
                handles.push(tokio::spawn(async move {
                    let cancel = CancellationToken::new();
                    let canceller = cancel.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(25)).await;
                        canceller.cancel();
                    });
                    bucket.try_consume(&cancel).await
                }));
            }

            let mut granted = 0u32;
            for handle in handles {
                if handle.await.unwrap() == ConsumeOutcome::Granted {
                    granted += 1;
                }
            }

            prop_assert!(
                granted <= capacity,
                "granted {granted} consumptions but per-second capacity was {capacity}",
            );

            Ok(())
        })?;
    }
}
