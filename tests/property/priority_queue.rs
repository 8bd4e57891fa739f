//! Property tests for the priority queue's starvation bound.
//!
//! Invariant tested (spec §8): for any set of non-cancelled tickets with a
//! request timeout far longer than the dispatch interval, every ticket is
//! eventually dispatched rather than dropped for starvation — no ticket is
//! starved indefinitely by ones with a higher nominal priority.

use futures::future::BoxFuture;
use gateway_queue::PriorityQueue;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: every distinct, non-cancelled ticket dispatches well
    /// before its request timeout, regardless of how many higher-priority
    /// tickets are enqueued alongside it.
    #[test]
    fn every_distinct_ticket_eventually_dispatches(num_tickets in 1usize..=20usize) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dispatched = Arc::new(AtomicUsize::new(0));
            let dispatched_clone = Arc::clone(&dispatched);

            let queue = PriorityQueue::builder()
                .capacity(num_tickets + 1)
                .dispatch_interval(Duration::from_millis(2))
                .request_timeout(Duration::from_secs(30))
                .build(move |ticket| -> BoxFuture<'static, ()> {
                    let dispatched = Arc::clone(&dispatched_clone);
                    Box::pin(async move {
                        dispatched.fetch_add(1, Ordering::SeqCst);
                        ticket.complete(Ok("handled".to_string()));
                    })
                });

            // Each prompt is built from a distinct word list entry so none
            // of them coalesce into a single ticket; priorities alternate
            // so low-priority tickets sit behind higher-priority ones.
            let words = [
                "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel",
                "india", "juliett", "kilo", "lima", "mike", "november", "oscar", "papa",
                "quebec", "romeo", "sierra", "tango",
            ];

            let mut receivers = Vec::with_capacity(num_tickets);
            for i in 0..num_tickets {
                let prompt = words[i].to_string();
                let priority = if i % 2 == 0 { 10 } else { 0 };
                let rx = queue
                    .enqueue(prompt, 100, priority, CancellationToken::new())
                    .unwrap();
                receivers.push(rx);
            }

            for mut rx in receivers {
                let outcome = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                    .await
                    .expect("every distinct ticket should dispatch well before its timeout")
                    .unwrap();
                prop_assert!(
                    outcome.is_ok(),
                    "ticket failed instead of dispatching: {:?}",
                    outcome
                );
            }

            prop_assert_eq!(dispatched.load(Ordering::SeqCst), num_tickets);
            Ok(())
        })?;
    }
}
