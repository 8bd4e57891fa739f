use crate::config::{PriorityQueueConfig, PriorityQueueConfigBuilder};
use crate::events::QueueEvent;
use crate::similarity::similarity;
use crate::ticket::{Ticket, TicketOutcome};
use futures::future::BoxFuture;
use gateway_core::error::GatewayError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Notify};
use tokio_util::sync::CancellationToken;

const SIMILARITY_THRESHOLD: f64 = 0.85;
const SIMILARITY_WINDOW: Duration = Duration::from_secs(30);
const SIMILARITY_WINDOW_CAPACITY: usize = 256;

type Operation = Arc<dyn Fn(Arc<Ticket>) -> BoxFuture<'static, ()> + Send + Sync>;

struct RecentEntry {
    ticket: Arc<Ticket>,
    inserted_at: Instant,
}

struct QueueState {
    pending: Vec<Arc<Ticket>>,
    recent: VecDeque<RecentEntry>,
}

impl QueueState {
    fn prune_recent(&mut self, now: Instant) {
        while let Some(front) = self.recent.front() {
            if now.duration_since(front.inserted_at) > SIMILARITY_WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        while self.recent.len() > SIMILARITY_WINDOW_CAPACITY {
            self.recent.pop_front();
        }
    }

    /// Finds the single best live match for `prompt`, regardless of
    /// threshold. The caller decides whether the score clears
    /// `SIMILARITY_THRESHOLD` for coalescing; a sub-threshold score still
    /// feeds the new ticket's own `similarity_score` (spec §4.4).
    fn best_match(&self, prompt: &str) -> Option<(Arc<Ticket>, f64)> {
        self.recent
            .iter()
            .filter(|entry| !entry.ticket.is_cancelled() && !entry.ticket.is_completed())
            .map(|entry| (entry.ticket.clone(), similarity(&entry.ticket.prompt, prompt)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Priority queue with starvation-bounded dispatch and content-similarity
/// coalescence (spec §4.4).
///
/// A background task continuously re-evaluates effective priorities and
/// dispatches the single best-ranked ticket through the configured
/// `operation`, so tickets never dispatch in raw FIFO or raw-priority
/// order alone.
pub struct PriorityQueue {
    config: PriorityQueueConfig,
    state: Mutex<QueueState>,
    next_id: AtomicU64,
    notify: Notify,
    dispatcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl PriorityQueue {
    pub fn builder() -> PriorityQueueConfigBuilder {
        PriorityQueueConfigBuilder::new()
    }

    pub(crate) fn from_config<F>(config: PriorityQueueConfig, operation: F) -> Arc<Self>
    where
        F: Fn(Arc<Ticket>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let queue = Arc::new(Self {
            config,
            state: Mutex::new(QueueState {
                pending: Vec::new(),
                recent: VecDeque::new(),
            }),
            next_id: AtomicU64::new(1),
            notify: Notify::new(),
            dispatcher: Mutex::new(None),
        });

        let operation: Operation = Arc::new(operation);
        let handle = tokio::spawn(Self::run_dispatcher(Arc::clone(&queue), operation));
        *queue.dispatcher.lock() = Some(handle);
        queue
    }

    /// Submits a prompt for dispatch. Returns a completion receiver shared
    /// with every other caller coalesced onto the same ticket.
    pub fn enqueue(
        &self,
        prompt: String,
        max_tokens: u32,
        priority: i32,
        cancel: CancellationToken,
    ) -> Result<broadcast::Receiver<TicketOutcome>, GatewayError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.prune_recent(now);

        let best = state.best_match(&prompt);
        if let Some((ticket, score)) = &best {
            if *score >= SIMILARITY_THRESHOLD {
                self.config.event_listeners.emit(&QueueEvent::Coalesced {
                    name: self.config.name.clone(),
                    timestamp: now,
                    similarity: *score,
                });
                return Ok(ticket.subscribe());
            }
        }

        if state.pending.len() >= self.config.capacity {
            return Err(GatewayError::CapacityExceeded {
                limit: self.config.capacity,
            });
        }

        // No live neighbor clears the coalescing threshold; the best
        // sub-threshold score (or 1.0 when the window is empty) still
        // carries through as this ticket's own similarity bonus input.
        let similarity_score = best.map(|(_, score)| score).unwrap_or(1.0);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (ticket, rx) = Ticket::new(id, prompt, max_tokens, priority, similarity_score, cancel);
        let ticket = Arc::new(ticket);

        state.pending.push(Arc::clone(&ticket));
        state.recent.push_back(RecentEntry {
            ticket: Arc::clone(&ticket),
            inserted_at: now,
        });
        let depth = state.pending.len();
        drop(state);

        self.config.event_listeners.emit(&QueueEvent::Enqueued {
            name: self.config.name.clone(),
            timestamp: now,
            depth,
        });
        self.notify.notify_one();

        Ok(rx)
    }

    pub fn depth(&self) -> usize {
        self.state.lock().pending.len()
    }

    async fn run_dispatcher(queue: Arc<PriorityQueue>, operation: Operation) {
        loop {
            let dispatched = queue.dispatch_pass(&operation);
            if !dispatched {
                tokio::select! {
                    _ = queue.notify.notified() => {}
                    _ = tokio::time::sleep(queue.config.dispatch_interval) => {}
                }
            }
        }
    }

    /// One scheduling pass: drops cancelled/expired tickets, ages survivors,
    /// dispatches the single best-ranked ticket, and re-queues the rest.
    /// Returns whether a ticket was dispatched.
    fn dispatch_pass(&self, operation: &Operation) -> bool {
        let now = Instant::now();
        let mut scratch = {
            let mut state = self.state.lock();
            std::mem::take(&mut state.pending)
        };

        let mut survivors = Vec::with_capacity(scratch.len());
        while let Some(ticket) = scratch.pop() {
            if ticket.is_cancelled() {
                ticket.complete(Err(GatewayError::Cancelled));
                self.config.event_listeners.emit(&QueueEvent::Dropped {
                    name: self.config.name.clone(),
                    timestamp: now,
                    reason: "cancelled",
                });
                continue;
            }
            if ticket.waiting_for() > self.config.request_timeout {
                ticket.complete(Err(GatewayError::Timeout));
                self.config.event_listeners.emit(&QueueEvent::Dropped {
                    name: self.config.name.clone(),
                    timestamp: now,
                    reason: "timed_out",
                });
                continue;
            }
            ticket.bump_starvation();
            survivors.push(ticket);
        }

        if survivors.is_empty() {
            return false;
        }

        survivors.sort_by(|a, b| a.effective_priority().total_cmp(&b.effective_priority()));
        let best = survivors.remove(0);

        {
            let mut state = self.state.lock();
            state.pending.append(&mut survivors);
        }

        self.config.event_listeners.emit(&QueueEvent::Dispatched {
            name: self.config.name.clone(),
            timestamp: now,
            waited: best.waiting_for(),
        });

        let op = Arc::clone(operation);
        tokio::spawn(async move { op(best).await });
        true
    }
}

impl Drop for PriorityQueue {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatcher.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_operation(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn(Arc<Ticket>) -> BoxFuture<'static, ()> + Send + Sync + 'static {
        move |ticket| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ticket.complete(Ok(format!("handled: {}", ticket.prompt)));
            })
        }
    }

    #[tokio::test]
    async fn enqueued_ticket_is_dispatched_and_completes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let queue = PriorityQueue::builder()
            .dispatch_interval(Duration::from_millis(5))
            .build(test_operation(Arc::clone(&counter)));

        let mut rx = queue
            .enqueue("hello".into(), 100, 0, CancellationToken::new())
            .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("dispatch should not time out")
            .unwrap();
        assert_eq!(outcome.unwrap(), "handled: hello");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn similar_prompts_coalesce_onto_one_ticket() {
        let counter = Arc::new(AtomicUsize::new(0));
        let queue = PriorityQueue::builder()
            .dispatch_interval(Duration::from_millis(5))
            .build(test_operation(Arc::clone(&counter)));

        let mut rx1 = queue
            .enqueue(
                "summarize this document for me".into(),
                100,
                0,
                CancellationToken::new(),
            )
            .unwrap();
        let mut rx2 = queue
            .enqueue(
                "summarize this document for me please".into(),
                100,
                0,
                CancellationToken::new(),
            )
            .unwrap();

        let o1 = tokio::time::timeout(Duration::from_secs(1), rx1.recv())
            .await
            .unwrap()
            .unwrap();
        let o2 = tokio::time::timeout(Duration::from_secs(1), rx2.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(o1.unwrap(), o2.unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let counter = Arc::new(AtomicUsize::new(0));
        let queue = PriorityQueue::builder()
            .capacity(1)
            .dispatch_interval(Duration::from_secs(60))
            .build(test_operation(counter));

        let _rx = queue
            .enqueue("a".into(), 100, 0, CancellationToken::new())
            .unwrap();
        let err = queue
            .enqueue("completely different prompt text".into(), 100, 0, CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, GatewayError::CapacityExceeded { limit: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn ticket_past_request_timeout_fails_without_dispatch() {
        let counter = Arc::new(AtomicUsize::new(0));
        let queue = PriorityQueue::builder()
            .request_timeout(Duration::from_secs(30))
            .dispatch_interval(Duration::from_millis(5))
            .build(test_operation(Arc::clone(&counter)));

        let mut rx = queue
            .enqueue("stuck behind a closed bucket".into(), 100, 0, CancellationToken::new())
            .unwrap();

        tokio::time::advance(Duration::from_secs(30) + Duration::from_millis(50)).await;

        let outcome = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("dispatcher should drop the ticket once its deadline passes")
            .unwrap();
        assert!(matches!(outcome, Err(GatewayError::Timeout)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_ticket_completes_with_cancelled_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let queue = PriorityQueue::builder()
            .dispatch_interval(Duration::from_millis(5))
            .build(test_operation(Arc::clone(&counter)));

        let cancel = CancellationToken::new();
        let mut rx = queue
            .enqueue("will be cancelled".into(), 100, 0, cancel.clone())
            .unwrap();
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, Err(GatewayError::Cancelled)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
