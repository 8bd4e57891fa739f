use crate::config::{BatcherConfig, BatcherConfigBuilder};
use crate::events::BatcherEvent;
use futures::future::BoxFuture;
use gateway_core::error::GatewayError;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// Outcome shared by every request coalesced into one batch.
pub type BatchOutcome = Result<String, GatewayError>;

/// `(model, prompt, max_tokens)` exact-match key a batch is keyed on
/// (spec §4.5).
pub type BatchKey = (String, String, u32);

type Processor =
    Arc<dyn Fn(String, String, u32) -> BoxFuture<'static, BatchOutcome> + Send + Sync>;

struct PendingBatch {
    created_at: Instant,
    member_count: usize,
    completion: broadcast::Sender<BatchOutcome>,
}

/// Content-keyed batcher (spec §4.5): identical `(model, prompt, max_tokens)`
/// requests arriving while a batch is still open join that batch and share
/// its single upstream call; a background sweeper flushes batches once
/// their oldest member exceeds `maxBatchAgeMs`.
pub struct Batcher {
    config: BatcherConfig,
    batches: Mutex<HashMap<BatchKey, PendingBatch>>,
    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Batcher {
    pub fn builder() -> BatcherConfigBuilder {
        BatcherConfigBuilder::new()
    }

    pub(crate) fn from_config<F>(config: BatcherConfig, processor: F) -> Arc<Self>
    where
        F: Fn(String, String, u32) -> BoxFuture<'static, BatchOutcome> + Send + Sync + 'static,
    {
        let batcher = Arc::new(Self {
            config,
            batches: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        });

        let processor: Processor = Arc::new(processor);
        let handle = tokio::spawn(Self::run_sweeper(Arc::clone(&batcher), processor));
        *batcher.sweeper.lock() = Some(handle);
        batcher
    }

    /// Joins an existing open batch for this key, or opens a new one.
    /// Returns a completion receiver shared with every other member.
    pub fn enqueue(
        &self,
        model: String,
        prompt: String,
        max_tokens: u32,
    ) -> broadcast::Receiver<BatchOutcome> {
        let key: BatchKey = (model, prompt, max_tokens);
        let now = Instant::now();
        let mut batches = self.batches.lock();

        if let Some(batch) = batches.get_mut(&key) {
            batch.member_count += 1;
            let rx = batch.completion.subscribe();
            self.config.event_listeners.emit(&BatcherEvent::Joined {
                name: self.config.name.clone(),
                timestamp: now,
                batch_size: batch.member_count,
            });
            return rx;
        }

        let (tx, rx) = broadcast::channel(1);
        batches.insert(
            key,
            PendingBatch {
                created_at: now,
                member_count: 1,
                completion: tx,
            },
        );
        self.config.event_listeners.emit(&BatcherEvent::Opened {
            name: self.config.name.clone(),
            timestamp: now,
        });
        rx
    }

    pub fn open_batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    async fn run_sweeper(batcher: Arc<Batcher>, processor: Processor) {
        let mut ticker = tokio::time::interval(batcher.config.sweep_interval);
        loop {
            ticker.tick().await;
            batcher.sweep(&processor);
        }
    }

    fn sweep(&self, processor: &Processor) {
        let now = Instant::now();
        let ripe: Vec<BatchKey> = {
            let batches = self.batches.lock();
            batches
                .iter()
                .filter(|(_, batch)| now.duration_since(batch.created_at) >= self.config.max_batch_age)
                .map(|(key, _)| key.clone())
                .collect()
        };

        for key in ripe {
            let batch = {
                let mut batches = self.batches.lock();
                batches.remove(&key)
            };
            let Some(batch) = batch else { continue };

            self.config.event_listeners.emit(&BatcherEvent::Flushed {
                name: self.config.name.clone(),
                timestamp: now,
                batch_size: batch.member_count,
                age: now.duration_since(batch.created_at),
            });

            let (model, prompt, max_tokens) = key;
            let processor = Arc::clone(processor);
            tokio::spawn(async move {
                let outcome = processor(model, prompt, max_tokens).await;
                let _ = batch.completion.send(outcome);
            });
        }
    }
}

impl Drop for Batcher {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_processor(
        counter: Arc<AtomicUsize>,
    ) -> impl Fn(String, String, u32) -> BoxFuture<'static, BatchOutcome> + Send + Sync + 'static
    {
        move |_model, prompt, _max_tokens| {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("handled: {prompt}"))
            })
        }
    }

    #[tokio::test]
    async fn single_request_flushes_after_max_batch_age() {
        let counter = Arc::new(AtomicUsize::new(0));
        let batcher = Batcher::builder()
            .max_batch_age(Duration::from_millis(20))
            .sweep_interval(Duration::from_millis(10))
            .build(counting_processor(Arc::clone(&counter)));

        let mut rx = batcher.enqueue("claude-3".into(), "hi".into(), 256);
        let outcome = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.unwrap(), "handled: hi");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identical_requests_share_one_upstream_call() {
        let counter = Arc::new(AtomicUsize::new(0));
        let batcher = Batcher::builder()
            .max_batch_age(Duration::from_millis(30))
            .sweep_interval(Duration::from_millis(10))
            .build(counting_processor(Arc::clone(&counter)));

        let mut rx1 = batcher.enqueue("claude-3".into(), "same prompt".into(), 256);
        let mut rx2 = batcher.enqueue("claude-3".into(), "same prompt".into(), 256);

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
    async fn different_keys_get_separate_batches() {
        let counter = Arc::new(AtomicUsize::new(0));
        let batcher = Batcher::builder()
            .max_batch_age(Duration::from_millis(20))
            .sweep_interval(Duration::from_millis(10))
            .build(counting_processor(Arc::clone(&counter)));

        let _rx1 = batcher.enqueue("claude-3".into(), "a".into(), 256);
        let _rx2 = batcher.enqueue("claude-3".into(), "b".into(), 256);
        assert_eq!(batcher.open_batch_count(), 2);
    }
}
