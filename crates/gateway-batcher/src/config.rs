use crate::events::BatcherEvent;
use gateway_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`crate::Batcher`] (spec §4.5).
pub struct BatcherConfig {
    pub(crate) max_batch_age: Duration,
    pub(crate) sweep_interval: Duration,
    pub(crate) event_listeners: EventListeners<BatcherEvent>,
    pub(crate) name: String,
}

pub struct BatcherConfigBuilder {
    max_batch_age: Duration,
    sweep_interval: Duration,
    event_listeners: EventListeners<BatcherEvent>,
    name: String,
}

impl Default for BatcherConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BatcherConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_batch_age: Duration::from_millis(500),
            sweep_interval: Duration::from_secs(1),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Oldest a batch may be before the sweeper flushes it. Default: 500ms.
    pub fn max_batch_age(mut self, age: Duration) -> Self {
        self.max_batch_age = age;
        self
    }

    /// How often the sweeper checks batch ages. Default: 1s.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_flush<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, BatcherEvent::Flushed { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the batcher and spawns its background sweeper task, which
    /// drives every flushed batch through `processor`.
    pub fn build<F>(self, processor: F) -> std::sync::Arc<crate::Batcher>
    where
        F: Fn(String, String, u32) -> futures::future::BoxFuture<'static, crate::BatchOutcome>
            + Send
            + Sync
            + 'static,
    {
        let config = BatcherConfig {
            max_batch_age: self.max_batch_age,
            sweep_interval: self.sweep_interval,
            event_listeners: self.event_listeners,
            name: self.name,
        };
        crate::Batcher::from_config(config, processor)
    }
}
