use crate::events::QueueEvent;
use gateway_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`crate::PriorityQueue`] (spec §4.4).
pub struct PriorityQueueConfig {
    pub(crate) capacity: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) dispatch_interval: Duration,
    pub(crate) event_listeners: EventListeners<QueueEvent>,
    pub(crate) name: String,
}

pub struct PriorityQueueConfigBuilder {
    capacity: usize,
    request_timeout: Duration,
    dispatch_interval: Duration,
    event_listeners: EventListeners<QueueEvent>,
    name: String,
}

impl Default for PriorityQueueConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityQueueConfigBuilder {
    pub fn new() -> Self {
        Self {
            capacity: 1000,
            request_timeout: Duration::from_secs(30),
            dispatch_interval: Duration::from_millis(10),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Hard ticket capacity. Exceeding it rejects with `CapacityExceeded`.
    /// Default: 1000 (spec §4.4).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Per-ticket deadline measured from enqueue time. Default: 30s.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// How often the dispatcher re-evaluates effective priorities and
    /// dispatches the best candidate. Default: 10ms.
    pub fn dispatch_interval(mut self, interval: Duration) -> Self {
        self.dispatch_interval = interval;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, QueueEvent::Dispatched { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the queue and spawns its background dispatcher task, which
    /// drives every dispatched ticket through `operation`.
    pub fn build<F>(self, operation: F) -> std::sync::Arc<crate::PriorityQueue>
    where
        F: Fn(std::sync::Arc<crate::Ticket>) -> futures::future::BoxFuture<'static, ()>
            + Send
            + Sync
            + 'static,
    {
        let config = PriorityQueueConfig {
            capacity: self.capacity,
            request_timeout: self.request_timeout,
            dispatch_interval: self.dispatch_interval,
            event_listeners: self.event_listeners,
            name: self.name,
        };
        crate::PriorityQueue::from_config(config, operation)
    }
}
