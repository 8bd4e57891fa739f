use crate::eviction::EvictionPolicy;
use crate::events::CacheEvent;
use gateway_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the response cache (spec §4.8).
pub struct ResponseCacheConfig {
    pub(crate) max_size: usize,
    pub(crate) ttl: Option<Duration>,
    pub(crate) policy: EvictionPolicy,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
    pub(crate) name: String,
}

pub struct ResponseCacheConfigBuilder {
    max_size: usize,
    ttl: Option<Duration>,
    policy: EvictionPolicy,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl Default for ResponseCacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCacheConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_size: 1000,
            ttl: None,
            policy: EvictionPolicy::Lru,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Maximum number of cached responses. Default: 1000.
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Entry lifetime. Default: unset (entries never expire by age).
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CacheEvent::Hit { .. }) {
                f();
            }
        }));
        self
    }

    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CacheEvent::Miss { .. }) {
                f();
            }
        }));
        self
    }

    pub fn build(self) -> crate::ResponseCache {
        crate::ResponseCache::from_config(ResponseCacheConfig {
            max_size: self.max_size,
            ttl: self.ttl,
            policy: self.policy,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
