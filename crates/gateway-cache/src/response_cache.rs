use crate::config::ResponseCacheConfig;
use crate::events::CacheEvent;
use crate::fingerprint::fingerprint;
use crate::store::CacheStore;
use parking_lot::Mutex;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Fingerprint-keyed cache of completed responses (spec §4.8).
///
/// Only successful completions are ever stored; cancellations and errors
/// never reach [`ResponseCache::put`].
pub struct ResponseCache {
    config: ResponseCacheConfig,
    store: Mutex<CacheStore<String, String>>,
}

impl ResponseCache {
    pub fn builder() -> crate::config::ResponseCacheConfigBuilder {
        crate::config::ResponseCacheConfigBuilder::new()
    }

    pub(crate) fn from_config(config: ResponseCacheConfig) -> Self {
        let store = CacheStore::new(config.max_size, config.ttl, config.policy);
        Self {
            config,
            store: Mutex::new(store),
        }
    }

    /// Looks up a cached response for `(provider, model, prompt)`.
    pub fn get(&self, provider: &str, model: &str, prompt: &str) -> Option<String> {
        let key = fingerprint(provider, model, prompt);
        let hit = self.store.lock().get(&key);

        if hit.is_some() {
            self.config.event_listeners.emit(&CacheEvent::Hit {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
            #[cfg(feature = "metrics")]
            counter!("response_cache_hits_total", "cache" => self.config.name.clone())
                .increment(1);
        } else {
            self.config.event_listeners.emit(&CacheEvent::Miss {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
            #[cfg(feature = "metrics")]
            counter!("response_cache_misses_total", "cache" => self.config.name.clone())
                .increment(1);
        }

        hit
    }

    /// Stores a successful response. Callers must never call this for a
    /// cancelled or errored request.
    pub fn put(&self, provider: &str, model: &str, prompt: &str, response: String) {
        let key = fingerprint(provider, model, prompt);
        let mut store = self.store.lock();
        let was_full = store.len() >= self.config.max_size;
        store.insert(key, response);

        if was_full {
            self.config.event_listeners.emit(&CacheEvent::Eviction {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
