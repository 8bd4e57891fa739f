//! Fingerprint-keyed cache of completed responses (spec §4.8). Only
//! successful completions are cached; cancellations and errors are not.
//!
//! ```
//! use gateway_cache::ResponseCache;
//!
//! let cache = ResponseCache::builder().max_size(1000).build();
//! cache.put("anthropic", "claude-3", "hello", "hi there".to_string());
//! assert_eq!(cache.get("anthropic", "claude-3", "hello"), Some("hi there".to_string()));
//! ```

mod config;
mod events;
mod eviction;
mod fingerprint;
mod response_cache;
mod store;

pub use config::{ResponseCacheConfig, ResponseCacheConfigBuilder};
pub use events::CacheEvent;
pub use eviction::EvictionPolicy;
pub use fingerprint::fingerprint;
pub use response_cache::ResponseCache;
