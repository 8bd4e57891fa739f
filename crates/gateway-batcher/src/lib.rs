//! Content-keyed request batcher (spec §4.5): identical `(model, prompt,
//! maxTokens)` requests arriving while a batch is open are joined into it,
//! and a periodic sweep flushes batches once they age past `maxBatchAgeMs`.
//!
//! ```no_run
//! use gateway_batcher::Batcher;
//!
//! # async fn run() {
//! let batcher = Batcher::builder().build(|_model, prompt, _max_tokens| {
//!     Box::pin(async move { Ok(format!("echo: {prompt}")) })
//! });
//! let mut rx = batcher.enqueue("claude-3".to_string(), "hello".to_string(), 256);
//! let outcome = rx.recv().await.unwrap();
//! # }
//! ```

mod batch;
mod config;
mod events;

pub use batch::{BatchKey, BatchOutcome, Batcher};
pub use config::{BatcherConfig, BatcherConfigBuilder};
pub use events::BatcherEvent;
