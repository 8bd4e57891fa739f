//! HTTP client for the Anthropic Messages API (spec §4.6), feeding
//! rate-limit response headers back into the shared token bucket.
//!
//! ```no_run
//! use gateway_provider::ProviderClient;
//! use gateway_tokenbucket::TokenBucket;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let bucket = Arc::new(TokenBucket::builder().build());
//! let client = ProviderClient::builder("https://api.anthropic.com", "sk-ant-...")
//!     .build(bucket);
//! let text = client.complete("claude-3-opus-20240229", "hi", 256).await.unwrap();
//! # }
//! ```

mod client;
mod config;
mod wire;

pub use client::ProviderClient;
pub use config::{ProviderClientConfig, ProviderClientConfigBuilder};
pub use wire::{CompletionRequest, CompletionResponse, ANTHROPIC_VERSION, EMPTY_RESPONSE_SENTINEL};
