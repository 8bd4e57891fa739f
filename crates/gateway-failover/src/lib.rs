//! Ordered multi-provider failover with per-provider circuit breakers
//! (spec §4.7). Providers fail independently: a provider-local breaker
//! keeps one sick backend from poisoning the whole stream while healthy
//! peers keep serving.
//!
//! ```no_run
//! use gateway_failover::FailoverDirector;
//! use gateway_circuitbreaker::CircuitBreaker;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let director = FailoverDirector::builder().build();
//! director.add_provider(
//!     "anthropic-primary",
//!     Arc::new(CircuitBreaker::builder().build()),
//!     || true,
//!     || true,
//!     || async { Ok("response".to_string()) },
//! );
//! let response = director.dispatch().await.unwrap();
//! # }
//! ```

mod config;
mod director;
mod events;

pub use config::{FailoverConfig, FailoverConfigBuilder};
pub use director::FailoverDirector;
pub use events::FailoverEvent;
