//! Retry-with-jitter engine that honors server-supplied rate-limit reset
//! hints and records outcomes against a per-provider circuit breaker
//! (spec §4.3).
//!
//! ```
//! use gateway_retry::RetryExecutor;
//! use gateway_circuitbreaker::CircuitBreaker;
//! use gateway_core::GatewayError;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), GatewayError> {
//! let executor = RetryExecutor::builder().max_attempts(3).build();
//! let breaker = CircuitBreaker::builder().build();
//! let cancel = CancellationToken::new();
//!
//! let value = executor
//!     .execute(&breaker, &cancel, || async { Ok::<_, GatewayError>(1) })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod events;
mod executor;

pub use config::{default_retryable_statuses, RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use executor::RetryExecutor;
