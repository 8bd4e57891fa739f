//! Three-state circuit breaker (Closed/Open/HalfOpen) guarding each
//! upstream provider, with a time-based sliding failure window (spec §4.2).
//!
//! ```
//! use gateway_circuitbreaker::CircuitBreaker;
//!
//! let breaker = CircuitBreaker::builder()
//!     .failure_rate_threshold(0.5)
//!     .minimum_number_of_calls(10)
//!     .build();
//!
//! if breaker.admit() {
//!     // call the upstream, then:
//!     breaker.record_success();
//! }
//! ```

mod circuit;
mod config;
mod events;

pub use circuit::{CircuitBreaker, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::CircuitBreakerEvent;
