//! Dual-window token bucket that admits a request only when both a
//! per-second and a per-minute counter have capacity, and adapts its
//! refill rates from the upstream's own rate-limit headers.
//!
//! ```
//! use gateway_tokenbucket::TokenBucket;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let bucket = TokenBucket::builder()
//!     .per_second_capacity(5.0)
//!     .per_minute_capacity(100.0)
//!     .build();
//!
//! let cancel = CancellationToken::new();
//! bucket.try_consume(&cancel).await;
//! # }
//! ```

mod bucket;
mod config;
mod events;

pub use bucket::{ConsumeOutcome, TokenBucket, TokenBucketSnapshot};
pub use config::{TokenBucketConfig, TokenBucketConfigBuilder};
pub use events::TokenBucketEvent;
