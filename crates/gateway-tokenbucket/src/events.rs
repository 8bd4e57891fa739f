//! Observability events emitted by the token bucket.

use gateway_core::ResilienceEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum TokenBucketEvent {
    /// A consumption was granted, optionally after waiting.
    Consumed {
        name: String,
        timestamp: Instant,
        waited: std::time::Duration,
    },
    /// The caller's context was cancelled while waiting for a permit.
    Cancelled { name: String, timestamp: Instant },
    /// Refill rates were adapted from a recent header snapshot.
    RateAdapted {
        name: String,
        timestamp: Instant,
        per_second_rate: f64,
        per_minute_rate: f64,
    },
}

impl ResilienceEvent for TokenBucketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TokenBucketEvent::Consumed { .. } => "consumed",
            TokenBucketEvent::Cancelled { .. } => "cancelled",
            TokenBucketEvent::RateAdapted { .. } => "rate_adapted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TokenBucketEvent::Consumed { timestamp, .. }
            | TokenBucketEvent::Cancelled { timestamp, .. }
            | TokenBucketEvent::RateAdapted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TokenBucketEvent::Consumed { name, .. }
            | TokenBucketEvent::Cancelled { name, .. }
            | TokenBucketEvent::RateAdapted { name, .. } => name,
        }
    }
}
