use gateway_core::events::ResilienceEvent;
use std::time::Instant;

/// Events emitted by the failover director (spec §4.7).
#[derive(Debug, Clone)]
pub enum FailoverEvent {
    /// A provider was skipped without being called (breaker open, rate
    /// limiter unavailable, or unhealthy).
    ProviderSkipped {
        name: String,
        timestamp: Instant,
        provider: String,
        reason: &'static str,
    },
    /// A single call attempt against a provider failed transiently and will
    /// be retried against the same provider after a backoff.
    ProviderAttemptFailed {
        name: String,
        timestamp: Instant,
        provider: String,
        attempt: u32,
    },
    /// A provider call succeeded.
    ProviderSucceeded {
        name: String,
        timestamp: Instant,
        provider: String,
    },
    /// A provider was exhausted (terminal error or retry budget spent) and
    /// the director moves to the next provider in rank order.
    ProviderExhausted {
        name: String,
        timestamp: Instant,
        provider: String,
    },
    /// Every configured provider failed.
    AllProvidersFailed { name: String, timestamp: Instant },
}

impl ResilienceEvent for FailoverEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::ProviderSkipped { .. } => "provider_skipped",
            Self::ProviderAttemptFailed { .. } => "provider_attempt_failed",
            Self::ProviderSucceeded { .. } => "provider_succeeded",
            Self::ProviderExhausted { .. } => "provider_exhausted",
            Self::AllProvidersFailed { .. } => "all_providers_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            Self::ProviderSkipped { timestamp, .. }
            | Self::ProviderAttemptFailed { timestamp, .. }
            | Self::ProviderSucceeded { timestamp, .. }
            | Self::ProviderExhausted { timestamp, .. }
            | Self::AllProvidersFailed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            Self::ProviderSkipped { name, .. }
            | Self::ProviderAttemptFailed { name, .. }
            | Self::ProviderSucceeded { name, .. }
            | Self::ProviderExhausted { name, .. }
            | Self::AllProvidersFailed { name, .. } => name,
        }
    }
}
