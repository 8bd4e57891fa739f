use crate::events::TokenBucketEvent;
use gateway_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the dual-window token bucket (spec §4.1, §6).
///
/// Defaults follow the spec's published base rates and burst caps:
/// 1 req/s base with a burst capacity of 5, 50 req/min base with a burst
/// capacity of 100.
pub struct TokenBucketConfig {
    pub(crate) per_second_capacity: f64,
    pub(crate) per_minute_capacity: f64,
    pub(crate) base_per_second_rate: f64,
    pub(crate) base_per_minute_rate: f64,
    pub(crate) poll_interval: Duration,
    pub(crate) event_listeners: EventListeners<TokenBucketEvent>,
    pub(crate) name: String,
}

pub struct TokenBucketConfigBuilder {
    per_second_capacity: f64,
    per_minute_capacity: f64,
    base_per_second_rate: f64,
    base_per_minute_rate: f64,
    poll_interval: Duration,
    event_listeners: EventListeners<TokenBucketEvent>,
    name: String,
}

impl Default for TokenBucketConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBucketConfigBuilder {
    pub fn new() -> Self {
        Self {
            per_second_capacity: 5.0,
            per_minute_capacity: 100.0,
            base_per_second_rate: 1.0,
            base_per_minute_rate: 50.0,
            poll_interval: Duration::from_millis(50),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Burst capacity for the per-second bucket. Default: 5.
    pub fn per_second_capacity(mut self, cap: f64) -> Self {
        self.per_second_capacity = cap;
        self
    }

    /// Burst capacity for the per-minute bucket. Default: 100.
    pub fn per_minute_capacity(mut self, cap: f64) -> Self {
        self.per_minute_capacity = cap;
        self
    }

    /// Sustained per-second refill rate and ceiling for adaptive tuning. Default: 1.0.
    pub fn base_per_second_rate(mut self, rate: f64) -> Self {
        self.base_per_second_rate = rate;
        self
    }

    /// Sustained per-minute refill rate and ceiling for adaptive tuning. Default: 50.0.
    pub fn base_per_minute_rate(mut self, rate: f64) -> Self {
        self.base_per_minute_rate = rate;
        self
    }

    /// Polling interval used while waiting for a permit. Default: 50ms.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_consumed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TokenBucketEvent::Consumed { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    pub fn on_rate_adapted<F>(mut self, f: F) -> Self
    where
        F: Fn(f64, f64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TokenBucketEvent::RateAdapted {
                per_second_rate,
                per_minute_rate,
                ..
            } = event
            {
                f(*per_second_rate, *per_minute_rate);
            }
        }));
        self
    }

    pub fn build(self) -> crate::TokenBucket {
        crate::TokenBucket::from_config(TokenBucketConfig {
            per_second_capacity: self.per_second_capacity,
            per_minute_capacity: self.per_minute_capacity,
            base_per_second_rate: self.base_per_second_rate,
            base_per_minute_rate: self.base_per_minute_rate,
            poll_interval: self.poll_interval,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_spec_base_rates() {
        let bucket = TokenBucketConfigBuilder::new().build();
        let snap = bucket.snapshot();
        assert_eq!(snap.per_second_capacity, 5.0);
        assert_eq!(snap.per_minute_capacity, 100.0);
    }
}
