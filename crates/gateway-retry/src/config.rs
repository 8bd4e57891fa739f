use crate::events::RetryEvent;
use gateway_core::events::{EventListeners, FnListener};
use std::collections::HashSet;
use std::time::Duration;

/// Retryable HTTP statuses per spec.md §6.
pub fn default_retryable_statuses() -> HashSet<u16> {
    [408, 429, 500, 502, 503, 504].into_iter().collect()
}

/// Configuration for the retry engine (spec §4.3).
pub struct RetryConfig {
    pub(crate) max_attempts: usize,
    pub(crate) initial_delay: Duration,
    pub(crate) backoff_multiplier: f64,
    pub(crate) jitter_factor: f64,
    pub(crate) retryable_statuses: HashSet<u16>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

pub struct RetryConfigBuilder {
    max_attempts: usize,
    initial_delay: Duration,
    backoff_multiplier: f64,
    jitter_factor: f64,
    retryable_statuses: HashSet<u16>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter_factor: 0.25,
            retryable_statuses: default_retryable_statuses(),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Maximum attempts including the initial one. Default: 3.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before the first retry. Default: 500ms.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Multiplier applied to the delay after each attempt. Default: 2.0.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Fraction of the delay added as uniform random jitter. Default: 0.25.
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Overrides the set of HTTP statuses considered retryable.
    pub fn retryable_statuses(mut self, statuses: HashSet<u16>) -> Self {
        self.retryable_statuses = statuses;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    pub fn build(self) -> crate::RetryExecutor {
        crate::RetryExecutor::from_config(RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_delay,
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
            retryable_statuses: self.retryable_statuses,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
