use crate::events::CircuitBreakerEvent;
use gateway_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the circuit breaker (spec §4.2).
pub struct CircuitBreakerConfig {
    pub(crate) failure_rate_threshold: f64,
    pub(crate) reset_timeout: Duration,
    pub(crate) permitted_calls_in_half_open: usize,
    pub(crate) minimum_number_of_calls: usize,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    pub(crate) fn minimum_number_of_calls(&self) -> usize {
        self.minimum_number_of_calls
    }
}

pub struct CircuitBreakerConfigBuilder {
    failure_rate_threshold: f64,
    reset_timeout: Duration,
    permitted_calls_in_half_open: usize,
    minimum_number_of_calls: usize,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            reset_timeout: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
            minimum_number_of_calls: 10,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Failure ratio (failed/total within the reset window) at which the
    /// circuit opens. Default: 0.5.
    pub fn failure_rate_threshold(mut self, threshold: f64) -> Self {
        self.failure_rate_threshold = threshold;
        self
    }

    /// How long the circuit stays Open before admitting a HalfOpen trial
    /// call. Default: 30s.
    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Number of trial calls permitted while HalfOpen. Default: 1.
    pub fn permitted_calls_in_half_open(mut self, n: usize) -> Self {
        self.permitted_calls_in_half_open = n;
        self
    }

    /// Minimum number of calls recorded in the window before the failure
    /// ratio is evaluated at all. Default: 10.
    pub fn minimum_number_of_calls(mut self, n: usize) -> Self {
        self.minimum_number_of_calls = n;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::circuit::CircuitState, crate::circuit::CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::StateTransition { from, to, .. } = event {
                f(*from, *to);
            }
        }));
        self
    }

    pub fn build(self) -> crate::CircuitBreaker {
        crate::CircuitBreaker::from_config(CircuitBreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            reset_timeout: self.reset_timeout,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            minimum_number_of_calls: self.minimum_number_of_calls,
            event_listeners: self.event_listeners,
            name: self.name,
        })
    }
}
