use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;

/// The three states of the breaker (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct CallRecord {
    at: Instant,
    is_failure: bool,
}

struct State {
    circuit: CircuitState,
    window: VecDeque<CallRecord>,
    opened_at: Option<Instant>,
    half_open_calls_in_flight: usize,
}

/// Three-state circuit breaker backed by a time-based sliding window of
/// call outcomes (spec §4.2). Failures older than `reset_timeout` are
/// evicted from the window on every `admit` call.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn builder() -> crate::config::CircuitBreakerConfigBuilder {
        crate::config::CircuitBreakerConfigBuilder::new()
    }

    pub(crate) fn from_config(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State {
                circuit: CircuitState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                half_open_calls_in_flight: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().circuit
    }

    /// Evicts stale window entries, advances Open -> HalfOpen once
    /// `reset_timeout` has elapsed, and reports whether a call may proceed.
    pub fn admit(&self) -> bool {
        let mut state = self.state.lock();
        self.evict_stale(&mut state);

        match state.circuit {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let opened_at = state.opened_at.expect("open state always has opened_at");
                if opened_at.elapsed() >= self.config.reset_timeout {
                    self.transition_locked(&mut state, CircuitState::HalfOpen);
                    state.half_open_calls_in_flight += 1;
                    self.emit_permitted(&state);
                    true
                } else {
                    self.emit_rejected();
                    false
                }
            }
            CircuitState::HalfOpen => {
                if state.half_open_calls_in_flight < self.config.permitted_calls_in_half_open {
                    state.half_open_calls_in_flight += 1;
                    self.emit_permitted(&state);
                    true
                } else {
                    self.emit_rejected();
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock();
        self.evict_stale(&mut state);
        state.window.push_back(CallRecord {
            at: Instant::now(),
            is_failure: false,
        });

        if state.circuit == CircuitState::HalfOpen {
            state.half_open_calls_in_flight = state.half_open_calls_in_flight.saturating_sub(1);
            self.transition_locked(&mut state, CircuitState::Closed);
            state.window.clear();
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        self.evict_stale(&mut state);
        state.window.push_back(CallRecord {
            at: Instant::now(),
            is_failure: true,
        });

        if state.circuit == CircuitState::HalfOpen {
            state.half_open_calls_in_flight = state.half_open_calls_in_flight.saturating_sub(1);
            self.transition_locked(&mut state, CircuitState::Open);
            state.window.clear();
            return;
        }

        if state.circuit == CircuitState::Closed
            && state.window.len() >= self.config.minimum_number_of_calls()
        {
            let failures = state.window.iter().filter(|r| r.is_failure).count();
            let ratio = failures as f64 / state.window.len() as f64;
            if ratio >= self.config.failure_rate_threshold {
                self.transition_locked(&mut state, CircuitState::Open);
            }
        }
    }

    fn evict_stale(&self, state: &mut State) {
        let cutoff = Instant::now()
            .checked_sub(self.config.reset_timeout)
            .unwrap_or_else(Instant::now);
        while let Some(front) = state.window.front() {
            if front.at < cutoff {
                state.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn transition_locked(&self, state: &mut State, to: CircuitState) {
        let from = state.circuit;
        if from == to {
            return;
        }
        state.circuit = to;
        if to == CircuitState::Open {
            state.opened_at = Some(Instant::now());
        }
        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
                from,
                to,
            });
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_state_transitions_total", "breaker" => self.config.name.clone())
            .increment(1);
    }

    fn emit_permitted(&self, state: &State) {
        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallPermitted {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
                state: state.circuit,
            });
    }

    fn emit_rejected(&self) {
        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_rejected_total", "breaker" => self.config.name.clone())
            .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn starts_closed_and_admits() {
        let cb = CircuitBreaker::builder()
            .failure_rate_threshold(0.5)
            .minimum_number_of_calls(2)
            .build();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.admit());
    }

    #[test]
    fn opens_once_failure_ratio_crosses_threshold() {
        let cb = CircuitBreaker::builder()
            .failure_rate_threshold(0.5)
            .minimum_number_of_calls(2)
            .build();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.admit());
    }

    #[test]
    fn half_open_success_closes_and_failure_reopens() {
        let cb = CircuitBreaker::builder()
            .failure_rate_threshold(0.5)
            .minimum_number_of_calls(2)
            .reset_timeout(Duration::from_millis(10))
            .build();
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.admit());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_circuit() {
        let cb = CircuitBreaker::builder()
            .failure_rate_threshold(0.5)
            .minimum_number_of_calls(2)
            .reset_timeout(Duration::from_millis(10))
            .build();
        cb.record_failure();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert!(cb.admit());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn stale_failures_age_out_of_the_window() {
        let cb = CircuitBreaker::builder()
            .failure_rate_threshold(0.5)
            .minimum_number_of_calls(2)
            .reset_timeout(Duration::from_millis(20))
            .build();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(25));
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
