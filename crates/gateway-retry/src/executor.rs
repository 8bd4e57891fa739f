use crate::config::RetryConfig;
use crate::events::RetryEvent;
use gateway_circuitbreaker::CircuitBreaker;
use gateway_core::error::GatewayError;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use metrics::counter;

fn is_retryable(err: &GatewayError, retryable_statuses: &std::collections::HashSet<u16>) -> bool {
    match err {
        GatewayError::RateLimited { .. } => true,
        GatewayError::Upstream { status: Some(s), .. } => retryable_statuses.contains(s),
        GatewayError::Upstream { status: None, .. } => true,
        _ => false,
    }
}

/// Retry-with-jitter engine (spec §4.3). Wraps a fallible async operation,
/// recording one breaker outcome per attempt and applying exponential
/// backoff with jitter between retryable failures.
///
/// The REDESIGN FLAG from spec.md §9.1 is applied here: a non-retryable
/// error records exactly one breaker failure and returns immediately,
/// rather than falling into the backoff/sleep path.
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn builder() -> crate::config::RetryConfigBuilder {
        crate::config::RetryConfigBuilder::new()
    }

    pub(crate) fn from_config(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Runs `operation` to completion: `execute(operation, ctx) -> result`
    /// (spec's `priority` argument is carried by the caller's queue/batcher
    /// layer, not by the retry engine itself).
    pub async fn execute<F, Fut, T>(
        &self,
        breaker: &CircuitBreaker,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1usize;
        let mut delay = self.config.initial_delay;

        loop {
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            match operation().await {
                Ok(value) => {
                    breaker.record_success();
                    self.config.event_listeners.emit(&RetryEvent::Success {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => self.config.name.clone(), "result" => "success")
                        .increment(1);
                    return Ok(value);
                }
                Err(err) => {
                    breaker.record_failure();

                    if !is_retryable(&err, &self.config.retryable_statuses) {
                        self.config.event_listeners.emit(&RetryEvent::IgnoredError {
                            name: self.config.name.clone(),
                            timestamp: Instant::now(),
                        });
                        return Err(err);
                    }

                    if attempt >= self.config.max_attempts {
                        self.config.event_listeners.emit(&RetryEvent::Exhausted {
                            name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            attempts: attempt,
                        });
                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => self.config.name.clone(), "result" => "exhausted")
                            .increment(1);
                        return Err(err);
                    }

                    let base = match &err {
                        GatewayError::RateLimited {
                            retry_after: Some(reset),
                        } => *reset,
                        _ => delay,
                    };
                    let jitter = rand::random::<f64>() * self.config.jitter_factor * base.as_secs_f64();
                    let wait = base + Duration::from_secs_f64(jitter.max(0.0));

                    self.config.event_listeners.emit(&RetryEvent::Retry {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempt,
                        delay: wait,
                    });

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }

                    delay = Duration::from_secs_f64(delay.as_secs_f64() * self.config.backoff_multiplier);
                    attempt += 1;
                }
            }
        }
    }
}
