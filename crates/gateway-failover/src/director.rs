use crate::config::{FailoverConfig, FailoverConfigBuilder};
use crate::events::FailoverEvent;
use futures::future::BoxFuture;
use gateway_circuitbreaker::CircuitBreaker;
use gateway_core::error::{GatewayError, ProviderFailure};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

type ProviderCall = Arc<dyn Fn() -> BoxFuture<'static, Result<String, GatewayError>> + Send + Sync>;
type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Clone)]
struct ProviderHandle {
    name: String,
    breaker: Arc<CircuitBreaker>,
    is_available: Predicate,
    is_healthy: Predicate,
    call: ProviderCall,
}

enum ProviderOutcome {
    Success(String),
    Failed(ProviderFailure),
}

fn is_transient(err: &GatewayError) -> bool {
    match err {
        GatewayError::RateLimited { .. } => true,
        GatewayError::Upstream { status: Some(s), .. } => GatewayError::is_retryable_status(*s),
        GatewayError::Upstream { status: None, .. } => true,
        _ => false,
    }
}

/// Ordered multi-provider failover with per-provider circuit breakers
/// (spec §4.7).
///
/// Providers are tried in the order they were registered. Each is admitted
/// only if its breaker allows a call, its rate limiter reports availability,
/// and it reports healthy; a failed provider is retried locally up to
/// `retry_attempts_per_provider` times on transient errors before the
/// director escalates to the next provider.
pub struct FailoverDirector {
    config: FailoverConfig,
    providers: Mutex<Vec<ProviderHandle>>,
}

impl FailoverDirector {
    pub fn builder() -> FailoverConfigBuilder {
        FailoverConfigBuilder::new()
    }

    pub(crate) fn from_config(config: FailoverConfig) -> Self {
        Self {
            config,
            providers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a provider at the next (lowest-priority-so-far) rank.
    pub fn add_provider<F, Fut, A, H>(
        &self,
        name: impl Into<String>,
        breaker: Arc<CircuitBreaker>,
        is_available: A,
        is_healthy: H,
        call: F,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, GatewayError>> + Send + 'static,
        A: Fn() -> bool + Send + Sync + 'static,
        H: Fn() -> bool + Send + Sync + 'static,
    {
        let handle = ProviderHandle {
            name: name.into(),
            breaker,
            is_available: Arc::new(is_available),
            is_healthy: Arc::new(is_healthy),
            call: Arc::new(move || Box::pin(call())),
        };
        self.providers.lock().push(handle);
    }

    pub fn provider_count(&self) -> usize {
        self.providers.lock().len()
    }

    /// Tries each registered provider in rank order and returns the first
    /// success, or `AllProvidersFailed` aggregating every provider's reason.
    pub async fn dispatch(&self) -> Result<String, GatewayError> {
        let providers = self.providers.lock().clone();
        let mut failures = Vec::with_capacity(providers.len());

        for provider in providers {
            match self.try_provider(&provider).await {
                ProviderOutcome::Success(response) => return Ok(response),
                ProviderOutcome::Failed(failure) => failures.push(failure),
            }
        }

        self.config
            .event_listeners
            .emit(&FailoverEvent::AllProvidersFailed {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
        Err(GatewayError::AllProvidersFailed { attempts: failures })
    }

    /// Runs the admission checks and the retry-with-backoff loop against a
    /// single provider.
    async fn try_provider(&self, provider: &ProviderHandle) -> ProviderOutcome {
        if !provider.breaker.admit() {
            self.emit_skip(&provider.name, "breaker_open");
            return ProviderOutcome::Failed(ProviderFailure {
                provider: provider.name.clone(),
                reason: Box::new(GatewayError::BreakerOpen {
                    provider: provider.name.clone(),
                }),
            });
        }
        if !(provider.is_available)() {
            self.emit_skip(&provider.name, "rate_limited");
            return ProviderOutcome::Failed(ProviderFailure {
                provider: provider.name.clone(),
                reason: Box::new(GatewayError::RateLimited { retry_after: None }),
            });
        }
        if !(provider.is_healthy)() {
            self.emit_skip(&provider.name, "unhealthy");
            return ProviderOutcome::Failed(ProviderFailure {
                provider: provider.name.clone(),
                reason: Box::new(GatewayError::Upstream {
                    status: None,
                    message: "provider reported unhealthy".to_string(),
                }),
            });
        }

        let mut attempt: u32 = 1;
        loop {
            match (provider.call)().await {
                Ok(response) => {
                    provider.breaker.record_success();
                    self.config
                        .event_listeners
                        .emit(&FailoverEvent::ProviderSucceeded {
                            name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            provider: provider.name.clone(),
                        });
                    return ProviderOutcome::Success(response);
                }
                Err(err) => {
                    provider.breaker.record_failure();
                    let retry_budget_left = attempt < self.config.retry_attempts_per_provider;

                    if is_transient(&err) && retry_budget_left {
                        self.config.event_listeners.emit(
                            &FailoverEvent::ProviderAttemptFailed {
                                name: self.config.name.clone(),
                                timestamp: Instant::now(),
                                provider: provider.name.clone(),
                                attempt,
                            },
                        );
                        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                        attempt += 1;
                        continue;
                    }

                    self.config
                        .event_listeners
                        .emit(&FailoverEvent::ProviderExhausted {
                            name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            provider: provider.name.clone(),
                        });
                    return ProviderOutcome::Failed(ProviderFailure {
                        provider: provider.name.clone(),
                        reason: Box::new(err),
                    });
                }
            }
        }
    }

    fn emit_skip(&self, provider: &str, reason: &'static str) {
        self.config.event_listeners.emit(&FailoverEvent::ProviderSkipped {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            provider: provider.to_string(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_circuitbreaker::CircuitBreaker;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn first_healthy_provider_serves_the_request() {
        let director = FailoverDirector::builder().build();
        director.add_provider(
            "primary",
            Arc::new(CircuitBreaker::builder().build()),
            || true,
            || true,
            || async { Ok("primary response".to_string()) },
        );

        assert_eq!(director.dispatch().await.unwrap(), "primary response");
    }

    #[tokio::test]
    async fn falls_back_to_next_provider_on_terminal_error() {
        let director = FailoverDirector::builder().build();
        director.add_provider(
            "primary",
            Arc::new(CircuitBreaker::builder().build()),
            || true,
            || true,
            || async {
                Err(GatewayError::Upstream {
                    status: Some(400),
                    message: "bad request".to_string(),
                })
            },
        );
        director.add_provider(
            "backup",
            Arc::new(CircuitBreaker::builder().build()),
            || true,
            || true,
            || async { Ok("backup response".to_string()) },
        );

        assert_eq!(director.dispatch().await.unwrap(), "backup response");
    }

    #[tokio::test]
    async fn skips_provider_whose_breaker_is_open() {
        let breaker = Arc::new(
            CircuitBreaker::builder()
                .minimum_number_of_calls(1)
                .failure_rate_threshold(0.1)
                .build(),
        );
        breaker.record_failure();
        assert_eq!(breaker.state(), gateway_circuitbreaker::CircuitState::Open);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let director = FailoverDirector::builder().build();
        director.add_provider(
            "primary",
            breaker,
            || true,
            || true,
            move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                async { Ok("unreachable".to_string()) }
            },
        );
        director.add_provider(
            "backup",
            Arc::new(CircuitBreaker::builder().build()),
            || true,
            || true,
            || async { Ok("backup response".to_string()) },
        );

        assert_eq!(director.dispatch().await.unwrap(), "backup response");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn aggregates_all_provider_failures_when_every_provider_fails() {
        let director = FailoverDirector::builder().build();
        director.add_provider(
            "primary",
            Arc::new(CircuitBreaker::builder().build()),
            || true,
            || true,
            || async {
                Err(GatewayError::Upstream {
                    status: Some(400),
                    message: "bad".to_string(),
                })
            },
        );
        director.add_provider(
            "backup",
            Arc::new(CircuitBreaker::builder().build()),
            || true,
            || true,
            || async {
                Err(GatewayError::Upstream {
                    status: Some(401),
                    message: "unauthorized".to_string(),
                })
            },
        );

        let err = director.dispatch().await.unwrap_err();
        match err {
            GatewayError::AllProvidersFailed { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].provider, "primary");
                assert_eq!(attempts[1].provider, "backup");
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_retries_same_provider_before_failover() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let director = FailoverDirector::builder()
            .retry_attempts_per_provider(2)
            .build();
        director.add_provider(
            "primary",
            Arc::new(CircuitBreaker::builder().build()),
            || true,
            || true,
            move || {
                let attempts = Arc::clone(&attempts_clone);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err(GatewayError::Upstream {
                            status: Some(503),
                            message: "busy".to_string(),
                        })
                    } else {
                        Ok("recovered".to_string())
                    }
                }
            },
        );

        assert_eq!(director.dispatch().await.unwrap(), "recovered");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
