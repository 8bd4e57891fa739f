use crate::config::{GatewayConfig, ProviderSpec};
use gateway_circuitbreaker::CircuitBreaker;
use gateway_core::error::GatewayError;
use gateway_failover::FailoverDirector;
use gateway_provider::ProviderClient;
use gateway_retry::RetryExecutor;
use gateway_tokenbucket::{ConsumeOutcome, TokenBucket};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One upstream backend's persistent resilience stack (spec §4.7's Provider
/// Entry): its own rate limiter, circuit breaker, retry engine, and HTTP
/// client. A [`FailoverDirector`] is assembled fresh around these for every
/// dispatch — the director itself is a thin, stateless selector; what
/// actually persists across calls is each provider's bucket and breaker.
pub(crate) struct ProviderPipeline {
    pub(crate) name: String,
    bucket: Arc<TokenBucket>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryExecutor,
    client: ProviderClient,
}

impl ProviderPipeline {
    pub(crate) fn new(spec: &ProviderSpec, config: &GatewayConfig) -> Self {
        let bucket = Arc::new(
            TokenBucket::builder()
                .per_second_capacity(config.per_second_capacity)
                .per_minute_capacity(config.per_minute_capacity)
                .base_per_second_rate(config.base_per_second_rate)
                .base_per_minute_rate(config.base_per_minute_rate)
                .name(spec.name.clone())
                .build(),
        );
        let breaker = Arc::new(
            CircuitBreaker::builder()
                .failure_rate_threshold(config.circuit_breaker_failure_threshold)
                .reset_timeout(config.circuit_breaker_reset_timeout)
                // spec.md §4.2 has no minimum-calls precondition: the ratio
                // is live from the first recorded call.
                .minimum_number_of_calls(1)
                .name(spec.name.clone())
                .build(),
        );
        let retry = RetryExecutor::builder()
            .max_attempts(config.max_retry_attempts)
            .initial_delay(config.initial_retry_delay)
            .backoff_multiplier(config.backoff_multiplier)
            .jitter_factor(config.jitter_factor)
            .name(spec.name.clone())
            .build();
        let client = ProviderClient::builder(spec.endpoint.clone(), spec.api_token.clone())
            .name(spec.name.clone())
            .build(Arc::clone(&bucket));

        Self {
            name: spec.name.clone(),
            bucket,
            breaker,
            retry,
            client,
        }
    }

    /// Whether the bucket currently shows immediate capacity in both
    /// windows. A provider below this line is skipped in favor of the next
    /// rather than blocked on, since the failover chain assumes forward
    /// progress; the skipped provider still gets its own local retry budget
    /// next time it comes up first in rotation.
    fn has_immediate_capacity(&self) -> bool {
        let snapshot = self.bucket.snapshot();
        snapshot.remaining_per_second() >= 1.0 && snapshot.remaining_per_minute() >= 1.0
    }
}

/// Builds a fresh [`FailoverDirector`] around the persistent per-provider
/// state and dispatches one request through it (spec §4.7, and the Flow
/// paragraph of spec.md §2: token bucket grant, then retry engine, then
/// breaker admission, then the provider client).
pub(crate) async fn dispatch_via_failover(
    providers: &[Arc<ProviderPipeline>],
    model: &str,
    prompt: &str,
    max_tokens: u32,
    cancel: &CancellationToken,
) -> Result<String, GatewayError> {
    let director = FailoverDirector::builder().build();

    for pipeline in providers {
        let breaker = Arc::clone(&pipeline.breaker);

        let is_available = {
            let pipeline = Arc::clone(pipeline);
            move || pipeline.has_immediate_capacity()
        };
        // No standalone health-check subsystem is carried over from the
        // teacher pack (spec's non-goals exclude added telemetry/health
        // infrastructure beyond the breaker's own failure-ratio tracking).
        let is_healthy = || true;

        let call_pipeline = Arc::clone(pipeline);
        let model = model.to_string();
        let prompt = prompt.to_string();
        let cancel = cancel.clone();

        director.add_provider(
            pipeline.name.clone(),
            breaker,
            is_available,
            is_healthy,
            move || {
                let pipeline = Arc::clone(&call_pipeline);
                let model = model.clone();
                let prompt = prompt.clone();
                let cancel = cancel.clone();
                async move {
                    if !matches!(pipeline.bucket.try_consume(&cancel).await, ConsumeOutcome::Granted) {
                        return Err(GatewayError::Cancelled);
                    }
                    let breaker = Arc::clone(&pipeline.breaker);
                    pipeline
                        .retry
                        .execute(&breaker, &cancel, || pipeline.client.complete(&model, &prompt, max_tokens))
                        .await
                }
            },
        );
    }

    director.dispatch().await
}
