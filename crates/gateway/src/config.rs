use std::time::Duration;

/// One upstream backend: a name (used for breaker/bucket naming and as the
/// failover rank), an endpoint, and its own API token.
pub(crate) struct ProviderSpec {
    pub(crate) name: String,
    pub(crate) endpoint: String,
    pub(crate) api_token: String,
}

/// Construction-time configuration for an [`crate::LlmGateway`] (spec.md §6).
pub struct GatewayConfig {
    pub(crate) default_model: String,
    pub(crate) max_token_limit: u32,
    pub(crate) providers: Vec<ProviderSpec>,

    pub(crate) max_retry_attempts: usize,
    pub(crate) initial_retry_delay: Duration,
    pub(crate) backoff_multiplier: f64,
    pub(crate) jitter_factor: f64,

    pub(crate) circuit_breaker_failure_threshold: f64,
    pub(crate) circuit_breaker_reset_timeout: Duration,

    pub(crate) per_second_capacity: f64,
    pub(crate) per_minute_capacity: f64,
    pub(crate) base_per_second_rate: f64,
    pub(crate) base_per_minute_rate: f64,

    pub(crate) max_batch_age: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) queue_capacity: usize,
    pub(crate) cache_size: usize,
}

/// Builder for [`GatewayConfig`] / [`crate::LlmGateway`].
///
/// The primary provider is registered under the name `"primary"`; additional
/// backends for the failover director are added with
/// [`add_fallback_provider`](Self::add_fallback_provider) in the order they
/// should be tried.
pub struct GatewayConfigBuilder {
    default_model: String,
    max_token_limit: u32,
    providers: Vec<ProviderSpec>,

    max_retry_attempts: usize,
    initial_retry_delay: Duration,
    backoff_multiplier: f64,
    jitter_factor: f64,

    circuit_breaker_failure_threshold: f64,
    circuit_breaker_reset_timeout: Duration,

    per_second_capacity: f64,
    per_minute_capacity: f64,
    base_per_second_rate: f64,
    base_per_minute_rate: f64,

    max_batch_age: Duration,
    request_timeout: Duration,
    queue_capacity: usize,
    cache_size: usize,
}

impl GatewayConfigBuilder {
    pub fn new(
        api_endpoint: impl Into<String>,
        api_token: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            default_model: default_model.into(),
            max_token_limit: 4096,
            providers: vec![ProviderSpec {
                name: "primary".to_string(),
                endpoint: api_endpoint.into(),
                api_token: api_token.into(),
            }],
            max_retry_attempts: 3,
            initial_retry_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter_factor: 0.25,
            circuit_breaker_failure_threshold: 0.5,
            circuit_breaker_reset_timeout: Duration::from_secs(30),
            per_second_capacity: 5.0,
            per_minute_capacity: 100.0,
            base_per_second_rate: 1.0,
            base_per_minute_rate: 50.0,
            max_batch_age: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            queue_capacity: 1000,
            cache_size: 1000,
        }
    }

    /// Registers another backend to try, in order, after every provider
    /// already added. The primary endpoint passed to [`new`](Self::new) is
    /// always tried first.
    pub fn add_fallback_provider(
        mut self,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        self.providers.push(ProviderSpec {
            name: name.into(),
            endpoint: endpoint.into(),
            api_token: api_token.into(),
        });
        self
    }

    pub fn max_token_limit(mut self, limit: u32) -> Self {
        self.max_token_limit = limit;
        self
    }

    pub fn max_retry_attempts(mut self, attempts: usize) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    pub fn initial_retry_delay(mut self, delay: Duration) -> Self {
        self.initial_retry_delay = delay;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    pub fn circuit_breaker_failure_threshold(mut self, threshold: f64) -> Self {
        self.circuit_breaker_failure_threshold = threshold;
        self
    }

    pub fn circuit_breaker_reset_timeout(mut self, timeout: Duration) -> Self {
        self.circuit_breaker_reset_timeout = timeout;
        self
    }

    /// Burst capacities and sustained refill rates shared by every
    /// provider's token bucket. Defaults match spec.md §6: 5/sec and
    /// 100/min burst, 1 req/s and 50 req/min sustained.
    pub fn rate_limits(
        mut self,
        per_second_capacity: f64,
        per_minute_capacity: f64,
        base_per_second_rate: f64,
        base_per_minute_rate: f64,
    ) -> Self {
        self.per_second_capacity = per_second_capacity;
        self.per_minute_capacity = per_minute_capacity;
        self.base_per_second_rate = base_per_second_rate;
        self.base_per_minute_rate = base_per_minute_rate;
        self
    }

    pub fn max_batch_age(mut self, age: Duration) -> Self {
        self.max_batch_age = age;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    pub fn build(self) -> std::sync::Arc<crate::LlmGateway> {
        let config = GatewayConfig {
            default_model: self.default_model,
            max_token_limit: self.max_token_limit,
            providers: self.providers,
            max_retry_attempts: self.max_retry_attempts,
            initial_retry_delay: self.initial_retry_delay,
            backoff_multiplier: self.backoff_multiplier,
            jitter_factor: self.jitter_factor,
            circuit_breaker_failure_threshold: self.circuit_breaker_failure_threshold,
            circuit_breaker_reset_timeout: self.circuit_breaker_reset_timeout,
            per_second_capacity: self.per_second_capacity,
            per_minute_capacity: self.per_minute_capacity,
            base_per_second_rate: self.base_per_second_rate,
            base_per_minute_rate: self.base_per_minute_rate,
            max_batch_age: self.max_batch_age,
            request_timeout: self.request_timeout,
            queue_capacity: self.queue_capacity,
            cache_size: self.cache_size,
        };
        crate::LlmGateway::from_config(config)
    }
}
