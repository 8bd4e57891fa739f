use crate::events::FailoverEvent;
use gateway_core::events::{EventListeners, FnListener};

/// Configuration for a [`crate::FailoverDirector`] (spec §4.7).
pub struct FailoverConfig {
    pub(crate) retry_attempts_per_provider: u32,
    pub(crate) event_listeners: EventListeners<FailoverEvent>,
    pub(crate) name: String,
}

/// Builder for a [`crate::FailoverDirector`].
///
/// Additional per-provider retry attempts are meant for callers that pass a
/// raw provider call into [`crate::FailoverDirector::add_provider`]. When the
/// closure already wraps `gateway_retry::RetryExecutor` (the usual wiring),
/// leave this at its default of `1` so the two backoff schedules don't
/// compound against the same upstream.
pub struct FailoverConfigBuilder {
    retry_attempts_per_provider: u32,
    event_listeners: EventListeners<FailoverEvent>,
    name: String,
}

impl Default for FailoverConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FailoverConfigBuilder {
    pub fn new() -> Self {
        Self {
            retry_attempts_per_provider: 1,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    pub fn retry_attempts_per_provider(mut self, attempts: u32) -> Self {
        self.retry_attempts_per_provider = attempts.max(1);
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_all_providers_failed<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, FailoverEvent::AllProvidersFailed { .. }) {
                f();
            }
        }));
        self
    }

    pub fn build(self) -> crate::FailoverDirector {
        let config = FailoverConfig {
            retry_attempts_per_provider: self.retry_attempts_per_provider,
            event_listeners: self.event_listeners,
            name: self.name,
        };
        crate::FailoverDirector::from_config(config)
    }
}
