use crate::wire::ANTHROPIC_VERSION;

/// Configuration for a [`crate::ProviderClient`] (spec §4.6).
pub struct ProviderClientConfig {
    pub(crate) endpoint: String,
    pub(crate) api_key: String,
    pub(crate) anthropic_version: String,
    pub(crate) name: String,
}

pub struct ProviderClientConfigBuilder {
    endpoint: String,
    api_key: String,
    anthropic_version: String,
    name: String,
}

impl ProviderClientConfigBuilder {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            anthropic_version: ANTHROPIC_VERSION.to_string(),
            name: "<unnamed>".to_string(),
        }
    }

    pub fn anthropic_version(mut self, version: impl Into<String>) -> Self {
        self.anthropic_version = version.into();
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(
        self,
        bucket: std::sync::Arc<gateway_tokenbucket::TokenBucket>,
    ) -> crate::ProviderClient {
        let config = ProviderClientConfig {
            endpoint: self.endpoint,
            api_key: self.api_key,
            anthropic_version: self.anthropic_version,
            name: self.name,
        };
        crate::ProviderClient::from_config(config, bucket)
    }
}
