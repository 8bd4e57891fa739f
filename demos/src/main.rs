//! Minimal caller of the gateway facade, configured from the environment.
//!
//! Run with: `ANTHROPIC_API_KEY=sk-ant-... cargo run -p gateway-demo`
//!
//! `GATEWAY_DEMO_CONFIG` may point at a TOML file overriding the tunables
//! below; everything else is construction-time defaults per spec.md §6 —
//! there is no general-purpose config loader, just this one binary's own
//! env/file glue.

use gateway::LlmGateway;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
struct Overrides {
    max_retry_attempts: Option<u32>,
    circuit_breaker_failure_threshold: Option<f64>,
    per_second_capacity: Option<f64>,
    per_minute_capacity: Option<f64>,
}

impl Overrides {
    fn load() -> Self {
        let Ok(path) = std::env::var("GATEWAY_DEMO_CONFIG") else {
            return Self::default();
        };
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(%path, %err, "could not read demo config file, using defaults");
                return Self::default();
            }
        };
        toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(%path, %err, "could not parse demo config file, using defaults");
            Self::default()
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let endpoint = std::env::var("ANTHROPIC_API_ENDPOINT")
        .unwrap_or_else(|_| "https://api.anthropic.com".to_string());
    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .expect("ANTHROPIC_API_KEY must be set to run this demo");
    let model = std::env::var("GATEWAY_MODEL")
        .unwrap_or_else(|_| "claude-3-opus-20240229".to_string());

    let overrides = Overrides::load();
    let mut builder = LlmGateway::builder(endpoint, api_key, model);
    if let Some(attempts) = overrides.max_retry_attempts {
        builder = builder.max_retry_attempts(attempts);
    }
    if let Some(threshold) = overrides.circuit_breaker_failure_threshold {
        builder = builder.circuit_breaker_failure_threshold(threshold);
    }
    if overrides.per_second_capacity.is_some() || overrides.per_minute_capacity.is_some() {
        builder = builder.rate_limits(
            overrides.per_second_capacity.unwrap_or(5.0),
            overrides.per_minute_capacity.unwrap_or(100.0),
            1.0,
            50.0,
        );
    }
    if let Ok(fallback) = std::env::var("ANTHROPIC_FALLBACK_ENDPOINT") {
        let fallback_key = std::env::var("ANTHROPIC_FALLBACK_API_KEY")
            .expect("ANTHROPIC_FALLBACK_API_KEY must be set alongside ANTHROPIC_FALLBACK_ENDPOINT");
        builder = builder.add_fallback_provider("fallback", fallback, fallback_key);
    }

    let gateway = builder.build();

    match tokio::time::timeout(Duration::from_secs(60), gateway.get_completion("Say hello in one word."))
        .await
    {
        Ok(Ok(answer)) => println!("{answer}"),
        Ok(Err(err)) => eprintln!("gateway call failed: {err}"),
        Err(_) => eprintln!("gateway call timed out"),
    }
}
