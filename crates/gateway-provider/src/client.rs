use crate::config::{ProviderClientConfig, ProviderClientConfigBuilder};
use crate::wire::{CompletionRequest, CompletionResponse, Message};
use gateway_core::error::GatewayError;
use gateway_tokenbucket::TokenBucket;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Thin HTTP client over the Anthropic Messages API (spec §4.6).
///
/// Exposes no retry or queueing of its own: a single failed call is a
/// single failed call, and it's the retry engine, queue, and batcher's job
/// to decide what happens next. The only self-directed behavior is the
/// pre-call adaptive delay, which leans on the shared token bucket's live
/// snapshot to avoid a near-certain 429 before it happens.
pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderClientConfig,
    bucket: Arc<TokenBucket>,
}

impl ProviderClient {
    pub fn builder(endpoint: impl Into<String>, api_key: impl Into<String>) -> ProviderClientConfigBuilder {
        ProviderClientConfigBuilder::new(endpoint, api_key)
    }

    pub(crate) fn from_config(config: ProviderClientConfig, bucket: Arc<TokenBucket>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            bucket,
        }
    }

    /// Performs one completion call. Parses rate-limit headers back into
    /// the token bucket regardless of success or failure.
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, GatewayError> {
        self.adaptive_delay().await;

        let body = CompletionRequest {
            model,
            max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: None,
            stream: None,
        };

        let url = format!("{}/v1/messages", self.config.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.anthropic_version)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        self.feed_headers(&response);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_ratelimit_reset(&response);
            #[cfg(feature = "tracing")]
            debug!(provider = %self.config.name, ?retry_after, "provider rate limited");
            return Err(GatewayError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope: CompletionResponse = response.json().await.map_err(|e| GatewayError::Upstream {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;

        Ok(envelope.first_text())
    }

    /// Sleeps before the call when the bucket's own snapshot shows
    /// capacity running low (spec §4.6): `max(1000/remainingPerSecond,
    /// 60000/remainingPerMinute)` ms.
    async fn adaptive_delay(&self) {
        let snapshot = self.bucket.snapshot();
        let remaining_per_second = snapshot.remaining_per_second();
        let remaining_per_minute = snapshot.remaining_per_minute();

        if remaining_per_second >= 2.0 && remaining_per_minute >= 10.0 {
            return;
        }

        let per_second_delay = 1000.0 / remaining_per_second.max(0.001);
        let per_minute_delay = 60_000.0 / remaining_per_minute.max(0.001);
        let delay_ms = per_second_delay.max(per_minute_delay);
        tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
    }

    /// Feeds the three spec §4.1/§6 rate-limit headers back into the
    /// shared bucket. All three must parse for the snapshot to update.
    fn feed_headers(&self, response: &reqwest::Response) {
        let remaining_requests = header_u64(response, "x-ratelimit-remaining-requests");
        let remaining_tokens = header_u64(response, "x-ratelimit-remaining-tokens");
        let reset_hint = parse_ratelimit_reset(response);

        if let (Some(requests), Some(tokens), Some(reset_hint)) =
            (remaining_requests, remaining_tokens, reset_hint)
        {
            self.bucket.update_from_headers(requests, tokens, reset_hint);
        }
    }
}

fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Parses the `x-ratelimit-reset` header, in seconds, as the server-supplied
/// reset hint (spec §4.1's header triple and §4.3's 429-with-reset override).
fn parse_ratelimit_reset(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .parse::<f64>()
        .ok()
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_tokenbucket::TokenBucket;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bucket() -> Arc<TokenBucket> {
        Arc::new(TokenBucket::builder().build())
    }

    #[tokio::test]
    async fn successful_call_extracts_first_text_fragment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-ratelimit-remaining-requests", "100")
                    .insert_header("x-ratelimit-remaining-tokens", "9000")
                    .insert_header("x-ratelimit-reset", "30")
                    .set_body_json(serde_json::json!({
                        "content": [{"type": "text", "text": "hello there"}]
                    })),
            )
            .mount(&server)
            .await;

        let bucket = bucket();
        let client = ProviderClient::builder(server.uri(), "test-key").build(Arc::clone(&bucket));
        let text = client.complete("claude-3", "hi", 256).await.unwrap();
        assert_eq!(text, "hello there");

        let snap = bucket.snapshot();
        assert_eq!(snap.remaining_requests, Some(100));
        assert_eq!(snap.remaining_tokens, Some(9000));
        assert_eq!(snap.reset_hint, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn rate_limited_response_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("x-ratelimit-reset", "2"))
            .mount(&server)
            .await;

        let client = ProviderClient::builder(server.uri(), "test-key").build(bucket());
        let err = client.complete("claude-3", "hi", 256).await.unwrap_err();
        match err {
            GatewayError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminal_status_becomes_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let client = ProviderClient::builder(server.uri(), "test-key").build(bucket());
        let err = client.complete("claude-3", "hi", 256).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Upstream { status: Some(400), .. }
        ));
    }

    #[tokio::test]
    async fn empty_content_returns_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"content": []})),
            )
            .mount(&server)
            .await;

        let client = ProviderClient::builder(server.uri(), "test-key").build(bucket());
        let text = client.complete("claude-3", "hi", 256).await.unwrap();
        assert_eq!(text, crate::wire::EMPTY_RESPONSE_SENTINEL);
    }
}
