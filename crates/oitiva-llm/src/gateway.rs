//! Provider gateway
//!
//! One entry point for every provider: pick the adapter, send the request,
//! retry transient failures with exponential backoff, and report usage.

use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::message::Message;
use crate::provider::{error_message, Adapter, CallOptions, Completion, ProviderAdapter, ProviderId};
use crate::retry::RetryPolicy;
use crate::settings::ProviderSettings;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::usage::UsageSink;

/// Gateway over the configured providers
pub struct Gateway<T = ReqwestTransport> {
    transport: T,
    settings: ProviderSettings,
    policy: RetryPolicy,
}

impl Gateway<ReqwestTransport> {
    /// Create a gateway with a `reqwest` transport honouring the settings' timeout
    pub fn new(settings: ProviderSettings) -> Result<Self, LlmError> {
        let transport = ReqwestTransport::new(settings.timeout())?;
        Ok(Self::with_transport(settings, transport))
    }
}

impl<T: HttpTransport> Gateway<T> {
    pub fn with_transport(settings: ProviderSettings, transport: T) -> Self {
        Self {
            transport,
            settings,
            policy: RetryPolicy::DEFAULT,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Provider that [`Gateway::call_ai`] dispatches to
    pub fn active_provider(&self) -> ProviderId {
        self.settings.active()
    }

    /// Model selected for the active provider
    pub fn active_model(&self) -> &str {
        &self.settings.config(self.active_provider()).model
    }

    /// Call the configured provider.
    ///
    /// An unrecognised provider id falls back to [`ProviderId::DEFAULT`].
    pub async fn call_ai<U>(
        &self,
        messages: &[Message],
        options: &CallOptions,
        usage: &mut U,
    ) -> Result<String, LlmError>
    where
        U: UsageSink + ?Sized,
    {
        self.invoke(messages, options, self.active_provider(), usage).await
    }

    /// Call one provider and return the generated text, trimmed.
    ///
    /// The usage of the successful attempt is added to `usage`.
    pub async fn invoke<U>(
        &self,
        messages: &[Message],
        options: &CallOptions,
        provider: ProviderId,
        usage: &mut U,
    ) -> Result<String, LlmError>
    where
        U: UsageSink + ?Sized,
    {
        let adapter = Adapter::new(provider, self.settings.config(provider))?;
        let completion = self.send_with_retry(&adapter, messages, options).await?;

        info!(
            provider = %provider,
            model = %options.model,
            input_tokens = completion.usage.input,
            output_tokens = completion.usage.output,
            "Completion received"
        );
        usage.record(completion.usage);
        Ok(completion.text)
    }

    async fn send_with_retry<A>(
        &self,
        adapter: &A,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<Completion, LlmError>
    where
        A: ProviderAdapter + Sync,
    {
        let provider = adapter.id();
        let mut last_error = LlmError::ConfigError("retry policy allows no attempts".to_string());

        for attempt in 0..self.policy.max_attempts {
            let request = adapter.build_request(messages, options)?;
            debug!(provider = %provider, attempt = attempt + 1, url = %request.url, "Sending request");

            match self.transport.post_json(request).await {
                Ok(response) if response.is_success() => {
                    if attempt > 0 {
                        debug!(provider = %provider, attempt = attempt + 1, "Request succeeded after retry");
                    }
                    return adapter.parse_response(&response.body);
                }
                Ok(response) => {
                    let status = response.status;
                    let message = error_message(&response.body);

                    if !adapter.is_retryable_status(status) {
                        warn!(provider = %provider, status, "Non-retryable provider error: {}", message);
                        return Err(LlmError::Provider { provider, status, message });
                    }
                    if !self.policy.has_attempts_after(attempt) {
                        warn!(provider = %provider, status, attempts = attempt + 1, "Max attempts exceeded");
                        return Err(LlmError::ExhaustedRetries {
                            provider,
                            attempts: attempt + 1,
                            status,
                            message,
                        });
                    }

                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        provider = %provider,
                        status,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable status, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if !error.is_transient() {
                        warn!(provider = %provider, error = %error, "Non-transient transport error");
                        return Err(error);
                    }
                    if !self.policy.has_attempts_after(attempt) {
                        warn!(provider = %provider, attempts = attempt + 1, error = %error, "Max attempts exceeded");
                        return Err(error);
                    }

                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        provider = %provider,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Request failed, retrying after backoff"
                    );
                    last_error = error;
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::usage::TokenUsage;
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    const CLAUDE_OK: &str =
        r#"{"content":[{"type":"text","text":" resposta "}],"usage":{"input_tokens":10,"output_tokens":5}}"#;

    fn settings() -> ProviderSettings {
        ProviderSettings::default().with_keys_from(|_| Some("test-key".to_string()))
    }

    fn gateway(transport: ScriptedTransport) -> Gateway<ScriptedTransport> {
        Gateway::with_transport(settings(), transport)
    }

    fn options() -> CallOptions {
        CallOptions::new("claude-sonnet-4-20250514", 1024)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_rate_limit_then_succeeds() {
        let gateway = gateway(
            ScriptedTransport::new()
                .respond(429, r#"{"error":{"message":"slow down"}}"#)
                .respond(429, r#"{"error":{"message":"slow down"}}"#)
                .respond(200, CLAUDE_OK),
        );
        let mut usage = TokenUsage::default();
        let started = Instant::now();

        let text = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut usage)
            .await
            .unwrap();

        assert_eq!(text, "resposta");
        assert_eq!(gateway.transport().request_count(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3000 + 6000));
        assert_eq!(usage, TokenUsage { input: 10, output: 5, ..Default::default() });
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let gateway = gateway(
            ScriptedTransport::new()
                .respond(503, "unavailable")
                .respond(503, "unavailable")
                .respond(503, "unavailable")
                .respond(200, CLAUDE_OK),
        );
        let mut usage = TokenUsage::default();

        let err = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut usage)
            .await
            .unwrap_err();

        match err {
            LlmError::ExhaustedRetries { provider, attempts, status, message } => {
                assert_eq!(provider, ProviderId::Claude);
                assert_eq!(attempts, 3);
                assert_eq!(status, 503);
                assert_eq!(message, "unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gateway.transport().request_count(), 3);
        assert!(usage.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_status_fails_immediately() {
        let gateway = gateway(
            ScriptedTransport::new()
                .respond(400, r#"{"error":{"message":"bad max_tokens"}}"#)
                .respond(200, CLAUDE_OK),
        );
        let started = Instant::now();

        let err = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LlmError::Provider { status: 400, ref message, .. } if message == "bad max_tokens"
        ));
        assert_eq!(gateway.transport().request_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_are_retried() {
        let gateway = gateway(
            ScriptedTransport::new()
                .fail(LlmError::Timeout)
                .respond(200, CLAUDE_OK),
        );
        let started = Instant::now();

        let text = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut ())
            .await
            .unwrap();

        assert_eq!(text, "resposta");
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_network_error_is_rethrown() {
        let gateway = gateway(
            ScriptedTransport::new()
                .fail(LlmError::Timeout)
                .fail(LlmError::Timeout)
                .fail(LlmError::Network("connection reset".to_string())),
        );

        let err = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Network(ref m) if m == "connection reset"));
        assert_eq!(gateway.transport().request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_body_is_not_retried() {
        let gateway = gateway(
            ScriptedTransport::new()
                .fail(LlmError::InvalidResponse("error decoding response body".to_string()))
                .respond(200, CLAUDE_OK),
        );
        let started = Instant::now();

        let err = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::InvalidResponse(_)));
        assert_eq!(gateway.transport().request_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_success_body_not_retried() {
        let gateway = gateway(ScriptedTransport::new().respond(200, "<html>").respond(200, CLAUDE_OK));

        let err = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::InvalidResponse(_)));
        assert_eq!(gateway.transport().request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_sends_nothing() {
        let gateway = Gateway::with_transport(ProviderSettings::default(), ScriptedTransport::new());

        let err = gateway
            .invoke(&[Message::user("oi")], &options(), ProviderId::OpenAi, &mut ())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::ApiKeyMissing(ProviderId::OpenAi)));
        assert_eq!(gateway.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn test_call_ai_dispatches_active_provider() {
        let mut settings = settings();
        settings.provider = "grok".to_string();
        let body = json!({ "choices": [{ "message": { "content": "ok" } }] }).to_string();
        let gateway = Gateway::with_transport(settings, ScriptedTransport::new().respond(200, body));

        let text = gateway
            .call_ai(&[Message::user("oi")], &CallOptions::new("grok-4", 100), &mut ())
            .await
            .unwrap();

        assert_eq!(text, "ok");
        assert_eq!(gateway.transport().requests()[0].url, "https://api.x.ai/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_call_ai_unknown_provider_falls_back() {
        let mut settings = settings();
        settings.provider = "watson".to_string();
        settings.claude.api_key = Some(SecretString::new("claude-key".to_string()));
        let gateway = Gateway::with_transport(settings, ScriptedTransport::new().respond(200, CLAUDE_OK));

        assert_eq!(gateway.active_provider(), ProviderId::Claude);
        gateway
            .call_ai(&[Message::user("oi")], &options(), &mut ())
            .await
            .unwrap();

        let request = &gateway.transport().requests()[0];
        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(request.header_value("x-api-key"), Some("claude-key"));
    }

    #[tokio::test]
    async fn test_usage_accumulates_across_calls() {
        let gateway = gateway(ScriptedTransport::new().respond(200, CLAUDE_OK).respond(200, CLAUDE_OK));
        let mut usage = TokenUsage::default();

        for _ in 0..2 {
            gateway
                .invoke(&[Message::user("oi")], &options(), ProviderId::Claude, &mut usage)
                .await
                .unwrap();
        }

        assert_eq!(usage.input, 20);
        assert_eq!(usage.output, 10);
    }
}
