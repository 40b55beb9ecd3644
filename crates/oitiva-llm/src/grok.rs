//! Grok (xAI) chat adapter
//!
//! Same envelope as OpenAI, but content must be plain text.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::LlmError;
use crate::message::{Message, Role};
use crate::openai::parse_chat_completion;
use crate::provider::{CallOptions, Completion, ProviderAdapter, ProviderId};
use crate::settings::ProviderConfig;
use crate::transport::HttpRequest;

/// Grok API adapter
pub struct GrokAdapter {
    api_key: SecretString,
    base_url: String,
}

impl GrokAdapter {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(LlmError::ApiKeyMissing(ProviderId::Grok))?;
        Ok(Self { api_key, base_url: config.base_url.clone() })
    }
}

impl std::fmt::Debug for GrokAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrokAdapter")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ProviderAdapter for GrokAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Grok
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<HttpRequest, LlmError> {
        let mut chat = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &options.system_prompt {
            chat.push(GrokMessage { role: Role::System.as_str(), content: system.clone() });
        }
        chat.extend(messages.iter().map(|message| GrokMessage {
            role: message.role.as_str(),
            content: message.content.flatten(),
        }));

        let request = GrokRequest {
            model: &options.model,
            messages: chat,
            max_tokens: options.max_tokens,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(HttpRequest::new(format!("{}/v1/chat/completions", self.base_url), body)
            .header("authorization", format!("Bearer {}", self.api_key.expose_secret())))
    }

    fn parse_response(&self, body: &str) -> Result<Completion, LlmError> {
        parse_chat_completion(body)
    }
}

#[derive(Serialize)]
struct GrokRequest<'a> {
    model: &'a str,
    messages: Vec<GrokMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GrokMessage<'a> {
    role: &'a str,
    content: String,
}
