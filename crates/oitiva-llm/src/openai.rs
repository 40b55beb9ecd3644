//! OpenAI Chat Completions adapter

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;
use crate::message::{Message, Role};
use crate::models;
use crate::provider::{level_for_budget, CallOptions, Completion, ProviderAdapter, ProviderId};
use crate::settings::{ProviderConfig, Thinking};
use crate::transport::HttpRequest;
use crate::usage::TokenUsage;

/// OpenAI API adapter
pub struct OpenAiAdapter {
    api_key: SecretString,
    base_url: String,
    thinking: Option<Thinking>,
}

impl OpenAiAdapter {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(LlmError::ApiKeyMissing(ProviderId::OpenAi))?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            thinking: config.thinking,
        })
    }

    fn reasoning_effort(&self, options: &CallOptions) -> Option<&'static str> {
        if options.disable_thinking || !models::is_reasoning_model(&options.model) {
            return None;
        }
        let level = match self.thinking? {
            Thinking::Level(level) => level,
            Thinking::Budget(tokens) => level_for_budget(tokens),
        };
        Some(level.as_str())
    }
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("base_url", &self.base_url)
            .field("thinking", &self.thinking)
            .finish_non_exhaustive()
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<HttpRequest, LlmError> {
        let mut chat = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &options.system_prompt {
            chat.push(ChatMessage { role: Role::System.as_str(), content: Value::from(system.as_str()) });
        }
        for message in messages {
            let content = serde_json::to_value(&message.content)
                .map_err(|e| LlmError::ConfigError(e.to_string()))?;
            chat.push(ChatMessage { role: message.role.as_str(), content });
        }

        let request = OpenAiRequest {
            model: &options.model,
            messages: chat,
            max_completion_tokens: options.max_tokens,
            reasoning_effort: self.reasoning_effort(options),
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
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'static str>,
}

/// Chat-completions message; content is a string or a part list
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Value,
}

/// Parse a chat-completions body, shared with other compatible APIs
pub(crate) fn parse_chat_completion(body: &str) -> Result<Completion, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    let text = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| LlmError::InvalidResponse("Empty response".to_string()))?;

    let usage = response.usage.unwrap_or_default();
    Ok(Completion {
        text: text.to_string(),
        usage: TokenUsage {
            input: usage.prompt_tokens,
            output: usage.completion_tokens,
            cache_read: usage.prompt_tokens_details.map_or(0, |d| d.cached_tokens),
            cache_creation: 0,
        },
    })
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PromptTokensDetails {
    cached_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ContentBlock;
    use crate::settings::ThinkingLevel;
    use serde_json::json;

    fn adapter(thinking: Option<Thinking>) -> OpenAiAdapter {
        OpenAiAdapter::new(&ProviderConfig {
            api_key: Some(SecretString::new("sk-openai".to_string())),
            model: "gpt-4.1".to_string(),
            thinking,
            base_url: "https://api.openai.com".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_system_prompt_leads() {
        let options = CallOptions::new("gpt-4.1", 2000).with_system_prompt("sys");
        let request = adapter(Some(Thinking::Level(ThinkingLevel::High)))
            .build_request(&[Message::user("hi")], &options)
            .unwrap();

        assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(request.header_value("Authorization"), Some("Bearer sk-openai"));
        assert_eq!(
            request.body,
            json!({
                "model": "gpt-4.1",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "hi" }
                ],
                "max_completion_tokens": 2000
            })
        );
    }

    #[test]
    fn test_reasoning_effort_only_for_reasoning_models() {
        let options = CallOptions::new("o4-mini", 2000);
        let request = adapter(Some(Thinking::Level(ThinkingLevel::High)))
            .build_request(&[Message::user("hi")], &options)
            .unwrap();
        assert_eq!(request.body["reasoning_effort"], "high");

        let request = adapter(Some(Thinking::Budget(5000)))
            .build_request(&[Message::user("hi")], &options)
            .unwrap();
        assert_eq!(request.body["reasoning_effort"], "low");

        let request = adapter(Some(Thinking::Level(ThinkingLevel::High)))
            .build_request(&[Message::user("hi")], &options.without_thinking())
            .unwrap();
        assert!(request.body.get("reasoning_effort").is_none());
    }

    #[test]
    fn test_block_content_kept_structured() {
        let message = Message::user(vec![ContentBlock::text("a"), ContentBlock::text("b")]);
        let request = adapter(None)
            .build_request(&[message], &CallOptions::new("gpt-4.1", 10))
            .unwrap();
        assert_eq!(
            request.body["messages"][0]["content"],
            json!([{ "type": "text", "text": "a" }, { "type": "text", "text": "b" }])
        );
    }

    #[test]
    fn test_parse_usage() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": " ok " } }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 3,
                "prompt_tokens_details": { "cached_tokens": 4 }
            }
        });
        let completion = parse_chat_completion(&body.to_string()).unwrap();
        assert_eq!(completion.text, "ok");
        assert_eq!(
            completion.usage,
            TokenUsage { input: 10, output: 3, cache_read: 4, cache_creation: 0 }
        );
    }

    #[test]
    fn test_parse_null_content() {
        let body = json!({ "choices": [{ "message": { "content": null } }] });
        assert!(matches!(
            parse_chat_completion(&body.to_string()),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
