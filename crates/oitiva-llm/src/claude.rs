//! Claude Messages API adapter

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::message::{Message, MessageContent, Role};
use crate::models;
use crate::provider::{CallOptions, Completion, ProviderAdapter, ProviderId};
use crate::settings::{ProviderConfig, Thinking, ThinkingLevel};
use crate::transport::HttpRequest;
use crate::usage::TokenUsage;

const API_VERSION: &str = "2023-06-01";

/// Output tokens reserved for the answer on top of the thinking budget
pub const THINKING_OVERHEAD_TOKENS: u32 = 4096;

/// Smallest budget the API accepts
const MIN_THINKING_BUDGET: u32 = 1024;

/// Claude API adapter
pub struct ClaudeAdapter {
    api_key: SecretString,
    base_url: String,
    thinking: Option<Thinking>,
}

impl ClaudeAdapter {
    /// Create adapter from provider settings
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(LlmError::ApiKeyMissing(ProviderId::Claude))?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            thinking: config.thinking,
        })
    }

    /// Thinking budget in tokens, if reasoning applies to this call
    fn thinking_budget(&self, options: &CallOptions) -> Option<u32> {
        if options.disable_thinking {
            return None;
        }
        let budget = match self.thinking? {
            Thinking::Budget(0) => return None,
            Thinking::Budget(tokens) => tokens,
            Thinking::Level(level) => budget_for_level(level),
        };
        Some(budget.max(MIN_THINKING_BUDGET))
    }
}

impl std::fmt::Debug for ClaudeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAdapter")
            .field("base_url", &self.base_url)
            .field("thinking", &self.thinking)
            .finish_non_exhaustive()
    }
}

/// Token budget for a named level
pub fn budget_for_level(level: ThinkingLevel) -> u32 {
    match level {
        ThinkingLevel::Minimal => 1024,
        ThinkingLevel::Low => 4096,
        ThinkingLevel::Medium => 10_000,
        ThinkingLevel::High => 24_000,
    }
}

impl ProviderAdapter for ClaudeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<HttpRequest, LlmError> {
        // System turns are not allowed in `messages`; merge them into `system`.
        let mut system: Vec<String> = options.system_prompt.iter().cloned().collect();
        let mut turns = Vec::with_capacity(messages.len());
        for message in messages {
            match message.role {
                Role::System => system.push(message.content.flatten()),
                role => turns.push(ClaudeMessage {
                    role: role.as_str(),
                    content: &message.content,
                }),
            }
        }

        // The budget and its overhead must fit under a known model's ceiling
        let ceiling = models::get_model(&options.model).map(|m| m.max_output_tokens);
        let thinking = self.thinking_budget(options).map(|budget| ClaudeThinking {
            kind: "enabled",
            budget_tokens: match ceiling {
                Some(ceiling) => budget
                    .min(ceiling.saturating_sub(THINKING_OVERHEAD_TOKENS))
                    .max(MIN_THINKING_BUDGET),
                None => budget,
            },
        });
        let max_tokens = match &thinking {
            Some(t) => options
                .max_tokens
                .max(t.budget_tokens.saturating_add(THINKING_OVERHEAD_TOKENS)),
            None => options.max_tokens,
        };

        let request = ClaudeRequest {
            model: &options.model,
            max_tokens,
            messages: turns,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            thinking,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        Ok(HttpRequest::new(format!("{}/v1/messages", self.base_url), body)
            .header("x-api-key", self.api_key.expose_secret().as_str())
            .header("anthropic-version", API_VERSION))
    }

    fn parse_response(&self, body: &str) -> Result<Completion, LlmError> {
        let response: ClaudeResponse = serde_json::from_str(body)
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        // Thinking blocks precede the answer; take the first text block.
        let text = response
            .content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("Empty response".to_string()))?;

        let usage = response.usage.unwrap_or_default();
        Ok(Completion {
            text: text.to_string(),
            usage: TokenUsage {
                input: usage.input_tokens,
                output: usage.output_tokens,
                cache_read: usage.cache_read_input_tokens.unwrap_or(0),
                cache_creation: usage.cache_creation_input_tokens.unwrap_or(0),
            },
        })
    }

    fn is_retryable_status(&self, status: u16) -> bool {
        // 529: overloaded
        matches!(status, 429 | 500 | 502 | 503 | 504 | 529)
    }
}

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ClaudeMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ClaudeThinking>,
}

#[derive(Serialize)]
struct ClaudeMessage<'a> {
    role: &'a str,
    content: &'a MessageContent,
}

#[derive(Serialize)]
struct ClaudeThinking {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
    usage: Option<ClaudeUsage>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type", default)]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    cache_read_input_tokens: Option<u64>,
    cache_creation_input_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ContentBlock;
    use crate::settings::ProviderSettings;
    use serde_json::json;

    fn adapter(thinking: Option<Thinking>) -> ClaudeAdapter {
        let config = ProviderConfig {
            api_key: Some(SecretString::new("sk-test".to_string())),
            model: "claude-sonnet-4-20250514".to_string(),
            thinking,
            base_url: "https://api.anthropic.com".to_string(),
        };
        ClaudeAdapter::new(&config).unwrap()
    }

    fn options() -> CallOptions {
        CallOptions::new("claude-sonnet-4-20250514", 8000).with_system_prompt("Be precise.")
    }

    #[test]
    fn test_missing_key() {
        let err = ClaudeAdapter::new(&ProviderConfig::default()).unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyMissing(ProviderId::Claude)));
    }

    #[test]
    fn test_request_shape() {
        let request = adapter(None)
            .build_request(&[Message::user("Olá")], &options())
            .unwrap();

        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(request.header_value("x-api-key"), Some("sk-test"));
        assert_eq!(request.header_value("anthropic-version"), Some(API_VERSION));
        assert_eq!(
            request.body,
            json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 8000,
                "messages": [{ "role": "user", "content": "Olá" }],
                "system": "Be precise."
            })
        );
    }

    #[test]
    fn test_blocks_pass_through() {
        let message = Message::user(vec![
            ContentBlock::text("a"),
            ContentBlock::Opaque(json!({ "type": "document", "source": { "type": "text" } })),
        ]);
        let request = adapter(None).build_request(&[message], &options()).unwrap();
        assert_eq!(request.body["messages"][0]["content"][0], json!({ "type": "text", "text": "a" }));
        assert_eq!(request.body["messages"][0]["content"][1]["type"], "document");
    }

    #[test]
    fn test_thinking_raises_max_tokens() {
        let request = adapter(Some(Thinking::Budget(10_000)))
            .build_request(&[Message::user("x")], &options())
            .unwrap();
        assert_eq!(
            request.body["thinking"],
            json!({ "type": "enabled", "budget_tokens": 10_000 })
        );
        assert_eq!(request.body["max_tokens"], 10_000 + THINKING_OVERHEAD_TOKENS);
    }

    #[test]
    fn test_thinking_keeps_larger_request() {
        let options = CallOptions::new("claude-sonnet-4-20250514", 64_000);
        let request = adapter(Some(Thinking::Level(ThinkingLevel::Low)))
            .build_request(&[Message::user("x")], &options)
            .unwrap();
        assert_eq!(request.body["thinking"]["budget_tokens"], 4096);
        assert_eq!(request.body["max_tokens"], 64_000);
    }

    #[test]
    fn test_huge_budget_is_clamped_to_model_ceiling() {
        let settings = ProviderSettings::from_toml_str(
            "[claude]\napi_key = \"k\"\nthinking = 4294967000",
        )
        .unwrap();
        let adapter = ClaudeAdapter::new(&settings.claude).unwrap();

        let request = adapter.build_request(&[Message::user("x")], &options()).unwrap();
        assert_eq!(request.body["thinking"]["budget_tokens"], 64_000 - THINKING_OVERHEAD_TOKENS);
        assert_eq!(request.body["max_tokens"], 64_000);

        let unknown = CallOptions::new("claude-next", 8000);
        let request = adapter.build_request(&[Message::user("x")], &unknown).unwrap();
        assert_eq!(request.body["thinking"]["budget_tokens"], 4_294_967_000u32);
        assert_eq!(request.body["max_tokens"], u32::MAX);
    }

    #[test]
    fn test_disable_thinking() {
        let request = adapter(Some(Thinking::Budget(10_000)))
            .build_request(&[Message::user("x")], &options().without_thinking())
            .unwrap();
        assert!(request.body.get("thinking").is_none());
        assert_eq!(request.body["max_tokens"], 8000);
    }

    #[test]
    fn test_parse_skips_thinking_blocks() {
        let body = json!({
            "content": [
                { "type": "thinking", "thinking": "hmm", "signature": "x" },
                { "type": "text", "text": "  {\"ok\":true}\n" }
            ],
            "usage": {
                "input_tokens": 120,
                "output_tokens": 40,
                "cache_read_input_tokens": 7
            }
        });
        let completion = adapter(None).parse_response(&body.to_string()).unwrap();
        assert_eq!(completion.text, "{\"ok\":true}");
        assert_eq!(
            completion.usage,
            TokenUsage { input: 120, output: 40, cache_read: 7, cache_creation: 0 }
        );
    }

    #[test]
    fn test_parse_without_usage() {
        let body = json!({ "content": [{ "type": "text", "text": "hi" }] });
        let completion = adapter(None).parse_response(&body.to_string()).unwrap();
        assert_eq!(completion.usage, TokenUsage::default());
    }

    #[test]
    fn test_parse_empty_content() {
        let err = adapter(None).parse_response(r#"{"content":[]}"#).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_retryable_statuses() {
        let claude = adapter(None);
        assert!(claude.is_retryable_status(529));
        assert!(claude.is_retryable_status(429));
        assert!(!claude.is_retryable_status(400));
        assert!(!claude.is_retryable_status(401));
    }
}
