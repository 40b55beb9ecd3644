//! Gemini generateContent adapter

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::message::{ContentBlock, Message, Role};
use crate::models;
use crate::provider::{CallOptions, Completion, ProviderAdapter, ProviderId};
use crate::settings::{ProviderConfig, Thinking, ThinkingLevel};
use crate::transport::HttpRequest;
use crate::usage::TokenUsage;

/// Gemini API adapter
pub struct GeminiAdapter {
    api_key: SecretString,
    base_url: String,
    thinking: Option<Thinking>,
}

impl GeminiAdapter {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(LlmError::ApiKeyMissing(ProviderId::Gemini))?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            thinking: config.thinking,
        })
    }

    /// Reasoning tokens come out of `maxOutputTokens`, so the ceiling is
    /// raised by this much to leave room for the answer.
    fn thinking_buffer(&self, options: &CallOptions) -> Option<u32> {
        if options.disable_thinking {
            return None;
        }
        match self.thinking? {
            Thinking::Budget(tokens) => Some(tokens),
            Thinking::Level(level) => Some(buffer_for_level(level)),
        }
    }
}

impl std::fmt::Debug for GeminiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAdapter")
            .field("base_url", &self.base_url)
            .field("thinking", &self.thinking)
            .finish_non_exhaustive()
    }
}

/// Output-token buffer added per reasoning level
pub fn buffer_for_level(level: ThinkingLevel) -> u32 {
    match level {
        ThinkingLevel::Minimal => 1024,
        ThinkingLevel::Low => 4096,
        ThinkingLevel::Medium => 8192,
        ThinkingLevel::High => 16_384,
    }
}

fn parts(message: &Message) -> Vec<Value> {
    message
        .content
        .blocks()
        .iter()
        .map(|block| match block {
            ContentBlock::Text(text) => json!({ "text": text }),
            other => json!({ "text": other.flatten() }),
        })
        .collect()
}

impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<HttpRequest, LlmError> {
        let mut system: Vec<Value> = options
            .system_prompt
            .iter()
            .map(|prompt| json!({ "text": prompt }))
            .collect();
        let mut contents = Vec::with_capacity(messages.len());
        for message in messages {
            let role = match message.role {
                Role::System => {
                    system.extend(parts(message));
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "model",
            };
            contents.push(json!({ "role": role, "parts": parts(message) }));
        }

        let mut generation_config = json!({ "maxOutputTokens": options.max_tokens });
        if let Some(buffer) = self.thinking_buffer(options) {
            let inflated = options.max_tokens.saturating_add(buffer);
            let ceiling = models::get_model(&options.model)
                .map_or(u32::MAX, |m| m.max_output_tokens);
            generation_config["maxOutputTokens"] = json!(inflated.min(ceiling));
            generation_config["thinkingConfig"] = json!({ "thinkingBudget": buffer });
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": system });
        }

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, options.model);
        Ok(HttpRequest::new(url, body)
            .header("x-goog-api-key", self.api_key.expose_secret().as_str()))
    }

    fn parse_response(&self, body: &str) -> Result<Completion, LlmError> {
        let response: GeminiResponse = serde_json::from_str(body)
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let Some(candidate) = response.candidates.first() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(LlmError::InvalidResponse(format!("Empty response: {reason}")));
        };

        let text = candidate
            .content
            .as_ref()
            .into_iter()
            .flat_map(|content| &content.parts)
            .filter(|part| !part.thought)
            .find_map(|part| part.text.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("Empty response".to_string()))?;

        let usage = response.usage_metadata.unwrap_or_default();
        Ok(Completion {
            text: text.to_string(),
            usage: TokenUsage {
                input: usage.prompt_token_count,
                output: usage.candidates_token_count + usage.thoughts_token_count,
                cache_read: usage.cached_content_token_count,
                cache_creation: 0,
            },
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GeminiUsage {
    prompt_token_count: u64,
    candidates_token_count: u64,
    thoughts_token_count: u64,
    cached_content_token_count: u64,
}
