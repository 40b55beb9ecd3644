//! Provider identifiers, call options and the adapter seam

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::claude::ClaudeAdapter;
use crate::error::LlmError;
use crate::gemini::GeminiAdapter;
use crate::grok::GrokAdapter;
use crate::message::Message;
use crate::openai::OpenAiAdapter;
use crate::settings::{ProviderConfig, ThinkingLevel};
use crate::transport::HttpRequest;
use crate::usage::TokenUsage;

/// Statuses every provider treats as transient
pub const DEFAULT_RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Supported provider APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    Grok,
}

impl ProviderId {
    /// Provider used when the configured id is not recognised
    pub const DEFAULT: ProviderId = ProviderId::Claude;

    pub const ALL: [ProviderId; 4] =
        [ProviderId::Claude, ProviderId::Gemini, ProviderId::OpenAi, ProviderId::Grok];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Claude => "claude",
            ProviderId::Gemini => "gemini",
            ProviderId::OpenAi => "openai",
            ProviderId::Grok => "grok",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            ProviderId::Claude => "Claude",
            ProviderId::Gemini => "Gemini",
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Grok => "Grok",
        }
    }

    /// Resolve a configured id, falling back to [`ProviderId::DEFAULT`].
    ///
    /// Stale or misspelled configuration must not stop an analysis, so the
    /// fallback is logged rather than returned as an error.
    pub fn resolve(id: &str) -> ProviderId {
        id.parse().unwrap_or_else(|_| {
            warn!(
                configured = id,
                fallback = %ProviderId::DEFAULT,
                "Unknown provider id, falling back to default provider"
            );
            ProviderId::DEFAULT
        })
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderId {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderId::Claude),
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "openai" | "gpt" | "chatgpt" => Ok(ProviderId::OpenAi),
            "grok" | "xai" => Ok(ProviderId::Grok),
            other => Err(LlmError::ConfigError(format!("unknown provider: {other}"))),
        }
    }
}

/// Per-call options. Built fresh for every call; the gateway keeps none of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    pub model: String,
    /// Suppress extended reasoning even when the provider settings enable it
    pub disable_thinking: bool,
}

impl CallOptions {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            max_tokens,
            system_prompt: None,
            model: model.into(),
            disable_thinking: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn without_thinking(mut self) -> Self {
        self.disable_thinking = true;
        self
    }
}

/// Text and usage extracted from a provider response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Provider-specific request/response shaping.
///
/// The retry loop in [`crate::Gateway`] is shared; adapters only describe
/// the wire format.
pub trait ProviderAdapter {
    fn id(&self) -> ProviderId;

    /// Build the HTTP request for one attempt
    fn build_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<HttpRequest, LlmError>;

    /// Extract the generated text and usage from a 2xx body
    fn parse_response(&self, body: &str) -> Result<Completion, LlmError>;

    fn is_retryable_status(&self, status: u16) -> bool {
        DEFAULT_RETRYABLE_STATUSES.contains(&status)
    }
}

/// The closed set of provider adapters
#[derive(Debug)]
pub enum Adapter {
    Claude(ClaudeAdapter),
    Gemini(GeminiAdapter),
    OpenAi(OpenAiAdapter),
    Grok(GrokAdapter),
}

impl Adapter {
    /// Build the adapter for `id` from its configuration
    pub fn new(id: ProviderId, config: &ProviderConfig) -> Result<Self, LlmError> {
        Ok(match id {
            ProviderId::Claude => Adapter::Claude(ClaudeAdapter::new(config)?),
            ProviderId::Gemini => Adapter::Gemini(GeminiAdapter::new(config)?),
            ProviderId::OpenAi => Adapter::OpenAi(OpenAiAdapter::new(config)?),
            ProviderId::Grok => Adapter::Grok(GrokAdapter::new(config)?),
        })
    }

    fn inner(&self) -> &dyn ProviderAdapter {
        match self {
            Adapter::Claude(a) => a,
            Adapter::Gemini(a) => a,
            Adapter::OpenAi(a) => a,
            Adapter::Grok(a) => a,
        }
    }
}

impl ProviderAdapter for Adapter {
    fn id(&self) -> ProviderId {
        self.inner().id()
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &CallOptions,
    ) -> Result<HttpRequest, LlmError> {
        self.inner().build_request(messages, options)
    }

    fn parse_response(&self, body: &str) -> Result<Completion, LlmError> {
        self.inner().parse_response(body)
    }

    fn is_retryable_status(&self, status: u16) -> bool {
        self.inner().is_retryable_status(status)
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// All four APIs nest it under `error.message`; fall back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map a token budget onto the nearest named level
pub(crate) fn level_for_budget(budget: u32) -> ThinkingLevel {
    match budget {
        0..=2047 => ThinkingLevel::Minimal,
        2048..=8191 => ThinkingLevel::Low,
        8192..=16383 => ThinkingLevel::Medium,
        _ => ThinkingLevel::High,
    }
}
