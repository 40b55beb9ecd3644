//! Static model registry

use std::sync::LazyLock;

use serde::Serialize;

use crate::provider::ProviderId;

/// Output ceiling applied to models missing from the registry
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Model information
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Model identifier as sent to the API
    pub id: &'static str,
    pub provider: ProviderId,
    /// Largest `max_tokens` the API accepts for this model
    pub max_output_tokens: u32,
    /// Accepts a reasoning-effort parameter
    pub reasoning: bool,
}

const fn model(
    id: &'static str,
    provider: ProviderId,
    max_output_tokens: u32,
    reasoning: bool,
) -> ModelInfo {
    ModelInfo { id, provider, max_output_tokens, reasoning }
}

/// Known models
pub static MODELS: LazyLock<Vec<ModelInfo>> = LazyLock::new(|| {
    use ProviderId::*;
    vec![
        model("claude-opus-4-1-20250805", Claude, 32_000, true),
        model("claude-opus-4-20250514", Claude, 32_000, true),
        model("claude-sonnet-4-5-20250929", Claude, 64_000, true),
        model("claude-sonnet-4-20250514", Claude, 64_000, true),
        model("claude-3-7-sonnet-20250219", Claude, 64_000, true),
        model("claude-haiku-4-5-20251001", Claude, 64_000, true),
        model("claude-3-5-haiku-20241022", Claude, 8_192, false),
        model("gemini-2.5-pro", Gemini, 65_536, true),
        model("gemini-2.5-flash", Gemini, 65_536, true),
        model("gemini-2.0-flash", Gemini, 8_192, false),
        model("gpt-4.1", OpenAi, 32_768, false),
        model("gpt-4.1-mini", OpenAi, 32_768, false),
        model("gpt-4o", OpenAi, 16_384, false),
        model("o3", OpenAi, 100_000, true),
        model("o4-mini", OpenAi, 100_000, true),
        model("gpt-5", OpenAi, 128_000, true),
        model("gpt-5-mini", OpenAi, 128_000, true),
        model("grok-4", Grok, 32_768, true),
        model("grok-3", Grok, 16_384, false),
        model("grok-3-mini", Grok, 16_384, true),
    ]
});

/// Get model info by ID
pub fn get_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// Get all models served by a provider
pub fn get_models_by_provider(provider: ProviderId) -> Vec<&'static ModelInfo> {
    MODELS.iter().filter(|m| m.provider == provider).collect()
}

/// Output ceiling for a model, or [`DEFAULT_MAX_OUTPUT_TOKENS`] if unknown
pub fn max_output_tokens(id: &str) -> u32 {
    get_model(id).map_or(DEFAULT_MAX_OUTPUT_TOKENS, |m| m.max_output_tokens)
}

/// Whether an OpenAI-style model takes `reasoning_effort`.
///
/// Unlisted ids are matched by family prefix so dated snapshots qualify.
pub fn is_reasoning_model(id: &str) -> bool {
    if let Some(info) = get_model(id) {
        return info.reasoning;
    }
    ["o1", "o3", "o4", "gpt-5"].iter().any(|prefix| id.starts_with(prefix))
}
