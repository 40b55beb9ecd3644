//! Provider settings
//!
//! Long-lived, user-editable configuration injected into the gateway. Loaded
//! from TOML; API keys may instead come from the environment.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LlmError;
use crate::provider::{CallOptions, ProviderId};

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Named reasoning effort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl ThinkingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThinkingLevel::Minimal => "minimal",
            ThinkingLevel::Low => "low",
            ThinkingLevel::Medium => "medium",
            ThinkingLevel::High => "high",
        }
    }
}

/// Reasoning allowance: a named level or an explicit token budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Thinking {
    Budget(u32),
    Level(ThinkingLevel),
}

/// Settings for one provider
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<SecretString>,
    /// Selected model id; empty means the provider default
    pub model: String,
    pub thinking: Option<Thinking>,
    /// API root; empty means the public endpoint
    pub base_url: String,
}

impl ProviderConfig {
    /// Call options for this provider's selected model
    pub fn call_options(&self, max_tokens: u32) -> CallOptions {
        CallOptions::new(self.model.clone(), max_tokens)
    }

    fn fill_defaults(&mut self, id: ProviderId) {
        if self.model.trim().is_empty() {
            self.model = default_model(id).to_string();
        }
        if self.base_url.trim().is_empty() {
            self.base_url = default_base_url(id).to_string();
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
    }
}

/// Settings for every provider plus the active selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Configured provider id, resolved leniently at dispatch time
    pub provider: String,
    pub timeout_secs: u64,
    pub claude: ProviderConfig,
    pub gemini: ProviderConfig,
    pub openai: ProviderConfig,
    pub grok: ProviderConfig,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        let mut settings = Self {
            provider: ProviderId::DEFAULT.as_str().to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            claude: ProviderConfig::default(),
            gemini: ProviderConfig::default(),
            openai: ProviderConfig::default(),
            grok: ProviderConfig::default(),
        };
        settings.fill_defaults();
        settings
    }
}

impl ProviderSettings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, LlmError> {
        let mut settings: ProviderSettings =
            toml::from_str(text).map_err(|e| LlmError::ConfigError(e.to_string()))?;
        settings.fill_defaults();
        Ok(settings)
    }

    /// Load settings from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, LlmError> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        info!("Loading provider settings from {}", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Fill missing API keys from the process environment
    pub fn with_env_keys(self) -> Self {
        self.with_keys_from(|name| std::env::var(name).ok())
    }

    /// Fill missing API keys using `lookup` on each provider's variable name
    pub fn with_keys_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for id in ProviderId::ALL {
            let config = self.config_mut(id);
            if config.api_key.is_none() {
                config.api_key = lookup(api_key_var(id))
                    .filter(|key| !key.trim().is_empty())
                    .map(|key| SecretString::new(key.into()));
            }
        }
        self
    }

    /// The provider calls are dispatched to
    pub fn active(&self) -> ProviderId {
        ProviderId::resolve(&self.provider)
    }

    pub fn config(&self, id: ProviderId) -> &ProviderConfig {
        match id {
            ProviderId::Claude => &self.claude,
            ProviderId::Gemini => &self.gemini,
            ProviderId::OpenAi => &self.openai,
            ProviderId::Grok => &self.grok,
        }
    }

    pub fn config_mut(&mut self, id: ProviderId) -> &mut ProviderConfig {
        match id {
            ProviderId::Claude => &mut self.claude,
            ProviderId::Gemini => &mut self.gemini,
            ProviderId::OpenAi => &mut self.openai,
            ProviderId::Grok => &mut self.grok,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn fill_defaults(&mut self) {
        for id in ProviderId::ALL {
            self.config_mut(id).fill_defaults(id);
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
    }
}

/// Model used when none is selected
pub fn default_model(id: ProviderId) -> &'static str {
    match id {
        ProviderId::Claude => "claude-sonnet-4-20250514",
        ProviderId::Gemini => "gemini-2.5-pro",
        ProviderId::OpenAi => "gpt-4.1",
        ProviderId::Grok => "grok-4",
    }
}

/// Public API root
pub fn default_base_url(id: ProviderId) -> &'static str {
    match id {
        ProviderId::Claude => "https://api.anthropic.com",
        ProviderId::Gemini => "https://generativelanguage.googleapis.com",
        ProviderId::OpenAi => "https://api.openai.com",
        ProviderId::Grok => "https://api.x.ai",
    }
}

/// Environment variable holding the provider's API key
pub fn api_key_var(id: ProviderId) -> &'static str {
    match id {
        ProviderId::Claude => "ANTHROPIC_API_KEY",
        ProviderId::Gemini => "GEMINI_API_KEY",
        ProviderId::OpenAi => "OPENAI_API_KEY",
        ProviderId::Grok => "XAI_API_KEY",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = ProviderSettings::default();
        assert_eq!(settings.active(), ProviderId::Claude);
        assert_eq!(settings.claude.model, "claude-sonnet-4-20250514");
        assert_eq!(settings.grok.base_url, "https://api.x.ai");
        assert_eq!(settings.timeout(), Duration::from_secs(300));
        assert!(settings.openai.api_key.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let settings = ProviderSettings::from_toml_str(
            r#"
            provider = "gemini"

            [gemini]
            api_key = "g-key"
            thinking = "high"

            [claude]
            model = "claude-opus-4-20250514"
            thinking = 8000
            base_url = "http://localhost:9000/"
            "#,
        )
        .unwrap();

        assert_eq!(settings.active(), ProviderId::Gemini);
        assert_eq!(settings.gemini.model, "gemini-2.5-pro");
        assert_eq!(settings.gemini.thinking, Some(Thinking::Level(ThinkingLevel::High)));
        assert_eq!(
            settings.gemini.api_key.as_ref().map(|k| k.expose_secret().as_str()),
            Some("g-key")
        );
        assert_eq!(settings.claude.thinking, Some(Thinking::Budget(8000)));
        assert_eq!(settings.claude.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_invalid_toml() {
        let err = ProviderSettings::from_toml_str("provider = [").unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn test_keys_from_lookup_do_not_override_file() {
        let settings = ProviderSettings::from_toml_str("[openai]\napi_key = \"from-file\"")
            .unwrap()
            .with_keys_from(|name| match name {
                "OPENAI_API_KEY" => Some("from-env".to_string()),
                "XAI_API_KEY" => Some("xai-env".to_string()),
                "GEMINI_API_KEY" => Some("   ".to_string()),
                _ => None,
            });

        let key = |id: ProviderId| settings.config(id).api_key.as_ref().map(|k| k.expose_secret().clone());
        assert_eq!(key(ProviderId::OpenAi).as_deref(), Some("from-file"));
        assert_eq!(key(ProviderId::Grok).as_deref(), Some("xai-env"));
        assert_eq!(key(ProviderId::Gemini), None);
        assert_eq!(key(ProviderId::Claude), None);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "provider = \"grok\"\ntimeout_secs = 30").unwrap();

        let settings = ProviderSettings::load(file.path()).unwrap();
        assert_eq!(settings.active(), ProviderId::Grok);
        assert_eq!(settings.timeout_secs, 30);

        let missing = ProviderSettings::load(Path::new("/nonexistent/oitiva.toml")).unwrap();
        assert_eq!(missing.active(), ProviderId::Claude);
    }
}
