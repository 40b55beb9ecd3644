//! Application state: effective settings for one invocation

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use oitiva_analysis::{AnalysisPipeline, AnalysisSession};
use oitiva_llm::{Gateway, ProviderId, ProviderSettings};

/// Settings file name inside the per-user config directory
const CONFIG_FILE: &str = "config.toml";

/// Main application state
pub struct AppState {
    /// Settings after file, environment and flag overrides
    pub settings: ProviderSettings,
    /// File the settings were read from, if any
    pub config_path: Option<PathBuf>,
}

impl AppState {
    /// Load settings from `config` or the default location, then apply the
    /// environment keys and command-line overrides
    pub fn load(config: Option<&Path>, provider: Option<&str>, model: Option<&str>) -> Result<Self> {
        let config_path = match config {
            Some(path) if !path.exists() => bail!("Config file not found: {}", path.display()),
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        let settings = match &config_path {
            Some(path) => ProviderSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => ProviderSettings::default(),
        };

        Ok(Self {
            settings: apply_overrides(settings.with_env_keys(), provider, model)?,
            config_path,
        })
    }

    /// Build an analysis session over a real HTTP gateway
    pub fn session(&self) -> Result<AnalysisSession> {
        let gateway = Gateway::new(self.settings.clone()).context("Failed to create HTTP client")?;
        Ok(AnalysisSession::new(AnalysisPipeline::new(gateway)))
    }
}

/// `<config dir>/config.toml` for this user
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "oitiva", "Oitiva").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Apply `--provider` and `--model`.
///
/// A provider named on the command line must be known; only ids coming from
/// the settings file fall back to the default provider.
fn apply_overrides(
    mut settings: ProviderSettings,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<ProviderSettings> {
    if let Some(provider) = provider {
        let id: ProviderId = provider.parse()?;
        settings.provider = id.as_str().to_string();
    }
    if let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) {
        let active = settings.active();
        settings.config_mut(active).model = model.to_string();
    }
    Ok(settings)
}
