//! `oitiva config`: show the effective provider settings

use anyhow::Result;
use oitiva_llm::settings::api_key_var;
use oitiva_llm::{ProviderId, Thinking};
use serde::Serialize;

use crate::state::AppState;

/// One provider's settings, with the key reduced to whether it is set
#[derive(Debug, Serialize)]
struct ProviderView {
    id: &'static str,
    name: &'static str,
    active: bool,
    model: String,
    base_url: String,
    thinking: Option<String>,
    api_key: &'static str,
    api_key_var: &'static str,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    config_path: Option<String>,
    configured_provider: String,
    active_provider: &'static str,
    timeout_secs: u64,
    providers: Vec<ProviderView>,
}

pub fn execute(state: &AppState, json: bool) -> Result<()> {
    let view = config_view(state);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    match &view.config_path {
        Some(path) => println!("Config file: {path}"),
        None => println!("Config file: (none)"),
    }
    println!("Provider:    {} (configured: {:?})", view.active_provider, view.configured_provider);
    println!("Timeout:     {}s", view.timeout_secs);
    println!();
    for p in &view.providers {
        let marker = if p.active { "*" } else { " " };
        println!(
            "{marker} {:<7} {:<28} key {:<7} ({}) thinking {}",
            p.id,
            p.model,
            p.api_key,
            p.api_key_var,
            p.thinking.as_deref().unwrap_or("off"),
        );
        println!("          {}", p.base_url);
    }
    Ok(())
}

fn config_view(state: &AppState) -> ConfigView {
    let settings = &state.settings;
    let active = settings.active();

    let providers = ProviderId::ALL
        .into_iter()
        .map(|id| {
            let config = settings.config(id);
            ProviderView {
                id: id.as_str(),
                name: id.name(),
                active: id == active,
                model: config.model.clone(),
                base_url: config.base_url.clone(),
                thinking: config.thinking.map(|t| match t {
                    Thinking::Budget(tokens) => format!("{tokens} tokens"),
                    Thinking::Level(level) => level.as_str().to_string(),
                }),
                api_key: if config.api_key.is_some() { "set" } else { "missing" },
                api_key_var: api_key_var(id),
            }
        })
        .collect();

    ConfigView {
        config_path: state.config_path.as_ref().map(|p| p.display().to_string()),
        configured_provider: settings.provider.clone(),
        active_provider: active.as_str(),
        timeout_secs: settings.timeout_secs,
        providers,
    }
}
