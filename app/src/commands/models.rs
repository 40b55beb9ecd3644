//! `oitiva models`: list the model registry

use anyhow::Result;
use clap::Args;
use oitiva_llm::models::{self, ModelInfo, MODELS};
use oitiva_llm::ProviderId;

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only list models of this provider
    #[arg(long = "for")]
    pub for_provider: Option<String>,
}

pub fn execute(args: ModelsArgs, json: bool) -> Result<()> {
    let list: Vec<&ModelInfo> = match args.for_provider.as_deref() {
        Some(provider) => models::get_models_by_provider(provider.parse::<ProviderId>()?),
        None => MODELS.iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("{:<30} {:<8} {:>12}  {}", "MODEL", "PROVIDER", "MAX OUTPUT", "REASONING");
    for model in list {
        println!(
            "{:<30} {:<8} {:>12}  {}",
            model.id,
            model.provider.as_str(),
            model.max_output_tokens,
            if model.reasoning { "yes" } else { "no" },
        );
    }
    println!();
    println!(
        "Models not listed use a {}-token output ceiling.",
        models::DEFAULT_MAX_OUTPUT_TOKENS
    );
    Ok(())
}
