//! `oitiva analyze`: run one testimony analysis

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use oitiva_analysis::AnalysisResult;
use oitiva_core::Severity;
use oitiva_llm::TokenUsage;
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Hearing transcript, plain text
    #[arg(short, long)]
    pub transcript: PathBuf,

    /// Case summary, plain text
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Result file layout
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisOutput<'a> {
    generated_at: String,
    provider: &'a str,
    model: &'a str,
    usage: TokenUsage,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

pub async fn execute(args: AnalyzeArgs, state: AppState) -> Result<()> {
    let transcript = tokio::fs::read_to_string(&args.transcript)
        .await
        .with_context(|| format!("Failed to read transcript {}", args.transcript.display()))?;
    let summary = match &args.summary {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read case summary {}", path.display()))?,
        None => String::new(),
    };

    let session = state.session()?;
    let provider = state.settings.active();
    let model = state.settings.config(provider).model.clone();
    info!(provider = %provider, model = %model, "Analyzing {}", args.transcript.display());

    let bar = progress_bar();
    let result = session
        .analyze(&transcript, &summary, |percent, message| {
            bar.set_position(u64::from(percent));
            bar.set_message(message.to_string());
        })
        .await;
    bar.finish_and_clear();

    let Some(result) = result else {
        let message = session.error().unwrap_or_else(|| "unknown error".to_string());
        return Err(anyhow!("Analysis failed: {message}"));
    };

    let usage = session.usage();
    let output = AnalysisOutput {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        provider: provider.as_str(),
        model: &model,
        usage,
        result: &result,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Result written to {}", path.display());
        }
        None => println!("{json}"),
    }

    print_summary(&result, &usage);
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_summary(result: &AnalysisResult, usage: &TokenUsage) {
    let counts: Vec<String> = result
        .statistics()
        .into_iter()
        .map(|(field, count)| format!("{field}: {count}"))
        .collect();
    eprintln!("{}", counts.join(", "));

    let serious = result.contradictions_at_least(Severity::Grave).count();
    if serious > 0 {
        eprintln!("{serious} serious contradiction(s) found");
    }
    eprintln!("Tokens: {usage}");
}
