//! Command-line arguments

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::state::AppState;

/// Structured analysis of hearing testimony
#[derive(Parser, Debug)]
#[command(name = "oitiva")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file (defaults to the per-user config directory)
    #[arg(short, long, env = "OITIVA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Provider to use instead of the configured one
    #[arg(short, long, global = true)]
    pub provider: Option<String>,

    /// Model to use instead of the provider's configured one
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a hearing transcript
    Analyze(commands::analyze::AnalyzeArgs),

    /// Show the effective provider settings
    Config,

    /// List known models and their output ceilings
    Models(commands::models::ModelsArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let state = AppState::load(
            self.config.as_deref(),
            self.provider.as_deref(),
            self.model.as_deref(),
        )?;

        match self.command {
            Commands::Analyze(args) => commands::analyze::execute(args, state).await,
            Commands::Config => commands::config::execute(&state, self.json),
            Commands::Models(args) => commands::models::execute(args, self.json),
        }
    }
}
