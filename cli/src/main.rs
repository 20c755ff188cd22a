//! # conductor CLI
//!
//! Command-line interface for conductor - answers a query by letting a
//! language model call local tools.
//!
//! ## Usage
//!
//! - `conductor "query"` - Run a single query and print the answer
//! - `conductor tools` - Show available tools

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod output;
mod tools;

use commands::{run_command, tools_command};
use config::CliConfigLoader;

/// conductor - model/tool orchestration from the command line
#[derive(Parser)]
#[command(name = "conductor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Answer a query by letting a language model call tools")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Protocol to use (google_ai, openai_compat)
    #[arg(long)]
    protocol: Option<String>,

    /// API key override
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long)]
    model: Option<String>,

    /// Maximum number of model turns
    #[arg(long)]
    max_turns: Option<usize>,

    /// System instructions for the model
    #[arg(long)]
    instructions: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output trajectory file
    #[arg(long)]
    trajectory_file: Option<PathBuf>,

    /// The query to answer
    query: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available tools
    Tools,
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(protocol) = &cli.protocol {
        loader = loader.with_protocol_override(protocol.clone());
    }

    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    if let Some(max_turns) = cli.max_turns {
        loader = loader.with_max_turns_override(max_turns);
    }

    if let Some(instructions) = &cli.instructions {
        loader = loader.with_instructions_override(instructions.clone());
    }

    loader
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for the answer
    let filter = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config_loader = build_config_loader(&cli);

    match (cli.query, cli.command) {
        (Some(query), None) => {
            run_command(query, config_loader, cli.trajectory_file, cli.verbose).await
        }
        (Some(_), Some(_)) => bail!("Cannot specify both a query and a subcommand"),
        (None, Some(Commands::Tools)) => tools_command().await,
        (None, None) => bail!("No query given. Run `conductor \"<query>\"` or `conductor --help`"),
    }
}
