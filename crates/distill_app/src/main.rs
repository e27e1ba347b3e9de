mod cancel;
mod commands;
mod config;
mod document;
mod logging;
mod persist;
mod sinks;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{ExtractArgs, SummarizeArgs};
use crate::config::{Settings, API_KEY_ENV, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(name = "distill", version, about = "Summarize web pages and text with ranked LLM fallback")]
struct Cli {
    /// RON settings file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cleaned text extracted from a URL.
    Extract(ExtractArgs),
    /// Summarize a URL or text.
    Summarize(SummarizeArgs),
    /// List the ranked models tried by `auto-free`.
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.verbose, cli.log_file.as_deref());

    let settings = Settings::load(&cli.config)?.with_env_api_key(std::env::var(API_KEY_ENV).ok());
    match cli.command {
        Command::Extract(args) => commands::extract(&settings, args).await,
        Command::Summarize(args) => commands::summarize(&settings, args).await,
        Command::Models => commands::models(&settings),
    }
}
