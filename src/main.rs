//! Entry point for tally, a line-directive tool agent for the terminal.
//!
//! This binary loads environment variables, sets up logging, parses CLI
//! arguments via [`cli`], and dispatches to the appropriate subcommand handler.

mod agent;
mod cli;
mod config;
mod constants;
mod directive;
mod error;
mod mcp;
mod output;
mod provider;
mod tools;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Runs the tally CLI.
///
/// Loads `.env` files (silently ignored if absent), installs a stderr
/// tracing subscriber filtered by `TALLY_LOG`, parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(constants::LOG_ENV_VAR)
                .unwrap_or_else(|_| EnvFilter::new(constants::DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::parse();
    cli::run(cli).await
}
