//! Command-line interface definition and dispatch for tally.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler below.

use crate::{agent, config, mcp::McpClient, output, provider, tools::ToolCatalog, tools::ToolSession};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::time::Duration;
use tracing::warn;

/// Top-level CLI structure for tally.
#[derive(Parser)]
#[command(name = "tally", about = "A line-directive agent that drives MCP tool servers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options for locating the tool server, shared by subcommands.
#[derive(clap::Args)]
pub struct ServerArgs {
    /// Tool server executable (overrides config)
    #[arg(long = "server-command")]
    pub command: Option<String>,
    /// Argument for the tool server; repeat for several (overrides config)
    #[arg(long = "server-arg", allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Available subcommands for the tally CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the agent on a task
    Run {
        /// The task to solve (defaults to the configured task)
        task: Vec<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
        /// Provider to use (gemini, anthropic, openai, openrouter, ollama)
        #[arg(short, long)]
        provider: Option<String>,
        /// Maximum number of iterations
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Seconds to wait for each model response
        #[arg(long)]
        timeout: Option<u64>,
        #[command(flatten)]
        server: ServerArgs,
    },
    /// List the tools the server offers, as shown to the model
    Tools {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current config
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

impl ServerArgs {
    /// CLI values win; config supplies the rest.
    fn resolve(self, config: &config::Config) -> (String, Vec<String>) {
        let (command, args) = config.server_command();
        let command = self.command.unwrap_or(command);
        let args = if self.args.is_empty() { args } else { self.args };
        (command, args)
    }
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            task,
            model,
            provider: provider_name,
            max_iterations,
            timeout,
            server,
        } => {
            let config = config::Config::load()?;
            let selection =
                provider::resolve_model(provider_name.as_deref(), model.as_deref(), &config)?;

            let mut options = agent::AgentOptions::from_config(&config);
            let task = task.join(" ");
            if !task.trim().is_empty() {
                options.task = task;
            }
            if let Some(n) = max_iterations {
                options.max_iterations = n;
            }
            if let Some(secs) = timeout {
                options.generation_timeout = Duration::from_secs(secs);
            }

            println!(
                "{} [model: {}]",
                "tally".bold().cyan(),
                selection.model.yellow(),
            );
            println!();
            println!("{} {}", ">".green().bold(), options.task);

            let provider = provider::Provider::from_config(&config, &selection)?;
            let (command, args) = server.resolve(&config);
            let mut client = McpClient::connect(&command, &args).await?;

            let mut renderer = output::StdoutRenderer::new();
            let result = agent::run(&provider, &mut client, &mut renderer, &options).await;

            // Release the server whether or not the run succeeded.
            if let Err(err) = client.shutdown().await {
                warn!("tool server shutdown failed: {err:#}");
            }
            let outcome = result?;

            if let Some(answer) = &outcome.final_answer {
                println!("{} {}", "Answer:".bold(), answer.yellow());
            }
            Ok(())
        }
        Commands::Tools { server } => {
            let config = config::Config::load()?;
            let (command, args) = server.resolve(&config);
            let mut client = McpClient::connect(&command, &args).await?;
            let listed = client.list_tools().await;
            if let Err(err) = client.shutdown().await {
                warn!("tool server shutdown failed: {err:#}");
            }

            let catalog = ToolCatalog::from_wire(&listed?);
            println!(
                "{} {}",
                "Tools:".bold(),
                format!("({} from `{command}`)", catalog.len()).dimmed()
            );
            println!();
            println!("{}", catalog.render());
            Ok(())
        }
        Commands::Config { action } => {
            let config = config::Config::load()?;
            match action {
                ConfigAction::Show => {
                    let path = config::Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    let toml_str = toml::to_string_pretty(&config)?;
                    println!("{}", toml_str);
                }
            }
            Ok(())
        }
    }
}
