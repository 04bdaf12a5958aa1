#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use planchat::{cli, config::Config, gateway, observability, PipelineKind};

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

#[derive(Parser, Debug)]
#[command(name = "planchat")]
#[command(version)]
#[command(about = "Conversational routing for planning data.", long_about = None)]
struct Cli {
    /// Config file path (overrides PLANCHAT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the configured pipeline
    #[command(long_about = "\
Chat with the configured pipeline.

Each line is processed as an independent request. \
Use --message for a single-shot query.

Examples:
  planchat chat
  planchat chat -m \"Show revenue by region\"
  planchat chat --pipeline tabular -m \"Fetch planning data\"")]
    Chat {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Pipeline to use (agent_loop, tabular, router)
        #[arg(long)]
        pipeline: Option<PipelineKind>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0)
        #[arg(short, long, value_parser = parse_temperature)]
        temperature: Option<f64>,
    },

    /// Send the forecast-update example through the router against live services
    Smoke,

    /// Start the HTTP gateway
    Gateway {
        /// Port to listen on (use 0 for random available port); defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// List the tools of the configured pipeline
    Tools,

    /// Show resolved configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        if path.as_os_str().is_empty() {
            bail!("--config cannot be empty");
        }
    }

    // Load diagnostics are deferred until the subscriber exists.
    let mut config = Config::load(cli.config.as_deref()).await?;
    observability::init_tracing(&config.observability.log_level)?;
    config.log_loaded();

    match cli.command {
        Commands::Chat {
            message,
            pipeline,
            model,
            temperature,
        } => {
            if let Some(pipeline) = pipeline {
                config.agent.pipeline = pipeline;
            }
            if let Some(model) = model {
                config.default_model = Some(model);
            }
            if let Some(temperature) = temperature {
                config.default_temperature = temperature;
            }
            cli::run_chat(config, message).await
        }

        Commands::Smoke => cli::run_smoke(config).await,

        Commands::Gateway { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting planchat gateway on {host} (random port)");
            } else {
                info!("Starting planchat gateway on {host}:{port}");
            }
            gateway::run_gateway(&host, port, config).await
        }

        Commands::Tools => cli::print_tools(&config),

        Commands::Status => {
            cli::print_status(&config);
            Ok(())
        }
    }
}
