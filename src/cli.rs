//! Command implementations behind the `planchat` binary.

use anyhow::{bail, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{suggest_actions, Agent, ChatReply, PipelineKind};
use crate::config::Config;
use crate::providers;

/// Messages sent by `planchat smoke`.
pub const SMOKE_MESSAGES: [&str; 1] = [
    "please add 10% to Comfortable Office Chair Asia Pacific Region for all months and save it to forecast version",
];

/// Print a reply the way the interactive session shows it.
pub fn write_reply<W: Write>(reply: &ChatReply, out: &mut W) -> Result<()> {
    writeln!(out, "{}", reply.response())?;
    if let Some(query_type) = reply.query_type() {
        writeln!(out, "  query type: {query_type}")?;
    }
    if let Some(rows) = reply.data() {
        writeln!(out, "  data: {} rows", rows.len())?;
    }
    let actions = suggest_actions(reply.response());
    if !actions.is_empty() {
        let names: Vec<String> = actions
            .iter()
            .filter_map(|a| serde_json::to_value(a).ok())
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        writeln!(out, "  suggested: {}", names.join(", "))?;
    }
    Ok(())
}

/// Single message, or one independent request per stdin line.
pub async fn run_chat(config: Config, message: Option<String>) -> Result<()> {
    let agent = Agent::from_config(&config)?;

    if let Some(message) = message {
        let reply = agent.process_message(&message).await?;
        return write_reply(&reply, &mut std::io::stdout().lock());
    }

    println!(
        "planchat ({} pipeline). Type a message, or 'exit' to quit.",
        agent.pipeline()
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        match agent.process_message(line).await {
            Ok(reply) => write_reply(&reply, &mut std::io::stdout().lock())?,
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }
    Ok(())
}

/// Send the smoke messages through `agent`; processing errors are reported, not returned.
pub async fn smoke_with<W: Write>(agent: &Agent, out: &mut W) -> Result<()> {
    for message in SMOKE_MESSAGES {
        writeln!(out, "\n{}", "=".repeat(50))?;
        writeln!(out, "Testing message: {message}")?;
        match agent.process_message(message).await {
            Ok(reply) => {
                let query_type = reply
                    .query_type()
                    .map_or_else(|| "n/a".to_string(), |q| q.to_string());
                writeln!(out, "Query Type: {query_type}")?;
                writeln!(out, "Response: {}", reply.response())?;
            }
            Err(e) => writeln!(out, "Error processing message: {e:#}")?,
        }
    }
    Ok(())
}

/// Manual end-to-end check of the router against live services.
pub async fn run_smoke(mut config: Config) -> Result<()> {
    if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        bail!("OPENAI_API_KEY not found in environment variables");
    }
    config.agent.pipeline = PipelineKind::Router;
    let agent = Agent::from_config(&config)?;
    smoke_with(&agent, &mut std::io::stdout().lock()).await
}

pub fn print_tools(config: &Config) -> Result<()> {
    let agent = Agent::from_config(config)?;
    let tools = agent.tools();
    if tools.is_empty() {
        println!("The {} pipeline exposes no tools.", agent.pipeline());
        return Ok(());
    }
    println!("Tools for the {} pipeline:\n", agent.pipeline());
    for tool in tools {
        println!("  {:<20} {}", tool.name, tool.description);
    }
    Ok(())
}

pub fn print_status(config: &Config) {
    println!("planchat status");
    println!();
    println!("Version:     {}", env!("CARGO_PKG_VERSION"));
    println!("Config:      {}", config.config_path.display());
    println!("Pipeline:    {}", config.agent.pipeline);
    println!();
    let provider = config.default_provider.as_deref().unwrap_or("openai");
    let known = providers::list_providers()
        .into_iter()
        .find(|p| p.name == provider)
        .map_or(provider, |p| p.display_name);
    println!("Provider:    {provider} ({known})");
    println!(
        "Model:       {}",
        config.default_model.as_deref().unwrap_or("(default)")
    );
    println!("Temperature: {}", config.default_temperature);
    println!(
        "API key:     {}",
        if config.api_key.is_some() { "set" } else { "missing" }
    );
    println!();
    println!(
        "Endpoint:    {}",
        config.endpoint.url.as_deref().unwrap_or("(not configured)")
    );
    println!("  timeout:   {}s", config.endpoint.timeout_secs);
    println!(
        "Routing:     {} keywords, {:?} matching",
        config.routing.write_keywords.len(),
        config.routing.match_mode
    );
    println!(
        "Gateway:     {}:{}",
        config.gateway.host, config.gateway.port
    );
}
