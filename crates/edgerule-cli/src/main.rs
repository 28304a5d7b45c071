//! edgerule
//!
//! Runs every rule of a container against one request and prints the rule
//! results as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use edgerule_engine::{Container, ExecuteOptions, RuleEngine};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

mod builtins;
mod config;
mod http;

use config::RunnerConfig;
use http::ReqwestClient;

#[derive(Parser, Debug)]
#[command(name = "edgerule")]
#[command(about = "Execute edgerule rules against request data", long_about = None)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "edgerule.yaml")]
    config: String,

    /// Container file (YAML or JSON)
    #[arg(long, env = "EDGERULE_CONTAINER")]
    container: Option<String>,

    /// Request data file; read from stdin when omitted or "-"
    #[arg(short, long)]
    request: Option<String>,

    /// Default module timeout in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Header added to every subrequest (NAME=VALUE, repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_key_val)]
    headers: Vec<(String, String)>,

    /// Environment variable exposed to core modules (NAME=VALUE, repeatable)
    #[arg(short, long = "env", value_parser = parse_key_val)]
    env: Vec<(String, String)>,

    /// Pretty-print the results
    #[arg(long)]
    pretty: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = RunnerConfig::load(&cli.config, &cli)?;
    let container_path = config
        .container_path
        .clone()
        .context("No container given; pass --container or set container_path in the configuration")?;

    let mut container = Container::from_file(&container_path)
        .with_context(|| format!("Failed to load container {}", container_path))?;
    container
        .log_sensitive_tokens
        .extend(config.log_sensitive_tokens.iter().cloned());

    let bound = container.bind_available(builtins::modules());
    info!(bound, "Built-in modules bound");
    for path in container.unbound_modules() {
        warn!(module = path, "Module has no implementation; rules using it will fail");
    }

    let client = ReqwestClient::new(Duration::from_secs(config.subrequest_timeout_secs))?;
    let engine = RuleEngine::initialize(container, Arc::new(client), config.engine.clone())?;
    info!("Container loaded: {} rules", engine.rule_count());

    let request = read_request(cli.request.as_deref())?;
    let options = ExecuteOptions {
        headers_for_subrequests: config.headers_for_subrequests.clone(),
    };

    let results = engine.execute(&request, config.env(), options).await;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", output);

    let snapshot = engine.metrics().snapshot();
    debug!(
        succeeded = snapshot.rules_succeeded,
        not_met = snapshot.rules_not_met,
        failed = snapshot.rules_failed,
        module_calls = snapshot.module_calls,
        avg_module_latency_us = snapshot.avg_module_latency_us(),
        "Execution finished"
    );

    Ok(())
}

/// Read request data as JSON from a file or stdin
fn read_request(path: Option<&str>) -> Result<serde_json::Value> {
    let content = match path {
        Some(path) if path != "-" => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read request {}", path))?
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    serde_json::from_str(&content).context("Request data is not valid JSON")
}

/// Parse a NAME=VALUE argument
fn parse_key_val(arg: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got \"{}\"", arg))?;

    if name.is_empty() {
        return Err(format!("empty name in \"{}\"", arg));
    }

    Ok((name.to_string(), value.to_string()))
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("edgerule=debug,edgerule_engine=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edgerule=info,edgerule_engine=info"))
    };

    // Results go to stdout, diagnostics to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
