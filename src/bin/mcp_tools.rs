//! Inspect the aggregated tool namespace of the configured MCP providers.
//!
//! Loads the provider file, connects to every provider, prints the tools
//! the language model would see, and optionally calls one of them.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use filecoin_mcp::client::{
    ConnectionRegistry, MinerPenaltyTool, ToolNamespace, config::servers_path_from_env,
    load_providers,
};
use filecoin_mcp::core::init_logging;

#[derive(Debug, Parser)]
#[command(name = "mcp-tools", version, about)]
struct Cli {
    /// Provider file [default: $MCP_SERVERS_PATH or ./mcp.json]
    #[arg(long)]
    servers: Option<PathBuf>,

    /// Tool to call after listing
    #[arg(long)]
    call: Option<String>,

    /// JSON object of tool arguments
    #[arg(long, default_value = "{}")]
    args: String,

    /// Log level [default: $MCP_LOG_LEVEL or info]
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("MCP_LOG_LEVEL").ok())
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    let path = cli.servers.unwrap_or_else(servers_path_from_env);
    let providers = load_providers(&path)
        .with_context(|| format!("failed to load providers from {}", path.display()))?;

    let registry = Arc::new(ConnectionRegistry::with_rmcp(providers));
    let report = registry.connect_all().await;
    for (name, err) in &report.failed {
        warn!("{} unavailable: {}", name, err);
    }

    let mut namespace = ToolNamespace::load(registry.clone()).await;
    if namespace.get(MinerPenaltyTool::NAME).is_some() {
        namespace.register(Arc::new(MinerPenaltyTool::new(registry.clone())));
    }

    println!(
        "{} of {} provider(s) connected, {} tool(s):",
        registry.all_connections().await.len(),
        registry.expected_provider_count(),
        namespace.len()
    );
    for tool in namespace.iter() {
        println!("  {:<24} {}", tool.name(), tool.description());
    }

    let outcome = match &cli.call {
        Some(name) => {
            let input: serde_json::Value =
                serde_json::from_str(&cli.args).context("--args must be valid JSON")?;
            namespace
                .call(name, input)
                .await
                .map(|answer| println!("{}", answer))
                .with_context(|| format!("calling {} failed", name))
        }
        None => Ok(()),
    };

    registry.shutdown().await;
    outcome
}
