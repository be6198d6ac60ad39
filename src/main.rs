//! Filecoin MCP server entry point.
//!
//! Loads configuration, applies command-line overrides, and serves the
//! `minerPenalty` tool over stdio or HTTP.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use filecoin_mcp::core::{Config, McpServer, TransportKind, TransportService, init_logging};

/// Filecoin MCP Server - Provide Filecoin related query interface
#[derive(Debug, Parser)]
#[command(name = "filecoin-mcp", version, about)]
struct Cli {
    /// Server port (HTTP transport) [default: 3002]
    #[arg(long)]
    port: Option<u16>,

    /// Transport type [default: http]
    #[arg(long = "type", value_enum)]
    transport: Option<TransportKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment
    let mut config = Config::from_env();
    config.transport = config.transport.with_overrides(cli.transport, cli.port)?;

    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);
    config.validate()?;

    let server = McpServer::new(config.clone())?;
    info!("Server initialized");

    let transport = TransportService::new(config.transport);
    transport.run(server).await?;

    info!("Server shutting down");

    Ok(())
}
