//! MCP Server implementation.
//!
//! The handler exposes the Filecoin tools. Tools are defined in
//! `domains/tools/definitions/`; the ToolRouter is built in
//! `domains/tools/router.rs`, so adding a tool does not touch this file.

use rmcp::{
    ServerHandler,
    handler::server::tool::ToolRouter,
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool_handler,
};
use std::sync::Arc;
use std::time::Duration;

use super::config::Config;
use super::error::Result as CoreResult;
use crate::domains::tools::{build_tool_router, definitions::FilecoinApi};

#[cfg(feature = "http")]
use crate::domains::tools::ToolRegistry;

/// Usage guide sent to clients on initialize.
pub const INSTRUCTIONS: &str = "## Filecoin MCP User Guide\n  Providing miner related query functions";

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Client for the remote penalty API.
    api: Arc<FilecoinApi>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Fails if `FILECOIN_URL` is not configured.
    pub fn new(config: Config) -> CoreResult<Self> {
        let base_url = config.filecoin.require_base_url()?;
        let api = Arc::new(FilecoinApi::new(
            base_url,
            Duration::from_secs(config.filecoin.timeout_secs),
        )?);
        let config = Arc::new(config);

        Ok(Self {
            tool_router: build_tool_router::<Self>(config.clone(), api.clone()),
            config,
            api,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<serde_json::Value> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect()
    }

    /// Call a tool by name (for HTTP transport).
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, String> {
        let registry = ToolRegistry::new(self.config.clone(), self.api.clone());
        registry.call_tool(name, arguments).await
    }
}

#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::default();
        server_info.name = self.name().to_string();
        server_info.version = self.version().to_string();

        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            ..Default::default()
        }
    }
}
