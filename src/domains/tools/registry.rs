//! Tool Registry - central registration and dispatch for all tools.

use std::sync::Arc;
#[cfg(feature = "http")]
use tracing::warn;

use crate::core::config::Config;

use super::definitions::{FilecoinApi, MinerPenaltyTool};

// ============================================================================
// Tool Registry
// ============================================================================

/// Tool registry - lists tools and dispatches HTTP tool calls.
pub struct ToolRegistry {
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    config: Arc<Config>,
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    api: Arc<FilecoinApi>,
}

impl ToolRegistry {
    /// Create a new tool registry.
    pub fn new(config: Arc<Config>, api: Arc<FilecoinApi>) -> Self {
        Self { config, api }
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        vec![MinerPenaltyTool::NAME]
    }

    /// Dispatch an HTTP tool call to the appropriate handler.
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        match name {
            MinerPenaltyTool::NAME => {
                MinerPenaltyTool::http_handler(arguments, self.api.clone(), self.config.clone())
                    .await
            }
            _ => {
                warn!(
                    "Unknown tool requested: {} (available: {:?})",
                    name,
                    self.tool_names()
                );
                Err(super::ToolError::not_found(name).to_string())
            }
        }
    }
}
