//! Chat tools handed to a language model.
//!
//! Every tool forwards through the invocation adapter. [`ToolNamespace`]
//! collects them into the single callable surface the model sees.

mod miner_penalty;
mod remote;

pub use miner_penalty::{MinerPenaltyInput, MinerPenaltyTool};
pub use remote::RemoteTool;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::error::{ClientError, ClientResult};
use super::registry::ConnectionRegistry;

/// A tool the language model can call.
#[async_trait]
pub trait ChatTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the input object.
    fn parameters(&self) -> Value;

    /// Run the tool and return its text answer.
    async fn call(&self, input: Value) -> ClientResult<String>;
}

/// All chat tools, keyed by name.
#[derive(Default)]
pub struct ToolNamespace {
    tools: BTreeMap<String, Arc<dyn ChatTool>>,
}

impl ToolNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the namespace from the registry's aggregated operations.
    ///
    /// Refreshes the registry first if some providers are not connected.
    pub async fn load(registry: Arc<ConnectionRegistry>) -> Self {
        let mut namespace = Self::new();
        for (name, operation) in registry.tools().await {
            debug!("Exposing {} from {}", name, operation.provider);
            namespace.register(Arc::new(RemoteTool::new(
                registry.clone(),
                operation.provider,
                operation.tool,
            )));
        }
        namespace
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ChatTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ChatTool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ChatTool>> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Call a tool by name.
    pub async fn call(&self, name: &str, input: Value) -> ClientResult<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| ClientError::invalid_input(format!("Unknown tool: {}", name)))?;
        tool.call(input).await
    }
}
