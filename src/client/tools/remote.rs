use async_trait::async_trait;
use rmcp::model::Tool;
use serde_json::Value;
use std::sync::Arc;

use super::ChatTool;
use crate::client::error::{ClientError, ClientResult};
use crate::client::invoke::invoke;
use crate::client::registry::ConnectionRegistry;

/// A remote tool exposed as-is, forwarding calls to its provider.
pub struct RemoteTool {
    registry: Arc<ConnectionRegistry>,
    provider: String,
    tool: Tool,
}

impl RemoteTool {
    pub fn new(registry: Arc<ConnectionRegistry>, provider: impl Into<String>, tool: Tool) -> Self {
        Self {
            registry,
            provider: provider.into(),
            tool,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl ChatTool for RemoteTool {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or_default()
    }

    fn parameters(&self) -> Value {
        Value::Object(self.tool.input_schema.as_ref().clone())
    }

    async fn call(&self, input: Value) -> ClientResult<String> {
        let arguments = match input {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(ClientError::invalid_input(format!(
                    "arguments for {} must be a JSON object, got {}",
                    self.name(),
                    other
                )));
            }
        };

        let connection = self.registry.client(&self.provider).await;
        let fragments = invoke(connection.as_ref(), self.name(), arguments).await?;
        Ok(fragments.join("\n"))
    }
}
