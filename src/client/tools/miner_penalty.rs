use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::ChatTool;
use crate::client::error::{ClientError, ClientResult};
use crate::client::invoke::invoke;
use crate::client::registry::ConnectionRegistry;

/// Provider serving `minerPenalty`.
pub const PENALTY_PROVIDER: &str = "filecoin-mcp";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MinerPenaltyInput {
    /// Miner id, in the form f010023.
    #[serde(rename = "minerID")]
    pub miner_id: String,
}

/// Typed wrapper around the remote `minerPenalty` tool.
pub struct MinerPenaltyTool {
    registry: Arc<ConnectionRegistry>,
}

impl MinerPenaltyTool {
    pub const NAME: &'static str = "minerPenalty";
    pub const DESCRIPTION: &'static str =
        "Calculate the penalty for terminating sectors by Filecoin Miner.";

    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Query the penalty for one miner.
    pub async fn penalty(&self, input: MinerPenaltyInput) -> ClientResult<String> {
        let miner_id = input.miner_id.trim();
        if miner_id.is_empty() {
            return Err(ClientError::invalid_input("minerID must not be empty"));
        }
        info!("Querying penalty for miner {}", miner_id);

        let mut arguments = serde_json::Map::new();
        arguments.insert("minerID".to_string(), Value::String(miner_id.to_string()));

        let connection = self.registry.client(PENALTY_PROVIDER).await;
        let fragments = invoke(connection.as_ref(), Self::NAME, arguments).await?;
        fragments
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::EmptyResult(Self::NAME.to_string()))
    }
}

#[async_trait]
impl ChatTool for MinerPenaltyTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(MinerPenaltyInput)).unwrap_or(Value::Null)
    }

    async fn call(&self, input: Value) -> ClientResult<String> {
        let input: MinerPenaltyInput = serde_json::from_value(input)
            .map_err(|e| ClientError::invalid_input(format!("minerPenalty input: {}", e)))?;
        self.penalty(input).await
    }
}
