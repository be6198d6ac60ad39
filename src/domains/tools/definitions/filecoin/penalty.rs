//! Miner penalty tool definition.
//!
//! Calculates the penalty for terminating a miner's sectors by querying the
//! remote Filecoin API.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::api::FilecoinApi;
use super::csv::drop_columns;
use crate::core::config::{Config, FilecoinConfig, PenaltyFormat};
use crate::domains::tools::ToolError;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the miner penalty tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MinerPenaltyParams {
    #[serde(rename = "minerID")]
    #[schemars(description = "miner id, miner id should be in the form of f010023")]
    pub miner_id: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Miner penalty tool.
pub struct MinerPenaltyTool;

impl MinerPenaltyTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "minerPenalty";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "Calculate the penalty for terminating sectors by Filecoin Miner";

    /// Execute the tool logic.
    ///
    /// Failures are reported as error results carrying a readable message.
    #[instrument(skip_all, fields(miner = %params.miner_id))]
    pub async fn execute(
        params: &MinerPenaltyParams,
        api: &FilecoinApi,
        config: &FilecoinConfig,
    ) -> CallToolResult {
        let miner_id = params.miner_id.trim();
        if miner_id.is_empty() {
            warn!("Empty miner id");
            return CallToolResult::error(vec![Content::text(
                ToolError::invalid_arguments("minerID must not be empty").to_string(),
            )]);
        }

        match api.miner_penalty(miner_id).await {
            Ok(body) => {
                let text = Self::render(&body, config);
                info!("Get miner {} penalty information: {}", miner_id, text);
                CallToolResult::success(vec![Content::text(text)])
            }
            Err(e @ ToolError::UnknownMiner(_)) => {
                warn!("{}", e);
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
            Err(e) => {
                error!("Failed to get miner {} penalty: {}", miner_id, e);
                CallToolResult::error(vec![Content::text(format!(
                    "Failed to get miner penalty: {}",
                    e
                ))])
            }
        }
    }

    /// Render a successful response body per the configured format.
    pub fn render(body: &str, config: &FilecoinConfig) -> String {
        match config.response_format {
            PenaltyFormat::Json => match serde_json::from_str::<serde_json::Value>(body) {
                Ok(value) => value.to_string(),
                Err(_) => serde_json::Value::String(body.to_string()).to_string(),
            },
            PenaltyFormat::Csv => drop_columns(body, &config.csv_drop_columns),
        }
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub async fn http_handler(
        arguments: serde_json::Value,
        api: Arc<FilecoinApi>,
        config: Arc<Config>,
    ) -> Result<serde_json::Value, String> {
        let params: MinerPenaltyParams = serde_json::from_value(arguments)
            .map_err(|e| format!("Missing or invalid 'minerID' parameter: {}", e))?;

        let result = Self::execute(&params, &api, &config.filecoin).await;

        Ok(serde_json::json!({
            "content": result.content,
            "isError": result.is_error.unwrap_or(false)
        }))
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<MinerPenaltyParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO transport.
    pub fn create_route<S>(config: Arc<Config>, api: Arc<FilecoinApi>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let config = config.clone();
            let api = api.clone();
            async move {
                let params: MinerPenaltyParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &api, &config.filecoin).await)
            }
            .boxed()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::testing::spawn_fake_api;
    use super::*;
    use std::time::Duration;

    fn api(base: &str) -> FilecoinApi {
        FilecoinApi::new(base, Duration::from_secs(5)).unwrap()
    }

    fn params(miner: &str) -> MinerPenaltyParams {
        MinerPenaltyParams {
            miner_id: miner.to_string(),
        }
    }

    fn text(result: &CallToolResult) -> &str {
        match &result.content[0].raw {
            rmcp::model::RawContent::Text(text) => &text.text,
            _ => panic!("Expected text content"),
        }
    }

    #[tokio::test]
    async fn test_penalty_json() {
        let base = spawn_fake_api().await;
        let config = FilecoinConfig::with_base_url(&base);

        let result = MinerPenaltyTool::execute(&params(" f01234 "), &api(&base), &config).await;
        assert!(!result.is_error.unwrap_or(false));

        let value: serde_json::Value = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(value["penalty"], "12.5");
    }

    #[tokio::test]
    async fn test_unknown_miner_message() {
        let base = spawn_fake_api().await;
        let config = FilecoinConfig::with_base_url(&base);

        let result = MinerPenaltyTool::execute(&params("f0999"), &api(&base), &config).await;
        assert!(result.is_error.unwrap_or(false));
        assert!(text(&result).contains("is not miner"));
        assert!(text(&result).starts_with("`f0999`"));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_error_result() {
        let base = spawn_fake_api().await;
        let config = FilecoinConfig::with_base_url(&base);

        let result = MinerPenaltyTool::execute(&params("f0down"), &api(&base), &config).await;
        assert!(result.is_error.unwrap_or(false));
        assert!(text(&result).contains("502"));
    }

    #[tokio::test]
    async fn test_csv_columns_dropped() {
        let base = spawn_fake_api().await;
        let mut config = FilecoinConfig::with_base_url(&base);
        config.response_format = PenaltyFormat::Csv;
        config.csv_drop_columns = vec!["height".to_string()];

        let result = MinerPenaltyTool::execute(&params("f0csv"), &api(&base), &config).await;
        assert_eq!(text(&result), "miner,penalty\nf0csv,1.5");
    }

    #[tokio::test]
    async fn test_empty_miner_id() {
        let config = FilecoinConfig::with_base_url("http://127.0.0.1:1");
        let result =
            MinerPenaltyTool::execute(&params("  "), &api("http://127.0.0.1:1"), &config).await;
        assert!(result.is_error.unwrap_or(false));
        assert!(text(&result).contains("minerID"));
    }

    #[test]
    fn test_render_json_stringifies_plain_text() {
        let config = FilecoinConfig::default();
        assert_eq!(MinerPenaltyTool::render("no penalty", &config), "\"no penalty\"");
        assert_eq!(
            MinerPenaltyTool::render("{ \"a\": 1 }", &config),
            "{\"a\":1}"
        );
    }

    #[test]
    fn test_schema_describes_miner_id() {
        let tool = MinerPenaltyTool::to_tool();
        assert_eq!(tool.name, "minerPenalty");
        let schema = serde_json::Value::Object(tool.input_schema.as_ref().clone());
        assert_eq!(
            schema["properties"]["minerID"]["description"],
            "miner id, miner id should be in the form of f010023"
        );
        assert_eq!(schema["required"][0], "minerID");
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_handler() {
        let base = spawn_fake_api().await;
        let mut config = Config::default();
        config.filecoin = FilecoinConfig::with_base_url(&base);

        let response = MinerPenaltyTool::http_handler(
            serde_json::json!({ "minerID": "f0999" }),
            Arc::new(api(&base)),
            Arc::new(config.clone()),
        )
        .await
        .unwrap();
        assert_eq!(response["isError"], true);

        let err = MinerPenaltyTool::http_handler(
            serde_json::json!({}),
            Arc::new(api(&base)),
            Arc::new(config),
        )
        .await
        .unwrap_err();
        assert!(err.contains("minerID"));
    }
}
