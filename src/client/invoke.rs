//! Tool invocation adapter.
//!
//! Turns a remote tool call into an ordered list of text fragments.

use rmcp::model::{CallToolResult, RawContent};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::connection::Connection;
use super::error::{ClientError, ClientResult};

/// Call `operation` on `connection` and return the text fragments of the result.
///
/// Fails with [`ClientError::NoConnection`] when no connection is supplied,
/// [`ClientError::UnexpectedContent`] when any content item is not text, and
/// [`ClientError::EmptyResult`] when no text came back. A result flagged as
/// an error by the provider is still returned as text.
pub async fn invoke(
    connection: Option<&Arc<dyn Connection>>,
    operation: &str,
    arguments: Map<String, Value>,
) -> ClientResult<Vec<String>> {
    let Some(connection) = connection else {
        error!("Error calling tool {}: no connection", operation);
        return Err(ClientError::NoConnection);
    };

    debug!("Calling {} on {}", operation, connection.provider());
    let logged_args = Value::Object(arguments.clone());
    let result = connection
        .call_tool(operation, arguments)
        .await
        .inspect_err(|e| error!("Error calling tool {} with {}: {}", operation, logged_args, e))?;
    if result.is_error == Some(true) {
        warn!(
            "Tool {} on {} reported an error result",
            operation,
            connection.provider()
        );
    }

    text_fragments(operation, result)
        .inspect_err(|e| error!("Error calling tool {} with {}: {}", operation, logged_args, e))
}

/// Extract text fragments in the order they were returned.
pub fn text_fragments(operation: &str, result: CallToolResult) -> ClientResult<Vec<String>> {
    let mut fragments = Vec::with_capacity(result.content.len());
    for content in result.content {
        match content.raw {
            RawContent::Text(text) => fragments.push(text.text),
            other => {
                return Err(ClientError::UnexpectedContent {
                    operation: operation.to_string(),
                    kind: content_kind(&other).to_string(),
                });
            }
        }
    }

    if fragments.is_empty() {
        return Err(ClientError::EmptyResult(operation.to_string()));
    }
    Ok(fragments)
}

fn content_kind(content: &RawContent) -> &'static str {
    match content {
        RawContent::Text(_) => "text",
        RawContent::Image(_) => "image",
        RawContent::Audio(_) => "audio",
        RawContent::Resource(_) => "resource",
        _ => "resource_link",
    }
}
