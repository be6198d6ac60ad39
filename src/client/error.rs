//! Client-side error types.
//!
//! Connection and discovery errors are contained per provider by the
//! registry; invocation and validation errors travel back to the caller.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while talking to MCP providers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Handshake or transport-level failure.
    #[error("Failed to connect to '{provider}': {message}")]
    Connection { provider: String, message: String },

    /// The handshake did not finish within the provider's timeout.
    #[error("Connection to '{provider}' timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// The tool list could not be fetched or read.
    #[error("Tool discovery failed for '{provider}': {message}")]
    Discovery { provider: String, message: String },

    /// The provider advertised no callable tools.
    #[error("No tools found for {0}")]
    NoOperations(String),

    /// No live connection was available for the call.
    #[error("Failed to get client")]
    NoConnection,

    /// The remote call was rejected or the transport failed mid-call.
    #[error("Error calling tool {operation}: {message}")]
    Invocation { operation: String, message: String },

    /// The response contained a content item that is not text.
    #[error("Unknown content type from tool {operation}: {kind}")]
    UnexpectedContent { operation: String, kind: String },

    /// The call succeeded but produced no text.
    #[error("No text returned from tool {0}")]
    EmptyResult(String),

    /// Tool arguments failed validation before being sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider configuration could not be loaded.
    #[error("Provider configuration error: {0}")]
    Config(String),

    /// I/O errors from reading configuration or spawning processes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Create a connection error for a provider.
    pub fn connection(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a discovery error for a provider.
    pub fn discovery(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invocation error for a tool.
    pub fn invocation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an input validation error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error belongs to the connect/discover phase.
    pub fn is_connect_phase(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Timeout { .. }
                | Self::Discovery { .. }
                | Self::NoOperations(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(ClientError::NoConnection.to_string(), "Failed to get client");
        assert_eq!(
            ClientError::EmptyResult("minerPenalty".into()).to_string(),
            "No text returned from tool minerPenalty"
        );
        assert_eq!(
            ClientError::NoOperations("filecoin-mcp".into()).to_string(),
            "No tools found for filecoin-mcp"
        );
        let err = ClientError::Timeout {
            provider: "slow".into(),
            timeout_ms: 30000,
        };
        assert!(err.to_string().contains("30000ms"));
    }

    #[test]
    fn test_connect_phase_classification() {
        assert!(ClientError::connection("a", "refused").is_connect_phase());
        assert!(ClientError::discovery("a", "bad list").is_connect_phase());
        assert!(ClientError::NoOperations("a".into()).is_connect_phase());
        assert!(!ClientError::NoConnection.is_connect_phase());
        assert!(!ClientError::invocation("x", "boom").is_connect_phase());
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Json(_)));
    }
}
