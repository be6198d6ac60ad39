//! Connections to MCP providers.
//!
//! The registry only depends on the [`Connection`] and [`Connector`] traits.
//! [`RmcpConnector`] is the production implementation: it picks the rmcp
//! transport from the descriptor's transport type and nowhere else in the
//! crate branches on it.

use async_trait::async_trait;
use rmcp::{
    RoleClient, ServiceExt,
    model::{CallToolRequestParam, CallToolResult, ClientInfo, Tool},
    service::{Peer, RunningService},
    transport::{
        StreamableHttpClientTransport, TokioChildProcess,
        streamable_http_client::StreamableHttpClientTransportConfig,
    },
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::config::{ProviderDescriptor, TransportType};
use super::error::{ClientError, ClientResult};

/// Client name reported during the handshake.
pub const CLIENT_NAME: &str = "filecoin-chat-client";

/// An established session with one provider.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Name of the provider this connection belongs to.
    fn provider(&self) -> &str;

    /// Enumerate the provider's tools.
    async fn list_tools(&self) -> ClientResult<Vec<Tool>>;

    /// Invoke one tool with a JSON object of arguments.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>)
    -> ClientResult<CallToolResult>;

    /// Close the session. Closing twice is a no-op.
    async fn close(&self) -> ClientResult<()>;
}

/// Performs the handshake for a provider descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a session. Timeouts and retries are applied by the caller.
    async fn connect(&self, descriptor: &ProviderDescriptor) -> ClientResult<Arc<dyn Connection>>;
}

// ============================================================================
// rmcp-backed implementation
// ============================================================================

type ClientService = RunningService<RoleClient, ClientInfo>;

/// A live rmcp client session.
pub struct RmcpConnection {
    provider: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<ClientService>>,
}

impl RmcpConnection {
    fn new(provider: &str, service: ClientService) -> Self {
        if let Some(info) = service.peer_info() {
            info!(
                "Connected {} MCP Service: {} v{}",
                provider, info.server_info.name, info.server_info.version
            );
        }
        Self {
            provider: provider.to_string(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }
    }
}

#[async_trait]
impl Connection for RmcpConnection {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn list_tools(&self) -> ClientResult<Vec<Tool>> {
        self.peer
            .list_all_tools()
            .await
            .map_err(|e| ClientError::discovery(&self.provider, e.to_string()))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> ClientResult<CallToolResult> {
        let request: CallToolRequestParam = serde_json::from_value(serde_json::json!({
            "name": name,
            "arguments": arguments,
        }))?;
        self.peer
            .call_tool(request)
            .await
            .map_err(|e| ClientError::invocation(name, e.to_string()))
    }

    async fn close(&self) -> ClientResult<()> {
        let service = self.service.lock().await.take();
        if let Some(service) = service {
            debug!("Closing {} MCP Service", self.provider);
            service
                .cancel()
                .await
                .map_err(|e| ClientError::connection(&self.provider, e.to_string()))?;
        }
        Ok(())
    }
}

/// Connector that speaks MCP through rmcp.
#[derive(Debug, Clone, Default)]
pub struct RmcpConnector;

impl RmcpConnector {
    pub fn new() -> Self {
        Self
    }

    fn client_info() -> ClientInfo {
        let mut info = ClientInfo::default();
        info.client_info.name = CLIENT_NAME.to_string();
        info.client_info.version = env!("CARGO_PKG_VERSION").to_string();
        info
    }

    async fn connect_http(descriptor: &ProviderDescriptor) -> ClientResult<ClientService> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (key, value) in &descriptor.headers {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                ClientError::config(format!("invalid header name '{}': {}", key, e))
            })?;
            let value = reqwest::header::HeaderValue::from_str(value).map_err(|e| {
                ClientError::config(format!("invalid value for header '{}': {}", key, e))
            })?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::connection(&descriptor.name, e.to_string()))?;

        let mut config =
            StreamableHttpClientTransportConfig::with_uri(descriptor.url_or_command.as_str());
        if let Some(token) = &descriptor.auth_token {
            config = config.auth_header(token.clone());
        }

        let transport = StreamableHttpClientTransport::with_client(http, config);
        Self::client_info()
            .serve(transport)
            .await
            .map_err(|e| ClientError::connection(&descriptor.name, e.to_string()))
    }

    async fn connect_stdio(descriptor: &ProviderDescriptor) -> ClientResult<ClientService> {
        let mut command = tokio::process::Command::new(&descriptor.url_or_command);
        command.args(&descriptor.args).envs(&descriptor.env);

        let transport = TokioChildProcess::new(command).map_err(|e| {
            ClientError::connection(
                &descriptor.name,
                format!("failed to spawn '{}': {}", descriptor.url_or_command, e),
            )
        })?;

        Self::client_info()
            .serve(transport)
            .await
            .map_err(|e| ClientError::connection(&descriptor.name, e.to_string()))
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    #[instrument(skip_all, fields(provider = %descriptor.name, transport = %descriptor.transport_type))]
    async fn connect(&self, descriptor: &ProviderDescriptor) -> ClientResult<Arc<dyn Connection>> {
        info!(
            "Connecting {} MCP Service at {}...",
            descriptor.name, descriptor.url_or_command
        );

        let service = match descriptor.transport_type {
            TransportType::Http => Self::connect_http(descriptor).await,
            TransportType::Stdio => Self::connect_stdio(descriptor).await,
        }
        .inspect_err(|e| warn!("Handshake with {} failed: {}", descriptor.name, e))?;

        Ok(Arc::new(RmcpConnection::new(&descriptor.name, service)))
    }
}
