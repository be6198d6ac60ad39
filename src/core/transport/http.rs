//! HTTP transport implementation.
//!
//! - `POST {rpc_path}`: stateless JSON-RPC, one response per request
//! - `GET {rpc_path}`: legacy SSE stream; the first `endpoint` event names
//!   the `/messages?sessionId=<id>` URL to post to
//! - `POST /messages`: JSON-RPC for an SSE session, answered on its stream
//! - `GET /health`: liveness probe

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, instrument, warn};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;
use crate::core::server::INSTRUCTIONS;

/// Protocol version answered when the client does not request one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Path SSE clients post their messages to.
pub const MESSAGES_PATH: &str = "/messages";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<serde_json::Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<serde_json::Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<serde_json::Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32603, msg)
    }
}

type SessionMap = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Event>>>>;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The MCP server instance.
    server: McpServer,
    /// Open SSE sessions, keyed by session id.
    sessions: SessionMap,
}

impl AppState {
    pub fn new(server: McpServer) -> Self {
        Self {
            server,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of open SSE sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Query string of `POST /messages`.
#[derive(Debug, Deserialize)]
struct MessagesQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router over the given state.
    pub fn router(&self, state: AppState) -> Router {
        let rpc_path = self.config.rpc_path.clone();

        let mut app = Router::new()
            .route(&self.config.rpc_path, post(handle_rpc).get(handle_sse))
            .route(MESSAGES_PATH, post(handle_message))
            .route("/health", get(health_check))
            .route("/", get(move || root_handler(rpc_path.clone())))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        app
    }

    /// Run the HTTP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(AppState::new(server));

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "MCP Stateless Streamable HTTP Server listening on {} (CORS {})",
            addr, cors_status
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → SSE:      GET {} + POST {}", self.config.rpc_path, MESSAGES_PATH);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Root handler - provides API info.
async fn root_handler(rpc_path: String) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Filecoin MCP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "transport": "HTTP",
        "endpoints": {
            "rpc": rpc_path,
            "sse": rpc_path,
            "messages": MESSAGES_PATH,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0"
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Body returned when a request cannot be handled at all.
fn internal_error_body() -> JsonRpcResponse {
    JsonRpcResponse::internal_error(Some(serde_json::Value::Null), "Internal server error")
}

/// Handle stateless JSON-RPC requests.
#[instrument(skip_all, fields(method))]
async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            error!("Error handling MCP request: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(internal_error_body())).into_response();
        }
    };

    tracing::Span::current().record("method", request.method.as_str());
    info!("Received JSON-RPC request: {}", request.method);

    match process_request(&state, request).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Open a legacy SSE session.
async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Received GET request (establishing SSE stream)");

    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::unbounded_channel();

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?sessionId={}", MESSAGES_PATH, session_id));
    if tx.send(endpoint).is_err() {
        warn!("SSE stream for session {} closed before start", session_id);
    }

    state
        .sessions
        .write()
        .await
        .insert(session_id.clone(), tx.clone());
    info!("SSE transport connected for session {}", session_id);

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        tx.closed().await;
        sessions.write().await.remove(&session_id);
        info!("SSE transport closed for session {}", session_id);
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle a JSON-RPC message posted for an SSE session.
async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Response {
    info!("Received POST request to {}", MESSAGES_PATH);

    let Some(session_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        error!("No session ID provided in request URL");
        return (StatusCode::BAD_REQUEST, "Missing sessionId parameter").into_response();
    };

    let Some(sender) = state.sessions.read().await.get(&session_id).cloned() else {
        error!("No active transport found for session ID: {}", session_id);
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Invalid message for session {}: {}", session_id, e);
            return (StatusCode::BAD_REQUEST, format!("Invalid message: {}", e)).into_response();
        }
    };

    if let Some(response) = process_request(&state, request).await {
        let delivered = serde_json::to_string(&response)
            .ok()
            .map(|data| sender.send(Event::default().event("message").data(data)).is_ok())
            .unwrap_or(false);
        if !delivered {
            error!("Error handling request for session {}", session_id);
            state.sessions.write().await.remove(&session_id);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error handling request").into_response();
        }
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

/// Process a JSON-RPC request. Notifications produce no response.
async fn process_request(state: &AppState, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::invalid_request(request.id));
    }

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(state, request),

        "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),

        "tools/list" => handle_tools_list(state, request),

        "tools/call" => handle_tools_call(state, request).await,

        method if method.starts_with("notifications/") => {
            info!("Received notification: {}", method);
            return None;
        }

        _ => {
            warn!("Unknown method: {}", request.method);
            JsonRpcResponse::method_not_found(request.id)
        }
    };

    Some(response)
}

/// Handle initialize request.
fn handle_initialize(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let protocol_version = request
        .params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    info!("Processing initialize request ({})", protocol_version);

    let result = serde_json::json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": state.server.name(),
            "version": state.server.version()
        },
        "instructions": INSTRUCTIONS
    });

    JsonRpcResponse::success(request.id, result)
}

/// Handle tools/list request.
fn handle_tools_list(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let tools = state.server.list_tools();
    JsonRpcResponse::success(request.id, serde_json::json!({ "tools": tools }))
}

/// Handle tools/call request.
async fn handle_tools_call(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    let params = match request.params {
        Some(p) => p,
        None => return JsonRpcResponse::invalid_params(request.id, "Missing params"),
    };

    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n.to_string(),
        None => return JsonRpcResponse::invalid_params(request.id, "Missing tool name"),
    };
    info!("Processing tools/call request: {}", name);

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or(serde_json::json!({}));

    match state.server.call_tool(&name, arguments).await {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(e) => JsonRpcResponse::invalid_params(request.id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::core::config::FilecoinConfig;
    use crate::domains::tools::definitions::filecoin::testing::spawn_fake_api;
    use serde_json::{Value, json};
    use std::time::Duration;

    async fn spawn_server() -> (String, AppState) {
        let api = spawn_fake_api().await;
        let mut config = Config::default();
        config.filecoin = FilecoinConfig::with_base_url(&api);

        let state = AppState::new(McpServer::new(config).unwrap());
        let app = HttpTransport::new(HttpConfig::default()).router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    async fn rpc(base: &str, body: Value) -> Value {
        reqwest::Client::new()
            .post(format!("{}/mcp", base))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    /// Read SSE chunks until `needle` shows up.
    async fn read_until(response: &mut reqwest::Response, buffer: &mut String, needle: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !buffer.contains(needle) {
            let chunk = tokio::time::timeout_at(deadline, response.chunk())
                .await
                .expect("timed out waiting for SSE data")
                .unwrap()
                .expect("SSE stream ended");
            buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (base, _) = spawn_server().await;
        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let (base, _) = spawn_server().await;

        let response = rpc(
            &base,
            json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": { "protocolVersion": "2025-03-26" }
            }),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(response["result"]["serverInfo"]["name"], "filecoin-mcp");
        assert_eq!(response["result"]["instructions"], INSTRUCTIONS);

        let response = rpc(&base, json!({ "jsonrpc": "2.0", "id": 2, "method": "initialize" })).await;
        assert_eq!(response["result"]["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let (base, _) = spawn_server().await;

        let response = rpc(&base, json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })).await;
        assert_eq!(response["result"]["tools"][0]["name"], "minerPenalty");

        let response = rpc(
            &base,
            json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "minerPenalty", "arguments": { "minerID": "f0999" } }
            }),
        )
        .await;
        assert_eq!(response["id"], 2);
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("is not miner"));
    }

    #[tokio::test]
    async fn test_rmcp_client_round_trip() {
        use crate::client::{ConnectionRegistry, MinerPenaltyTool, ProviderDescriptor};
        use crate::client::tools::MinerPenaltyInput;

        let (base, _) = spawn_server().await;
        let registry = Arc::new(ConnectionRegistry::with_rmcp(vec![
            ProviderDescriptor::http("filecoin-mcp", format!("{}/mcp", base)).with_timeout_ms(5000),
        ]));

        let report = registry.connect_all().await;
        assert_eq!(report.connected, vec!["filecoin-mcp".to_string()]);
        let tools = registry.operations("filecoin-mcp").await.unwrap();
        assert_eq!(tools[0].name, "minerPenalty");

        let penalty = MinerPenaltyTool::new(registry.clone());
        let out = penalty
            .penalty(MinerPenaltyInput { miner_id: "f01234".to_string() })
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["miner"], "f01234");
        assert_eq!(value["penalty"], "12.5");

        let out = penalty
            .penalty(MinerPenaltyInput { miner_id: "f0999".to_string() })
            .await
            .unwrap();
        assert!(out.starts_with("`f0999` is not miner"));

        registry.shutdown().await;
        let after = penalty
            .penalty(MinerPenaltyInput { miner_id: "f01234".to_string() })
            .await;
        assert!(after.is_err());
    }

    #[tokio::test]
    async fn test_notification_is_accepted_without_body() {
        let (base, _) = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{}/mcp", base))
            .json(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        assert!(response.text().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_internal_error() {
        let (base, _) = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{}/mcp", base))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], -32603);
        assert_eq!(body["error"]["message"], "Internal server error");
        assert!(body["id"].is_null());
        assert!(body.as_object().unwrap().contains_key("id"));
    }

    #[tokio::test]
    async fn test_non_utf8_body_is_internal_error() {
        let (base, _) = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("{}/mcp", base))
            .header("content-type", "application/json")
            .body(vec![0xff, 0xfe, b'{', 0x80])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], -32603);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (base, _) = spawn_server().await;
        let response = rpc(&base, json!({ "jsonrpc": "2.0", "id": 7, "method": "resources/list" })).await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_messages_requires_known_session() {
        let (base, _) = spawn_server().await;
        let client = reqwest::Client::new();
        let message = json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" });

        let response = client
            .post(format!("{}/messages", base))
            .json(&message)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(response.text().await.unwrap(), "Missing sessionId parameter");

        let response = client
            .post(format!("{}/messages?sessionId=nope", base))
            .json(&message)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        assert_eq!(response.text().await.unwrap(), "Session not found");
    }

    #[tokio::test]
    async fn test_sse_session_round_trip() {
        let (base, state) = spawn_server().await;

        let mut stream = reqwest::get(format!("{}/mcp", base)).await.unwrap();
        let mut buffer = String::new();
        read_until(&mut stream, &mut buffer, "sessionId=").await;
        read_until(&mut stream, &mut buffer, "\n\n").await;

        assert!(buffer.contains("event: endpoint"));
        let endpoint = buffer
            .lines()
            .find_map(|l| l.strip_prefix("data: "))
            .unwrap()
            .trim()
            .to_string();
        assert!(endpoint.starts_with("/messages?sessionId="));
        assert_eq!(state.session_count().await, 1);

        let response = reqwest::Client::new()
            .post(format!("{}{}", base, endpoint))
            .json(&json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);

        read_until(&mut stream, &mut buffer, "minerPenalty").await;
        assert!(buffer.contains("event: message"));
    }

    #[tokio::test]
    async fn test_closed_session_is_internal_error_and_removed() {
        let (base, state) = spawn_server().await;
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        state.sessions.write().await.insert("gone".to_string(), tx);

        let response = reqwest::Client::new()
            .post(format!("{}/messages?sessionId=gone", base))
            .json(&json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.session_count().await, 0);
    }
}
