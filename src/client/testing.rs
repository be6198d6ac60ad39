//! In-memory providers for exercising the registry and adapters.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, Tool};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::config::ProviderDescriptor;
use super::connection::{Connection, Connector};
use super::error::{ClientError, ClientResult};

/// Build a tool definition with an empty object schema.
pub fn tool(name: &str, description: &str) -> Tool {
    let schema = serde_json::json!({ "type": "object", "properties": {} });
    let schema = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Tool {
        name: name.to_string().into(),
        description: Some(description.to_string().into()),
        input_schema: Arc::new(schema),
        annotations: None,
        output_schema: None,
        icons: None,
        meta: None,
        title: None,
    }
}

/// How a fake provider behaves.
#[derive(Clone)]
pub struct FakeProvider {
    pub tools: Vec<Tool>,
    pub fail_handshake: bool,
    pub fail_discovery: bool,
    pub handshake_delay: Option<Duration>,
    /// Handshakes that fail before the provider starts succeeding.
    pub failures_before_success: usize,
    pub result: Option<CallToolResult>,
}

impl FakeProvider {
    pub fn with_tools(tools: Vec<Tool>) -> Self {
        Self {
            tools,
            fail_handshake: false,
            fail_discovery: false,
            handshake_delay: None,
            failures_before_success: 0,
            result: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_handshake: true,
            ..Self::with_tools(Vec::new())
        }
    }

    pub fn returning(mut self, result: CallToolResult) -> Self {
        self.result = Some(result);
        self
    }
}

/// A fake session. Records calls and whether it was closed.
pub struct FakeConnection {
    provider: String,
    profile: FakeProvider,
    pub closed: AtomicBool,
    pub calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

#[async_trait]
impl Connection for FakeConnection {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn list_tools(&self) -> ClientResult<Vec<Tool>> {
        if self.profile.fail_discovery {
            return Err(ClientError::discovery(&self.provider, "list failed"));
        }
        Ok(self.profile.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> ClientResult<CallToolResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::invocation(name, "transport closed"));
        }
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        Ok(self
            .profile
            .result
            .clone()
            .unwrap_or_else(|| CallToolResult::success(vec![Content::text("ok")])))
    }

    async fn close(&self) -> ClientResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector serving [`FakeProvider`]s by name and counting handshakes.
#[derive(Default)]
pub struct FakeConnector {
    providers: Mutex<HashMap<String, FakeProvider>>,
    handshakes: Mutex<HashMap<String, usize>>,
    total_handshakes: AtomicUsize,
    pub opened: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, provider: FakeProvider) -> Self {
        self.set(name, provider);
        self
    }

    /// Replace a provider's behaviour, e.g. to bring it back online.
    pub fn set(&self, name: &str, provider: FakeProvider) {
        self.providers
            .lock()
            .unwrap()
            .insert(name.to_string(), provider);
    }

    pub fn handshakes(&self, name: &str) -> usize {
        self.handshakes
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_handshakes(&self) -> usize {
        self.total_handshakes.load(Ordering::SeqCst)
    }

    /// The most recent session opened for a provider.
    pub fn last_opened(&self, name: &str) -> Option<Arc<FakeConnection>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.provider == name)
            .cloned()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, descriptor: &ProviderDescriptor) -> ClientResult<Arc<dyn Connection>> {
        self.total_handshakes.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut counts = self.handshakes.lock().unwrap();
            let count = counts.entry(descriptor.name.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let profile = self
            .providers
            .lock()
            .unwrap()
            .get(&descriptor.name)
            .cloned()
            .ok_or_else(|| ClientError::connection(&descriptor.name, "unknown provider"))?;

        if let Some(delay) = profile.handshake_delay {
            tokio::time::sleep(delay).await;
        }
        if profile.fail_handshake || attempt <= profile.failures_before_success {
            return Err(ClientError::connection(&descriptor.name, "connection refused"));
        }

        let connection = Arc::new(FakeConnection {
            provider: descriptor.name.clone(),
            profile,
            closed: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        });
        self.opened.lock().unwrap().push(connection.clone());
        Ok(connection)
    }
}
