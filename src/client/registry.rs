//! Connection registry.
//!
//! Holds at most one live connection per configured provider together with
//! the tools that provider advertised. Connections and catalog live under a
//! single lock so their key sets always match: a provider is either fully
//! present (connection + non-empty tool list) or absent.

use rmcp::model::Tool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::config::ProviderDescriptor;
use super::connection::{Connection, Connector, RmcpConnector};
use super::error::{ClientError, ClientResult};

/// A tool in the aggregated namespace, with the provider that serves it.
#[derive(Debug, Clone)]
pub struct AggregatedOperation {
    pub provider: String,
    pub tool: Tool,
}

/// Outcome of one `connect_all` pass.
#[derive(Debug, Default)]
pub struct ConnectReport {
    /// Providers connected during this pass.
    pub connected: Vec<String>,
    /// Providers that were already connected.
    pub skipped: Vec<String>,
    /// Providers that failed, with the reason.
    pub failed: Vec<(String, ClientError)>,
}

impl ConnectReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<String, Arc<dyn Connection>>,
    catalog: HashMap<String, Vec<Tool>>,
}

impl RegistryState {
    fn insert(&mut self, name: &str, connection: Arc<dyn Connection>, tools: Vec<Tool>) {
        self.connections.insert(name.to_string(), connection);
        self.catalog.insert(name.to_string(), tools);
    }

    fn remove(&mut self, name: &str) {
        self.connections.remove(name);
        self.catalog.remove(name);
    }
}

/// Registry of MCP provider connections.
pub struct ConnectionRegistry {
    descriptors: Vec<ProviderDescriptor>,
    connector: Arc<dyn Connector>,
    state: RwLock<RegistryState>,
    /// Serializes `connect_all` passes.
    refresh: Mutex<()>,
    /// Completed passes. Lets refreshing callers join a pass that finished
    /// while they waited instead of running their own.
    passes: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create a registry over the given providers.
    ///
    /// Nothing is connected until [`connect_all`](Self::connect_all) or one
    /// of the refreshing accessors runs.
    pub fn new(descriptors: Vec<ProviderDescriptor>, connector: Arc<dyn Connector>) -> Self {
        Self {
            descriptors,
            connector,
            state: RwLock::new(RegistryState::default()),
            refresh: Mutex::new(()),
            passes: AtomicUsize::new(0),
        }
    }

    /// Create a registry that connects through rmcp.
    pub fn with_rmcp(descriptors: Vec<ProviderDescriptor>) -> Self {
        Self::new(descriptors, Arc::new(RmcpConnector::new()))
    }

    /// Configured providers, in order.
    pub fn descriptors(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// Number of `connect_all` passes completed so far.
    pub fn refresh_passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    /// Connect every provider that is not connected yet.
    ///
    /// Providers are handled one after another in configured order. A
    /// failure is logged and leaves no state for that provider; the pass
    /// always continues with the next one.
    #[instrument(skip(self))]
    pub async fn connect_all(&self) -> ConnectReport {
        let _guard = self.refresh.lock().await;
        self.run_pass().await
    }

    /// One pass over the providers. Callers hold the refresh guard.
    async fn run_pass(&self) -> ConnectReport {
        info!("Connecting to MCP servers...");

        let mut report = ConnectReport::default();
        for descriptor in &self.descriptors {
            let name = descriptor.name.as_str();
            if self.state.read().await.connections.contains_key(name) {
                debug!("Provider {} already connected, skipping", name);
                report.skipped.push(name.to_string());
                continue;
            }

            match self.connect_provider(descriptor).await {
                Ok((connection, tools)) => {
                    info!("Provider {} ready with {} tool(s)", name, tools.len());
                    self.state.write().await.insert(name, connection, tools);
                    report.connected.push(name.to_string());
                }
                Err(e) => {
                    warn!("Failed to connect to {}: {}", name, e);
                    self.state.write().await.remove(name);
                    report.failed.push((name.to_string(), e));
                }
            }
        }

        self.passes.fetch_add(1, Ordering::SeqCst);
        report
    }

    /// Handshake, then discover and filter tools.
    async fn connect_provider(
        &self,
        descriptor: &ProviderDescriptor,
    ) -> ClientResult<(Arc<dyn Connection>, Vec<Tool>)> {
        let connection = self.handshake(descriptor).await?;

        match self.discover(descriptor, connection.as_ref()).await {
            Ok(tools) => Ok((connection, tools)),
            Err(e) => {
                if let Err(close_err) = connection.close().await {
                    debug!(
                        "Closing half-open connection to {} failed: {}",
                        descriptor.name, close_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Run the handshake under the provider's timeout and retry policy.
    async fn handshake(&self, descriptor: &ProviderDescriptor) -> ClientResult<Arc<dyn Connection>> {
        let timeout = descriptor.timeout();
        let policy = descriptor.retry_policy();
        let attempts = policy.attempts();

        let mut last_error = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                debug!(
                    "Retrying {} (attempt {}/{}) after {:?}",
                    descriptor.name, attempt, attempts, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }

            let result = match tokio::time::timeout(timeout, self.connector.connect(descriptor)).await
            {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout {
                    provider: descriptor.name.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(connection) => return Ok(connection),
                Err(e) => {
                    if attempts > 1 {
                        warn!(
                            "Handshake attempt {}/{} for {} failed: {}",
                            attempt, attempts, descriptor.name, e
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ClientError::connection(&descriptor.name, "no handshake attempted")))
    }

    async fn discover(
        &self,
        descriptor: &ProviderDescriptor,
        connection: &dyn Connection,
    ) -> ClientResult<Vec<Tool>> {
        let timeout = descriptor.timeout();
        let tools = tokio::time::timeout(timeout, connection.list_tools())
            .await
            .map_err(|_| {
                ClientError::discovery(
                    &descriptor.name,
                    format!("tools/list timed out after {}ms", timeout.as_millis()),
                )
            })??;

        let advertised = tools.len();
        let tools: Vec<Tool> = tools
            .into_iter()
            .filter(|tool| descriptor.allows_tool(&tool.name))
            .collect();
        if tools.len() != advertised {
            debug!(
                "Provider {}: kept {} of {} tool(s) after filters",
                descriptor.name,
                tools.len(),
                advertised
            );
        }

        if tools.is_empty() {
            return Err(ClientError::NoOperations(descriptor.name.clone()));
        }
        Ok(tools)
    }

    /// The live connection for a provider, if any.
    pub async fn connection(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.state.read().await.connections.get(name).cloned()
    }

    /// The tools a provider advertised, if it is connected.
    pub async fn operations(&self, name: &str) -> Option<Vec<Tool>> {
        self.state.read().await.catalog.get(name).cloned()
    }

    /// All live connections, in configured provider order.
    pub async fn all_connections(&self) -> Vec<Arc<dyn Connection>> {
        let state = self.state.read().await;
        self.descriptors
            .iter()
            .filter_map(|d| state.connections.get(&d.name).cloned())
            .collect()
    }

    /// Every provider's tools merged by tool name.
    ///
    /// Providers are merged in configured order, so on a name collision the
    /// later provider's definition wins.
    pub async fn aggregated_operations(&self) -> BTreeMap<String, AggregatedOperation> {
        let state = self.state.read().await;
        let mut merged = BTreeMap::new();
        for descriptor in &self.descriptors {
            let Some(tools) = state.catalog.get(&descriptor.name) else {
                continue;
            };
            for tool in tools {
                if let Some(previous) = merged.insert(
                    tool.name.to_string(),
                    AggregatedOperation {
                        provider: descriptor.name.clone(),
                        tool: tool.clone(),
                    },
                ) {
                    debug!(
                        "Tool {} from {} replaced by {}",
                        tool.name, previous.provider, descriptor.name
                    );
                }
            }
        }
        merged
    }

    /// Number of configured providers.
    pub fn expected_provider_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Run `connect_all` if fewer providers are connected than configured.
    ///
    /// Returns whether this call ran a pass. Callers that find a pass in
    /// flight wait for it and reuse its outcome, so concurrent refreshes
    /// cost one attempt per missing provider.
    pub async fn refresh_if_incomplete(&self) -> bool {
        let seen = self.passes.load(Ordering::SeqCst);
        let live = self.all_connections().await.len();
        if live == self.expected_provider_count() {
            return false;
        }

        let _guard = self.refresh.lock().await;
        if self.passes.load(Ordering::SeqCst) != seen {
            debug!("Refresh already completed by a concurrent caller");
            return false;
        }
        debug!(
            "{} of {} providers connected, refreshing",
            live,
            self.expected_provider_count()
        );
        self.run_pass().await;
        true
    }

    /// Aggregated tools, refreshing the registry first if it is incomplete.
    pub async fn tools(&self) -> BTreeMap<String, AggregatedOperation> {
        self.refresh_if_incomplete().await;
        self.aggregated_operations().await
    }

    /// A provider's connection, refreshing the registry first if it is incomplete.
    pub async fn client(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.refresh_if_incomplete().await;
        self.connection(name).await
    }

    /// Close every live connection.
    ///
    /// The registry entries stay in place; calls racing the shutdown fail
    /// with the transport's own error.
    pub async fn shutdown(&self) {
        for connection in self.all_connections().await {
            info!("Shutting down MCP provider {}", connection.provider());
            if let Err(e) = connection.close().await {
                warn!("Failed to close {}: {}", connection.provider(), e);
            }
        }
    }
}
