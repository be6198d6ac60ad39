//! Provider configuration.
//!
//! Providers are described in a JSON array (by default `./mcp.json`, or the
//! file named by `MCP_SERVERS_PATH`). Field names follow the camelCase form
//! used by MCP client configuration files:
//!
//! ```json
//! [
//!   {
//!     "name": "filecoin-mcp",
//!     "urlOrCommand": "http://127.0.0.1:3002/mcp",
//!     "transportType": "http",
//!     "authToken": "secret",
//!     "connectionTimeout": 10000,
//!     "include": ["miner*"]
//!   }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::{ClientError, ClientResult};

/// Default provider file when `MCP_SERVERS_PATH` is unset.
pub const DEFAULT_SERVERS_PATH: &str = "./mcp.json";

/// Default handshake timeout in milliseconds.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;

/// Default number of extra handshake attempts when retry is configured.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between handshake attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// How the client reaches a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Streamable HTTP; `urlOrCommand` is the endpoint URL.
    Http,
    /// Spawned subprocess speaking MCP over stdin/stdout; `urlOrCommand` is the program.
    Stdio,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Stdio => f.write_str("stdio"),
        }
    }
}

/// Retry settings for the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    /// Maximum number of retries after the first attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Delay between attempts in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,
}

/// Resolved retry policy for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Total number of handshake attempts.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// One configured MCP provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Unique provider name; the registry key.
    pub name: String,

    /// Endpoint URL (http) or program to spawn (stdio).
    pub url_or_command: String,

    /// Transport used to reach the provider.
    pub transport_type: TransportType,

    /// Bearer token sent as `Authorization` on HTTP transports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Handshake timeout in milliseconds (default 30000).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<u64>,

    /// Nested retry settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetrySettings>,

    /// Legacy top-level retry count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Legacy top-level retry delay in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,

    /// Log level hint for this provider. Parsed but not applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Extra arguments for stdio providers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment for stdio providers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Extra HTTP headers for http providers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Glob patterns; when non-empty only matching tools are kept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Glob patterns of tools to drop. Applied after `include`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let headers: Vec<&String> = self.headers.keys().collect();
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("url_or_command", &self.url_or_command)
            .field("transport_type", &self.transport_type)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("connection_timeout", &self.connection_timeout)
            .field("retry", &self.retry_policy())
            .field("args", &self.args)
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .field("header_keys", &headers)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .finish()
    }
}

impl ProviderDescriptor {
    /// Create an HTTP provider descriptor.
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(name, url, TransportType::Http)
    }

    /// Create a stdio provider descriptor.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(name, command, TransportType::Stdio)
    }

    fn new(
        name: impl Into<String>,
        url_or_command: impl Into<String>,
        transport_type: TransportType,
    ) -> Self {
        Self {
            name: name.into(),
            url_or_command: url_or_command.into(),
            transport_type,
            auth_token: None,
            connection_timeout: None,
            retry: None,
            max_retries: None,
            retry_delay: None,
            log_level: None,
            args: Vec::new(),
            env: HashMap::new(),
            headers: HashMap::new(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Set the stdio arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the bearer token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the handshake timeout in milliseconds.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.connection_timeout = Some(ms);
        self
    }

    /// Set nested retry settings.
    pub fn with_retry(mut self, max_retries: u32, retry_delay_ms: u64) -> Self {
        self.retry = Some(RetrySettings {
            max_retries: Some(max_retries),
            retry_delay: Some(retry_delay_ms),
        });
        self
    }

    /// Set include/exclude filters.
    pub fn with_filters(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.include = include;
        self.exclude = exclude;
        self
    }

    /// Handshake timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(
            self.connection_timeout
                .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_MS),
        )
    }

    /// Retry policy for the handshake.
    ///
    /// Retries only happen when the descriptor asks for them, either through
    /// the nested `retry` block or the legacy top-level fields.
    pub fn retry_policy(&self) -> RetryPolicy {
        let nested = self.retry.as_ref();
        let configured = nested.is_some() || self.max_retries.is_some();
        if !configured {
            return RetryPolicy::none();
        }

        let max_retries = nested
            .and_then(|r| r.max_retries)
            .or(self.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let delay_ms = nested
            .and_then(|r| r.retry_delay)
            .or(self.retry_delay)
            .unwrap_or(DEFAULT_RETRY_DELAY_MS);

        RetryPolicy {
            max_retries,
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Whether a tool name passes this provider's include/exclude filters.
    pub fn allows_tool(&self, tool_name: &str) -> bool {
        if !self.include.is_empty() && !matches_any(&self.include, tool_name) {
            return false;
        }
        !matches_any(&self.exclude, tool_name)
    }

    /// Check the descriptor for obviously unusable values.
    pub fn validate(&self) -> ClientResult<()> {
        if self.name.trim().is_empty() {
            return Err(ClientError::config("provider name must not be empty"));
        }
        if self.url_or_command.trim().is_empty() {
            return Err(ClientError::config(format!(
                "provider '{}' has an empty urlOrCommand",
                self.name
            )));
        }
        for pattern in self.include.iter().chain(&self.exclude) {
            glob::Pattern::new(pattern).map_err(|e| {
                ClientError::config(format!(
                    "provider '{}' has an invalid tool pattern '{}': {}",
                    self.name, pattern, e
                ))
            })?;
        }
        Ok(())
    }
}

fn matches_any(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|pattern| match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(name),
        Err(_) => pattern == name,
    })
}

/// Resolve the provider file path from `MCP_SERVERS_PATH`.
pub fn servers_path_from_env() -> PathBuf {
    dotenvy::dotenv().ok();
    std::env::var("MCP_SERVERS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SERVERS_PATH))
}

/// Parse a provider list from JSON text.
pub fn parse_providers(json: &str) -> ClientResult<Vec<ProviderDescriptor>> {
    let providers: Vec<ProviderDescriptor> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    for provider in &providers {
        provider.validate()?;
        if !seen.insert(provider.name.as_str()) {
            return Err(ClientError::config(format!(
                "duplicate provider name '{}'",
                provider.name
            )));
        }
        if provider.log_level.is_some() {
            debug!(
                "Provider '{}' sets logLevel; per-provider levels are not applied",
                provider.name
            );
        }
    }

    Ok(providers)
}

/// Load providers from a JSON file.
pub fn load_providers(path: impl AsRef<Path>) -> ClientResult<Vec<ProviderDescriptor>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        warn!("Failed to read provider file {:?}: {}", path, e);
        e
    })?;
    let providers = parse_providers(&text)?;
    info!("Loaded {} MCP provider(s) from {:?}", providers.len(), path);
    Ok(providers)
}

/// Load providers from the file named by `MCP_SERVERS_PATH`.
pub fn load_providers_from_env() -> ClientResult<Vec<ProviderDescriptor>> {
    load_providers(servers_path_from_env())
}
