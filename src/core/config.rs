//! Configuration management for the Filecoin MCP server.
//!
//! Settings are read from environment variables (after loading `.env`);
//! the CLI may then override the transport.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Default timeout for requests to the Filecoin API.
pub const DEFAULT_FILECOIN_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Remote Filecoin API configuration.
    pub filecoin: FilecoinConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// How penalty responses are rendered into tool output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyFormat {
    /// The response body as a JSON string.
    #[default]
    Json,
    /// The response body as CSV, minus the configured columns.
    Csv,
}

impl FromStr for PenaltyFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(Error::config(format!(
                "unknown FILECOIN_RESPONSE_FORMAT '{}' (expected json or csv)",
                other
            ))),
        }
    }
}

impl fmt::Display for PenaltyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Configuration for the remote Filecoin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilecoinConfig {
    /// Base URL; `/penalty?miner=<id>` is appended.
    pub base_url: Option<String>,

    /// Output rendering for penalty responses.
    pub response_format: PenaltyFormat,

    /// Columns removed from CSV responses.
    pub csv_drop_columns: Vec<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FilecoinConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            response_format: PenaltyFormat::default(),
            csv_drop_columns: Vec::new(),
            timeout_secs: DEFAULT_FILECOIN_TIMEOUT_SECS,
        }
    }
}

impl FilecoinConfig {
    /// Configuration pointing at the given API.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// The base URL, or a configuration error if it is unset.
    pub fn require_base_url(&self) -> Result<&str> {
        match self.base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(Error::config("FILECOIN_URL is not defined")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "filecoin-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            filecoin: FilecoinConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Server settings use the `MCP_` prefix, API settings the `FILECOIN_`
    /// prefix. Unparseable optional values fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();

        if let Ok(url) = std::env::var("FILECOIN_URL") {
            config.filecoin.base_url = Some(url);
        }

        if let Ok(format) = std::env::var("FILECOIN_RESPONSE_FORMAT") {
            match format.parse() {
                Ok(format) => config.filecoin.response_format = format,
                Err(e) => warn!("{}; using json", e),
            }
        }

        if let Ok(columns) = std::env::var("FILECOIN_CSV_DROP_COLUMNS") {
            config.filecoin.csv_drop_columns = columns
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(timeout) = std::env::var("FILECOIN_TIMEOUT_SECS") {
            config.filecoin.timeout_secs = timeout
                .parse()
                .unwrap_or(DEFAULT_FILECOIN_TIMEOUT_SECS);
        }

        config
    }

    /// Check settings the server cannot start without.
    pub fn validate(&self) -> Result<()> {
        let url = self.filecoin.require_base_url()?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!(
                "FILECOIN_URL must be an http(s) URL, got '{}'",
                url
            )));
        }
        info!("FILECOIN_URL: {}", url);
        Ok(())
    }
}
