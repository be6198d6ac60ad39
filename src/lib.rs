//! Filecoin MCP
//!
//! Both sides of a Model Context Protocol deployment:
//!
//! - **client**: loads MCP provider descriptors, keeps one live connection
//!   per provider in a [`client::ConnectionRegistry`], and adapts remote
//!   tools into chat tools for a language model
//! - **core**: configuration, error handling, logging, the MCP server
//!   handler and its stdio/HTTP transports
//! - **domains**: the server's tools (`minerPenalty`)
//!
//! # Example
//!
//! ```rust,no_run
//! use filecoin_mcp::client::{ConnectionRegistry, ToolNamespace, load_providers_from_env};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(ConnectionRegistry::with_rmcp(load_providers_from_env()?));
//!     registry.connect_all().await;
//!
//!     let tools = ToolNamespace::load(registry.clone()).await;
//!     let answer = tools
//!         .call("minerPenalty", serde_json::json!({ "minerID": "f010023" }))
//!         .await?;
//!     println!("{}", answer);
//!
//!     registry.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod core;
pub mod domains;

pub use core::{Config, Error, McpServer, Result};
