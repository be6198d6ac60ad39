//! Transport layer for the MCP server.
//!
//! - **STDIO**: standard input/output - feature: `stdio`
//! - **HTTP**: stateless JSON-RPC over `POST /mcp` plus the legacy SSE
//!   stream (`GET /mcp`, `POST /messages`) - feature: `http`
//!
//! Each transport handles the connection lifecycle and delegates
//! message processing to the MCP server handler.

mod config;
mod error;
mod service;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::{DEFAULT_HTTP_PORT, TransportConfig, TransportKind};
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::HttpConfig;
