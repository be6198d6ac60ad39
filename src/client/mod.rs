//! MCP client side: provider configuration, the connection registry and
//! the adapters that turn remote tools into chat tools.

pub mod config;
pub mod connection;
pub mod error;
pub mod invoke;
pub mod registry;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ProviderDescriptor, TransportType, load_providers, load_providers_from_env};
pub use connection::{Connection, Connector, RmcpConnector};
pub use error::{ClientError, ClientResult};
pub use invoke::invoke;
pub use registry::{AggregatedOperation, ConnectReport, ConnectionRegistry};
pub use tools::{ChatTool, MinerPenaltyTool, RemoteTool, ToolNamespace};
