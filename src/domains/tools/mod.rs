//! Tools domain module.
//!
//! - `definitions/` - tool implementations (one file per tool)
//! - `router.rs` - ToolRouter builder for the STDIO transport
//! - `registry.rs` - tool listing and HTTP dispatch
//! - `error.rs` - tool-specific error types
//!
//! A new tool needs a route in `router.rs` and a dispatch arm in
//! `registry.rs`; the server picks both up without changes.

pub mod definitions;
mod error;
mod registry;
pub mod router;

pub use error::ToolError;
pub use registry::ToolRegistry;
pub use router::build_tool_router;
