//! Tool definitions module.
//!
//! Each tool is defined in its own file, grouped by backing service.

pub mod filecoin;

pub use filecoin::{FilecoinApi, MinerPenaltyParams, MinerPenaltyTool};
