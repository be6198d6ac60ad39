//! Filecoin tools backed by the remote penalty API.

pub mod api;
pub mod csv;
pub mod penalty;

#[cfg(test)]
pub(crate) mod testing;

pub use api::FilecoinApi;
pub use penalty::{MinerPenaltyParams, MinerPenaltyTool};
