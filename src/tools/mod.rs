//! Plateful Tools module
//!
//! MCP tool implementations: portion estimation, food catalog management and
//! service status.

pub mod estimate;
pub mod foods;
pub mod status;
