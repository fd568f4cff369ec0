//! Plateful Library
//!
//! Portion, price and nutrition estimation for food detected on a tray photo,
//! plus the SQLite food catalog it prices against.

pub mod build_info;
pub mod catalog;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod portion;
pub mod tools;
