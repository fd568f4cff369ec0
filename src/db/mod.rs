//! Database module
//!
//! SQLite connection pool and schema migrations for the food catalog.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
