//! SQLite persistence for users and their gesture mappings.

mod connection;
pub mod helpers;
mod migrations;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use models::{GestureMappingRow, User};
