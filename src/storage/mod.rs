//! Storage layer for client-export
//!
//! Read-only SQLite handles for the primary (rules) and content databases.

pub mod sqlite;

pub use sqlite::Database;
