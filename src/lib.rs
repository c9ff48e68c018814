//! client-export - Client Files Export Utility
//!
//! Regenerates the flat `^`-delimited reference files the game client reads
//! (spells, skill caps, base data, db strings) from the server database.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod rules;
pub mod storage;
pub mod test_utils;
pub mod utils;

pub use error::{ExportError, Result};
