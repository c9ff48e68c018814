//! Base data export: per-level, per-class base stats.

use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::export::writer::{write_file, write_query};

pub const BASE_DATA_QUERY: &str = "SELECT * FROM base_data ORDER BY level, class";

/// Write `BaseData.txt` from the content database.
pub fn export(content: &Connection, path: &Path) -> Result<usize> {
    info!("Exporting Base Data");

    write_file(path, |out| write_query(content, BASE_DATA_QUERY, out))
}
