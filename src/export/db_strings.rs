//! Localized UI string export.

use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::export::writer::{write_file, write_query};

pub const DB_STRINGS_QUERY: &str = "SELECT * FROM db_str ORDER BY id, type";
pub const DB_STRINGS_HEADER: &str = "Major^Minor^String(New)";

/// Write `dbstr_us.txt`. Reads from the primary database.
pub fn export(db: &Connection, path: &Path) -> Result<usize> {
    info!("Exporting DB Strings");

    write_file(path, |out| {
        out.write_header(DB_STRINGS_HEADER)?;
        write_query(db, DB_STRINGS_QUERY, out)
    })
}
