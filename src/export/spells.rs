//! Spell export with the implied-targeting rewrite.

use std::path::Path;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::Result;
use crate::export::writer::{write_file, write_statement};
use crate::rules::{RuleSnapshot, toggle_label};

pub const SPELLS_QUERY: &str = "SELECT * FROM spells_new ORDER BY id";

/// Column holding the spell's target type.
pub const TARGET_TYPE_COLUMN: &str = "targettype";

pub const TARGET_PET: &str = "14";
pub const TARGET_PET_MASTER: &str = "38";
pub const TARGET_SELF: &str = "6";

/// Rewrite pet and pet-master target types to self.
pub fn apply_implied_targeting(target_type: &mut String) {
    if target_type == TARGET_PET || target_type == TARGET_PET_MASTER {
        *target_type = TARGET_SELF.to_string();
    }
}

/// Write `spells_us.txt` from the content database.
pub fn export(content: &Connection, rules: &RuleSnapshot, path: &Path) -> Result<usize> {
    info!(
        "Exporting Spells. Implied Targeting Mutations {}",
        toggle_label(rules.implied_targeting)
    );

    write_file(path, |out| {
        let mut stmt = content.prepare(SPELLS_QUERY)?;

        let target_index = if rules.implied_targeting {
            match stmt.column_index(TARGET_TYPE_COLUMN) {
                Ok(index) => Some(index),
                Err(_) => {
                    warn!(
                        column = TARGET_TYPE_COLUMN,
                        "spells table has no target type column, exporting unmodified"
                    );
                    None
                }
            }
        } else {
            None
        };

        write_statement(&mut stmt, out, |fields| {
            if let Some(index) = target_index {
                if let Some(value) = fields.get_mut(index) {
                    apply_implied_targeting(value);
                }
            }
        })
    })
}
