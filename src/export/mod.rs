//! Client file exporters and the driver that runs them.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{error, info};

use crate::app::ExportContext;
use crate::error::ExportError;
use crate::rules::{RuleSnapshot, RuleStore};

pub mod base_data;
pub mod db_strings;
pub mod skill_caps;
pub mod spells;
pub mod writer;

/// One client file export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Spells,
    Skills,
    #[value(name = "basedata")]
    BaseData,
    #[value(name = "dbstring")]
    DbString,
}

impl ExportKind {
    /// Every export, in the order a full run executes them.
    pub const ALL: [Self; 4] = [Self::Spells, Self::Skills, Self::BaseData, Self::DbString];

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Spells => "spells_us.txt",
            Self::Skills => "SkillCaps.txt",
            Self::BaseData => "BaseData.txt",
            Self::DbString => "dbstr_us.txt",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spells => "spells",
            Self::Skills => "skills",
            Self::BaseData => "basedata",
            Self::DbString => "dbstring",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Spells => "spells",
            Self::Skills => "skill caps",
            Self::BaseData => "base data",
            Self::DbString => "db strings",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExportStatus {
    Ok,
    Failed { code: String, message: String },
}

/// Outcome of a single export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub kind: ExportKind,
    pub path: PathBuf,
    pub rows: usize,
    pub status: ExportStatus,
}

impl ExportReport {
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, ExportStatus::Ok)
    }
}

/// Runs exports against a content and a primary connection.
///
/// Spells, skill caps and base data read the content database; db strings
/// and every rule read the primary database. Both may be the same handle.
pub struct ExportDriver<'a> {
    content: &'a Connection,
    primary: &'a Connection,
    export_dir: PathBuf,
    rules: RuleSnapshot,
}

impl<'a> ExportDriver<'a> {
    pub fn new(
        content: &'a Connection,
        primary: &'a Connection,
        export_dir: impl Into<PathBuf>,
        rules: RuleSnapshot,
    ) -> Self {
        Self {
            content,
            primary,
            export_dir: export_dir.into(),
            rules,
        }
    }

    /// Build a driver from the app context, reading rules once.
    pub fn from_context(ctx: &'a ExportContext) -> Self {
        let store = RuleStore::new(ctx.primary(), ctx.config.rules.ruleset_id);
        let rules = RuleSnapshot::load(&store);
        Self::new(ctx.content(), ctx.primary(), ctx.config.export_dir(), rules)
    }

    pub const fn rules(&self) -> RuleSnapshot {
        self.rules
    }

    pub fn output_path(&self, kind: ExportKind) -> PathBuf {
        self.export_dir.join(kind.file_name())
    }

    /// Run one export. Failures are logged and reported, never propagated.
    pub fn run(&self, kind: ExportKind) -> ExportReport {
        let path = self.output_path(kind);
        let result = match kind {
            ExportKind::Spells => spells::export(self.content, &self.rules, &path),
            ExportKind::Skills => skill_caps::export(self.content, &self.rules, &path),
            ExportKind::BaseData => base_data::export(self.content, &path),
            ExportKind::DbString => db_strings::export(self.primary, &path),
        };

        match result {
            Ok(rows) => {
                info!(export = %kind, rows, path = %path.display(), "export complete");
                ExportReport {
                    kind,
                    path,
                    rows,
                    status: ExportStatus::Ok,
                }
            }
            Err(err) => {
                if matches!(err, ExportError::OutputUnavailable { .. }) {
                    error!(
                        error = %err,
                        "Unable to open export/{} to write, skipping.",
                        kind.file_name()
                    );
                } else {
                    error!(
                        error = %err,
                        "Query to database failed, unable to export {}.",
                        kind.description()
                    );
                }
                ExportReport {
                    kind,
                    path,
                    rows: 0,
                    status: ExportStatus::Failed {
                        code: err.code().to_string(),
                        message: err.to_string(),
                    },
                }
            }
        }
    }

    /// Run exports in order; one failing export does not stop the rest.
    pub fn run_all(&self, kinds: &[ExportKind]) -> Vec<ExportReport> {
        kinds.iter().map(|kind| self.run(*kind)).collect()
    }
}
