//! Command-line interface for client-export

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::warn;

use crate::export::ExportKind;

pub mod commands;
pub mod output;

pub use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "client-export",
    version,
    about = "Client Files Export Utility",
    long_about = "Regenerates the client reference files (spells, skill caps, base data, \
                  db strings) under <server>/export from the server database."
)]
pub struct Cli {
    /// Export to run (spells, skills, basedata, dbstring); any other value
    /// or none runs every export in order
    pub export: Option<String>,

    /// Path to config file
    #[arg(long, env = "CLIENT_EXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress logs and the run summary
    #[arg(short, long)]
    pub quiet: bool,

    /// JSON logs and a JSON run summary on stdout
    #[arg(long)]
    pub robot: bool,
}

impl Cli {
    pub const fn output_format(&self) -> OutputFormat {
        if self.robot {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    /// Exports selected on the command line, in execution order.
    pub fn selected_exports(&self) -> Vec<ExportKind> {
        let Some(name) = self.export.as_deref() else {
            return ExportKind::ALL.to_vec();
        };
        match ExportKind::from_str(name, false) {
            Ok(kind) => vec![kind],
            Err(_) => {
                warn!(export = name, "Unknown export, running all exports");
                ExportKind::ALL.to_vec()
            }
        }
    }
}
