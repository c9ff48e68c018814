//! CLI command implementations

pub mod export;

use crate::app::ExportContext;
use crate::cli::Cli;
use crate::error::Result;

pub fn run(ctx: &ExportContext, cli: &Cli) -> Result<()> {
    export::run(ctx, &cli.selected_exports(), cli.quiet)
}
