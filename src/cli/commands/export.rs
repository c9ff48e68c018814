//! client-export [EXPORT] - Regenerate client files

use console::style;
use serde::Serialize;

use crate::app::ExportContext;
use crate::cli::output::{
    HumanLayout, OutputFormat, RobotStatus, emit_human, emit_json, robot_ok, robot_with_status,
};
use crate::error::Result;
use crate::export::{ExportDriver, ExportKind, ExportReport, ExportStatus};
use crate::rules::RuleSnapshot;

/// Everything a run produced, as reported to the user.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rules: RuleSnapshot,
    pub exports: Vec<ExportReport>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.exports.iter().filter(|report| report.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.exports.len() - self.completed()
    }

    fn layout(&self) -> HumanLayout {
        let mut layout = HumanLayout::new();
        layout.title("Client Files Export");
        for report in &self.exports {
            let outcome = match &report.status {
                ExportStatus::Ok => format!(
                    "{} {} rows -> {}",
                    style("ok").green(),
                    report.rows,
                    report.path.display()
                ),
                ExportStatus::Failed { message, .. } => {
                    format!("{} {message}", style("skipped").red())
                }
            };
            layout.kv(report.kind.as_str(), &outcome);
        }
        layout.push_line(String::new()).push_line(format!(
            "{} completed, {} failed",
            self.completed(),
            self.failed()
        ));
        layout
    }
}

/// Run the selected exports and report. Per-export failures do not fail the run.
pub fn run(ctx: &ExportContext, kinds: &[ExportKind], quiet: bool) -> Result<()> {
    let driver = ExportDriver::from_context(ctx);
    let summary = RunSummary {
        rules: driver.rules(),
        exports: driver.run_all(kinds),
    };

    match ctx.output_format {
        OutputFormat::Json => {
            let response = if summary.failed() == 0 {
                robot_ok(&summary)
            } else {
                robot_with_status(
                    RobotStatus::Partial {
                        completed: summary.completed(),
                        failed: summary.failed(),
                    },
                    &summary,
                )
            };
            emit_json(&response)
        }
        OutputFormat::Human => {
            if !quiet {
                emit_human(summary.layout());
            }
            Ok(())
        }
    }
}
