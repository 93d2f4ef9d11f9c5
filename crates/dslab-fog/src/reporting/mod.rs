//! Reporting collaborators consuming the scenario report.
//!
//! Reporters only read the report; their failures are logged by [`emit_all`] and never reach the
//! simulation core.

pub mod chart;
pub mod console;
pub mod csv;
pub mod json;
pub mod telemetry;

use crate::context::SimulationContext;
use crate::core::error::ReportError;
use crate::core::metrics::ScenarioReport;
use crate::{log_debug, log_error};

/// Consumer of the final scenario report.
pub trait Reporter {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    fn emit(&mut self, report: &ScenarioReport) -> Result<(), ReportError>;
}

/// Passes the report to every reporter in order. Returns the number of reporters that failed.
pub fn emit_all(ctx: &SimulationContext, reporters: &mut [Box<dyn Reporter>], report: &ScenarioReport) -> usize {
    let mut failed = 0;
    for reporter in reporters.iter_mut() {
        match reporter.emit(report) {
            Ok(()) => log_debug!(ctx, "report emitted by {}", reporter.name()),
            Err(e) => {
                log_error!(ctx, "reporter {} failed: {}", reporter.name(), e);
                failed += 1;
            }
        }
    }
    failed
}
