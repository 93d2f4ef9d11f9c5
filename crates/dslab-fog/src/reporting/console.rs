//! Console table of the scenario report.

use std::fmt::Write as _;
use std::io::Write;

use crate::core::error::ReportError;
use crate::core::metrics::ScenarioReport;
use crate::reporting::Reporter;

fn opt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Formats the report as a fixed-width table with two decimals.
pub fn render_table(report: &ScenarioReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<6} {:>12} {:>10} {:>14} {:>10} {:>10}  {}",
        "Sensor", "Tier", "Latency(ms)", "Energy(W)", "Monthly(kWh)", "CPU(s)", "Cost", "Status"
    );
    for m in &report.sensors {
        let status = m.failure.as_deref().unwrap_or("ok");
        let _ = writeln!(
            out,
            "{:<16} {:<6} {:>12.2} {:>10.2} {:>14.2} {:>10} {:>10}  {}",
            m.name,
            m.tier.to_string(),
            m.latency_ms,
            m.energy_w,
            m.monthly_energy_kwh,
            opt_value(m.actual_cpu_time),
            opt_value(m.processing_cost),
            status
        );
    }
    let agg = &report.aggregate;
    let _ = writeln!(out);
    let _ = writeln!(out, "Average latency: {:.2} ms", agg.avg_latency_ms);
    let _ = writeln!(out, "Total monthly energy: {:.2} kWh", agg.total_monthly_energy_kwh);
    let _ = writeln!(out, "Cloud cost: ${:.2}", agg.cloud_cost);
    let _ = writeln!(out, "Fog cost: ${:.2}", agg.fog_cost);
    let _ = writeln!(out, "Savings: ${:.2}", agg.savings);
    out
}

/// Prints the table to stdout or to any other writer.
pub struct ConsoleTable<W: Write> {
    out: W,
}

impl ConsoleTable<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: std::io::stdout() }
    }
}

impl<W: Write> ConsoleTable<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for ConsoleTable<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn emit(&mut self, report: &ScenarioReport) -> Result<(), ReportError> {
        self.out.write_all(render_table(report).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}
