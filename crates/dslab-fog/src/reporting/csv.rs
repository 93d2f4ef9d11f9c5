//! CSV file export of per-sensor metrics.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::error::ReportError;
use crate::core::metrics::{PerSensorMetric, ScenarioReport};
use crate::core::tier::Tier;
use crate::reporting::Reporter;

#[derive(Serialize)]
struct CsvRow<'a> {
    sensor: &'a str,
    tier: Tier,
    latency_ms: f64,
    energy_w: f64,
    monthly_energy_kwh: f64,
    actual_cpu_time: Option<f64>,
    processing_cost: Option<f64>,
    failure: Option<&'a str>,
}

impl<'a> From<&'a PerSensorMetric> for CsvRow<'a> {
    fn from(m: &'a PerSensorMetric) -> Self {
        Self {
            sensor: &m.name,
            tier: m.tier,
            latency_ms: m.latency_ms,
            energy_w: m.energy_w,
            monthly_energy_kwh: m.monthly_energy_kwh,
            actual_cpu_time: m.actual_cpu_time,
            processing_cost: m.processing_cost,
            failure: m.failure.as_deref(),
        }
    }
}

/// Writes one row per sensor. Failed sensors have empty CPU time and cost columns.
pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn write<W: Write>(writer: W, report: &ScenarioReport) -> Result<(), ReportError> {
        let mut wtr = ::csv::Writer::from_writer(writer);
        for metric in &report.sensors {
            wtr.serialize(CsvRow::from(metric))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Reporter for CsvExporter {
    fn name(&self) -> &str {
        "csv"
    }

    fn emit(&mut self, report: &ScenarioReport) -> Result<(), ReportError> {
        let file = std::fs::File::create(&self.path)
            .map_err(|e| ReportError::ExportFailure(format!("can't create {}: {}", self.path.display(), e)))?;
        Self::write(file, report)
    }
}
