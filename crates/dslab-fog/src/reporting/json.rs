//! JSON file export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::core::error::ReportError;
use crate::core::metrics::ScenarioReport;
use crate::reporting::Reporter;

/// Writes the whole report as pretty-printed JSON.
pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn to_string(report: &ScenarioReport) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

impl Reporter for JsonExporter {
    fn name(&self) -> &str {
        "json"
    }

    fn emit(&mut self, report: &ScenarioReport) -> Result<(), ReportError> {
        let file = File::create(&self.path)
            .map_err(|e| ReportError::ExportFailure(format!("can't create {}: {}", self.path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;
        Ok(())
    }
}
