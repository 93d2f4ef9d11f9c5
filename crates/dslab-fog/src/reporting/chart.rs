//! Text bar charts of per-sensor metrics.

use std::io::Write;

use indexmap::IndexMap;

use crate::core::error::ReportError;
use crate::core::metrics::{PerSensorMetric, ScenarioReport};
use crate::reporting::Reporter;

const BAR_WIDTH: usize = 40;

/// Values of one chart, keyed by label in display order.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSeries {
    pub title: String,
    pub unit: String,
    pub values: IndexMap<String, f64>,
}

fn per_sensor<F>(report: &ScenarioReport, title: &str, unit: &str, value: F) -> ChartSeries
where
    F: Fn(&PerSensorMetric) -> Option<f64>,
{
    ChartSeries {
        title: title.to_string(),
        unit: unit.to_string(),
        values: report
            .sensors
            .iter()
            .filter_map(|m| value(m).map(|v| (m.name.clone(), v)))
            .collect(),
    }
}

/// Builds the charts shown for a report: per-sensor latency, energy and CPU time, plus the cost comparison.
///
/// Sensors without CPU time (failed workloads) are left out of the CPU time chart.
pub fn chart_series(report: &ScenarioReport) -> Vec<ChartSeries> {
    let mut costs = IndexMap::new();
    costs.insert("Cloud".to_string(), report.aggregate.cloud_cost);
    costs.insert("Fog".to_string(), report.aggregate.fog_cost);
    vec![
        per_sensor(report, "Latency", "ms", |m| Some(m.latency_ms)),
        per_sensor(report, "Monthly energy", "kWh", |m| Some(m.monthly_energy_kwh)),
        per_sensor(report, "CPU time", "s", |m| m.actual_cpu_time),
        ChartSeries {
            title: "Monthly cost".to_string(),
            unit: "$".to_string(),
            values: costs,
        },
    ]
}

/// Trait for implementation of chart backends.
pub trait ChartRenderer {
    fn render(&self, series: &ChartSeries) -> Result<String, ReportError>;
}

/// Renders horizontal bars made of `#`, scaled to the largest value.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextBarChart;

impl ChartRenderer for TextBarChart {
    fn render(&self, series: &ChartSeries) -> Result<String, ReportError> {
        if let Some((label, value)) = series.values.iter().find(|(_, v)| !v.is_finite() || **v < 0.) {
            return Err(ReportError::RenderFailure(format!(
                "{}: bad value {} for {}",
                series.title, value, label
            )));
        }
        let max = series.values.values().cloned().fold(0., f64::max);
        let label_width = series.values.keys().map(|l| l.len()).max().unwrap_or(0);
        let mut out = format!("{} ({})\n", series.title, series.unit);
        for (label, value) in &series.values {
            let len = if max > 0. {
                (value / max * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "{:<width$} | {} {:.2}\n",
                label,
                "#".repeat(len),
                value,
                width = label_width
            ));
        }
        Ok(out)
    }
}

/// Reporter rendering all charts of the report with the given backend.
pub struct ChartReporter<R: ChartRenderer, W: Write> {
    renderer: R,
    out: W,
}

impl<R: ChartRenderer, W: Write> ChartReporter<R, W> {
    pub fn new(renderer: R, out: W) -> Self {
        Self { renderer, out }
    }
}

impl<R: ChartRenderer, W: Write> Reporter for ChartReporter<R, W> {
    fn name(&self) -> &str {
        "chart"
    }

    fn emit(&mut self, report: &ScenarioReport) -> Result<(), ReportError> {
        for series in chart_series(report) {
            let chart = self.renderer.render(&series)?;
            writeln!(self.out, "{}", chart)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_are_scaled_to_maximum() {
        let mut values = IndexMap::new();
        values.insert("Cloud".to_string(), 2.0);
        values.insert("Fog".to_string(), 1.0);
        let series = ChartSeries {
            title: "Cost".to_string(),
            unit: "$".to_string(),
            values,
        };
        let text = TextBarChart.render(&series).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Cost ($)");
        assert_eq!(lines[1], format!("Cloud | {} 2.00", "#".repeat(40)));
        assert_eq!(lines[2], format!("Fog   | {} 1.00", "#".repeat(20)));
    }

    #[test]
    fn negative_value_fails() {
        let mut values = IndexMap::new();
        values.insert("x".to_string(), -1.0);
        let series = ChartSeries {
            title: "t".to_string(),
            unit: "u".to_string(),
            values,
        };
        assert!(matches!(TextBarChart.render(&series), Err(ReportError::RenderFailure(_))));
    }
}
