use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use dslab_fog::context::SimulationContext;
use dslab_fog::core::config::ScenarioConfig;
use dslab_fog::core::error::ReportError;
use dslab_fog::core::metrics::ScenarioReport;
use dslab_fog::reporting::chart::{chart_series, ChartReporter, ChartRenderer, TextBarChart};
use dslab_fog::reporting::console::{render_table, ConsoleTable};
use dslab_fog::reporting::csv::CsvExporter;
use dslab_fog::reporting::emit_all;
use dslab_fog::reporting::json::JsonExporter;
use dslab_fog::reporting::telemetry::{
    EndpointDescriptor, LogTransport, TelemetryConfig, TelemetryMessage, TelemetryReporter, TelemetryTransport,
};
use dslab_fog::reporting::Reporter;
use dslab_fog::scenario::Scenario;

fn report() -> ScenarioReport {
    Scenario::from_config(ScenarioConfig::default())
        .unwrap()
        .simulate()
        .unwrap()
        .report
}

struct FailingTransport;

impl TelemetryTransport for FailingTransport {
    fn send(&mut self, _endpoint: &EndpointDescriptor, _message: &TelemetryMessage) -> Result<(), ReportError> {
        Err(ReportError::UploadFailure("connection refused".to_string()))
    }
}

struct Counting {
    calls: Rc<RefCell<u32>>,
}

impl Reporter for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn emit(&mut self, _report: &ScenarioReport) -> Result<(), ReportError> {
        *self.calls.borrow_mut() += 1;
        Ok(())
    }
}

#[test]
fn test_failures_do_not_stop_other_reporters() {
    let report = report();
    let calls = Rc::new(RefCell::new(0));
    let mut reporters: Vec<Box<dyn Reporter>> = vec![
        Box::new(TelemetryReporter::new(TelemetryConfig::default(), FailingTransport)),
        Box::new(JsonExporter::new("/nonexistent-dir/report.json")),
        Box::new(Counting { calls: calls.clone() }),
    ];
    let failed = emit_all(&SimulationContext::new("test"), &mut reporters, &report);
    assert_eq!(failed, 2);
    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn test_telemetry_sends_fixed_payload() {
    let mut reporter = TelemetryReporter::new(TelemetryConfig::default(), LogTransport::new());
    reporter.emit(&report()).unwrap();
    let sent = reporter.transport().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body, r#"{"heart_rate":82,"temperature":36.7}"#);
    assert!(!sent[0].is_alert());

    let mut unconfigured = TelemetryReporter::new(
        TelemetryConfig {
            endpoint: EndpointDescriptor {
                host_name: String::new(),
                device_id: "dev".to_string(),
                shared_access_key: String::new(),
            },
            ..Default::default()
        },
        LogTransport::new(),
    );
    assert!(matches!(unconfigured.emit(&report()), Err(ReportError::UploadFailure(_))));
}

#[test]
// Every round sends one reading per sensor after the payload, spikes become high-priority alerts.
fn test_telemetry_reading_rounds() {
    let config = TelemetryConfig {
        rounds: 20,
        interval: 2.,
        spike_probability: 0.5,
        ..Default::default()
    };
    let mut reporter = TelemetryReporter::new(config.clone(), LogTransport::new());
    reporter.emit(&report()).unwrap();

    let sent = reporter.transport().sent();
    assert_eq!(sent.len(), 1 + 20 * 5);
    assert!(reporter.transmission_counts().values().all(|count| *count == 20));
    assert_eq!(reporter.elapsed(), 40.);

    let mut alerts = 0;
    for message in &sent[1..] {
        let reading: serde_json::Value = serde_json::from_str(&message.body).unwrap();
        let is_alert = reading["is_alert"].as_bool().unwrap();
        assert_eq!(message.is_alert(), is_alert);
        if is_alert {
            assert_eq!(message.properties.get("priority").map(String::as_str), Some("high"));
            alerts += 1;
        }
    }
    assert!(alerts > 0 && alerts < 100);

    let power = reporter.power_stats();
    let months = 40. / (60. * 60. * 24. * 30.);
    assert_relative_eq!(power["ECG"], 20. * 0.05 / months / 1000., max_relative = 1e-12);

    // same seed gives the same readings
    let mut again = TelemetryReporter::new(config, LogTransport::new());
    again.emit(&report()).unwrap();
    assert_eq!(again.transport().sent(), sent);
}

#[test]
fn test_json_export_contains_all_sensors() {
    let report = report();
    let json = JsonExporter::to_string(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let sensors = value["sensors"].as_array().unwrap();
    assert_eq!(sensors.len(), 5);
    assert_eq!(sensors[0]["name"], "ECG");
    assert_eq!(sensors[0]["tier"], "edge");
    assert_eq!(sensors[4]["tier"], "cloud");
    assert!(value["aggregate"]["fog_cost"].as_f64().unwrap() > 0.);
}

#[test]
fn test_csv_has_row_per_sensor() {
    let mut buf = Vec::new();
    CsvExporter::write(&mut buf, &report()).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), 6);
    assert!(text.lines().nth(1).unwrap().starts_with("ECG,edge,"));
}

#[test]
fn test_console_table() {
    let report = report();
    let mut table = ConsoleTable::new(Vec::<u8>::new());
    table.emit(&report).unwrap();
    let text = String::from_utf8(table.into_inner()).unwrap();
    assert_eq!(text, render_table(&report));
    assert!(text.contains("Temperature"));
    assert!(text.contains(&format!("Savings: ${:.2}", report.aggregate.savings)));
}

#[test]
fn test_charts() {
    let report = report();
    let series = chart_series(&report);
    let titles: Vec<&str> = series.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Latency", "Monthly energy", "CPU time", "Monthly cost"]);
    assert_eq!(series[0].values.len(), 5);
    assert_eq!(series[3].values.keys().collect::<Vec<_>>(), vec!["Cloud", "Fog"]);
    assert!(TextBarChart.render(&series[1]).unwrap().starts_with("Monthly energy (kWh)\n"));

    let mut reporter = ChartReporter::new(TextBarChart, Vec::<u8>::new());
    reporter.emit(&report).unwrap();
}
