use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use env_logger::Builder;

use dslab_fog::context::SimulationContext;
use dslab_fog::core::config::ScenarioConfig;
use dslab_fog::core::error::FogError;
use dslab_fog::{log_error, log_info};
use dslab_fog::reporting::chart::{ChartReporter, TextBarChart};
use dslab_fog::reporting::console::ConsoleTable;
use dslab_fog::reporting::csv::CsvExporter;
use dslab_fog::reporting::emit_all;
use dslab_fog::reporting::json::JsonExporter;
use dslab_fog::reporting::telemetry::{LogTransport, TelemetryReporter};
use dslab_fog::reporting::Reporter;
use dslab_fog::scenario::Scenario;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Scenario config in YAML, the built-in health scenario is used if absent
    #[clap(long)]
    config: Option<String>,

    /// Directory for JSON and CSV reports
    #[clap(long, default_value = ".")]
    output_dir: PathBuf,

    /// Do not upload telemetry
    #[clap(long)]
    no_telemetry: bool,
}

fn init_logger() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn run(args: Args) -> Result<usize, FogError> {
    let config = match &args.config {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::default(),
    };
    let telemetry = config.telemetry.clone();
    let scenario = Scenario::from_config(config)?;
    let run = scenario.simulate()?;

    let ctx = SimulationContext::new("health-fog");
    log_info!(
        ctx,
        "simulation finished at {:.3}, {} of {} sensors completed",
        run.end_time,
        run.records.len(),
        run.outcomes.len()
    );

    let mut reporters: Vec<Box<dyn Reporter>> = vec![
        Box::new(ConsoleTable::stdout()),
        Box::new(ChartReporter::new(TextBarChart, std::io::stdout())),
        Box::new(JsonExporter::new(args.output_dir.join("health_fog_report.json"))),
        Box::new(CsvExporter::new(args.output_dir.join("health_fog_report.csv"))),
    ];
    let mut failed = emit_all(&ctx, &mut reporters, &run.report);

    match telemetry {
        Some(telemetry) if !args.no_telemetry => {
            let mut reporter = TelemetryReporter::new(telemetry, LogTransport::new());
            match reporter.emit(&run.report) {
                Ok(()) => {
                    let power = reporter.power_stats();
                    for (sensor, count) in reporter.transmission_counts() {
                        let kw = power.get(sensor).copied().unwrap_or_default();
                        log_info!(ctx, "{}: {} readings sent, {:.6} kW transmission power", sensor, count, kw);
                    }
                }
                Err(e) => {
                    log_error!(ctx, "reporter {} failed: {}", reporter.name(), e);
                    failed += 1;
                }
            }
        }
        _ => {}
    }
    for (tier, cost) in &run.reservation_costs {
        log_info!(ctx, "{} VM reservation cost: {:.2}", tier, cost);
    }
    Ok(failed)
}

fn main() {
    init_logger();
    let args = Args::parse();
    match run(args) {
        Ok(0) => {}
        Ok(failed) => eprintln!("{} reporters failed, see log", failed),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
