//! End-to-end scenario: sensors, placement, simulation and metrics.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::core::config::{ResourceSpec, ScenarioConfig};
use crate::core::engine::EngineConfig;
use crate::core::error::FogError;
use crate::core::events::{CompletionRecord, WorkloadOutcome};
use crate::core::metrics::{MetricsAggregator, MetricsConfig, ScenarioReport};
use crate::core::placement::{CriticalityPolicy, PlacementConfig, PlacementDecision};
use crate::core::sensor::{sample_profiles, SensorProfile};
use crate::core::tier::Tier;
use crate::simulation::FogSimulation;

/// Immutable scenario: config plus sensor profiles sampled once at construction.
#[derive(Clone, Debug)]
pub struct Scenario {
    config: ScenarioConfig,
    profiles: Vec<SensorProfile>,
}

/// Everything produced by one scenario run.
#[derive(Clone, Debug)]
pub struct ScenarioRun {
    pub decisions: Vec<PlacementDecision>,
    pub records: Vec<CompletionRecord>,
    /// Outcome of each sensor workload, aligned with the sensor profiles.
    pub outcomes: Vec<WorkloadOutcome>,
    pub report: ScenarioReport,
    /// Memory and storage charges of the admitted VMs, per tier.
    pub reservation_costs: BTreeMap<Tier, f64>,
    pub end_time: f64,
}

impl Scenario {
    /// Samples sensor latency and energy with the generator seeded from the config.
    pub fn from_config(config: ScenarioConfig) -> Result<Self, FogError> {
        let mut rng = Pcg64::seed_from_u64(config.seed);
        let profiles = sample_profiles(&config.sensors, &mut rng, config.latency_range, config.energy_range)?;
        Ok(Self { config, profiles })
    }

    /// Uses given profiles instead of sampling them.
    pub fn with_profiles(config: ScenarioConfig, profiles: Vec<SensorProfile>) -> Self {
        Self { config, profiles }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn profiles(&self) -> &[SensorProfile] {
        &self.profiles
    }

    /// Runs the scenario. Every call builds a fresh simulation, so repeated runs give identical results.
    pub fn simulate(&self) -> Result<ScenarioRun, FogError> {
        simulate(
            &self.profiles,
            &self.config.resources,
            &self.config.placement,
            self.config.engine.clone(),
            self.config.metrics.clone(),
            &self.config.broker,
        )
    }
}

fn simulate(
    profiles: &[SensorProfile],
    resources: &ResourceSpec,
    placement: &PlacementConfig,
    engine: EngineConfig,
    metrics: MetricsConfig,
    broker: &str,
) -> Result<ScenarioRun, FogError> {
    let mut sim = FogSimulation::new(resources, engine, broker)?;
    sim.provision_vms(resources, profiles.len() as u32)?;
    let decisions = sim.submit_sensors(profiles, placement, &CriticalityPolicy)?;
    sim.run()?;
    let outcomes = sim.outcomes()?;
    let report = MetricsAggregator::new(metrics).aggregate(profiles, &outcomes);
    Ok(ScenarioRun {
        decisions,
        records: sim.records().to_vec(),
        outcomes,
        report,
        reservation_costs: sim.reservation_costs(),
        end_time: sim.current_time(),
    })
}

/// Runs sensors on the given resources with default engine and pricing settings.
pub fn run_scenario(
    profiles: &[SensorProfile],
    resources: &ResourceSpec,
    placement: &PlacementConfig,
) -> Result<ScenarioReport, FogError> {
    let defaults = ScenarioConfig::default();
    simulate(
        profiles,
        resources,
        placement,
        defaults.engine,
        defaults.metrics,
        &defaults.broker,
    )
    .map(|run| run.report)
}
