//! Scenario configuration.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::engine::EngineConfig;
use crate::core::error::FogError;
use crate::core::metrics::MetricsConfig;
use crate::core::placement::{PlacementConfig, WorkloadConfig};
use crate::core::resource::HostSpec;
use crate::core::sensor::SensorSpec;
use crate::core::tier::Tier;
use crate::core::vm::VmSpec;
use crate::reporting::telemetry::TelemetryConfig;

/// Hosts and VM pool of one tier.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TierSpec {
    pub hosts: Vec<HostSpec>,
    #[serde(default)]
    pub vm: VmSpec,
    /// Number of VMs in the tier pool, defaults to the number of sensors.
    #[serde(default)]
    pub vm_count: Option<u32>,
}

impl Default for TierSpec {
    fn default() -> Self {
        Self {
            hosts: vec![HostSpec {
                count: 3,
                ..Default::default()
            }],
            vm: VmSpec::default(),
            vm_count: None,
        }
    }
}

/// Datacenter layout of all tiers.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ResourceSpec {
    pub tiers: BTreeMap<Tier, TierSpec>,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            tiers: Tier::ALL.iter().map(|tier| (*tier, TierSpec::default())).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct RawEngineConfig {
    pub step_duration: Option<f64>,
    pub idle_step: Option<f64>,
    pub max_steps: Option<u64>,
    pub parallel: Option<bool>,
    pub workers: Option<usize>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct RawScenarioConfig {
    /// seed of the latency and energy sampling
    pub seed: Option<u64>,
    /// name of the broker owning all VMs
    pub broker: Option<String>,
    /// workload length scaling constant
    pub base_factor: Option<f64>,
    /// price of one kWh
    pub unit_rate: Option<f64>,
    /// fraction of cloud cost saved by fog processing
    pub savings_fraction: Option<f64>,
    /// latency samples are drawn from [from, to)
    pub latency_range: Option<(f64, f64)>,
    /// energy samples are drawn from [from, to)
    pub energy_range: Option<(f64, f64)>,
    pub engine: Option<RawEngineConfig>,
    pub workload: Option<WorkloadConfig>,
    pub sensors: Option<Vec<SensorSpec>>,
    pub tiers: Option<BTreeMap<Tier, TierSpec>>,
    pub telemetry: Option<TelemetryConfig>,
}

/// Represents scenario configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub broker: String,
    pub latency_range: (f64, f64),
    pub energy_range: (f64, f64),
    pub sensors: Vec<SensorSpec>,
    pub resources: ResourceSpec,
    pub placement: PlacementConfig,
    pub engine: EngineConfig,
    pub metrics: MetricsConfig,
    pub telemetry: Option<TelemetryConfig>,
}

/// The five health sensors: name, data rate and criticality.
pub fn default_sensors() -> Vec<SensorSpec> {
    vec![
        SensorSpec::new("ECG", 30., 0.98),
        SensorSpec::new("HeartRate", 25., 0.95),
        SensorSpec::new("BloodPressure", 15., 0.92),
        SensorSpec::new("Oximeter", 12., 0.90),
        SensorSpec::new("Temperature", 10., 0.85),
    ]
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 123,
            broker: "broker".to_string(),
            latency_range: (10., 30.),
            energy_range: (1., 4.),
            sensors: default_sensors(),
            resources: ResourceSpec::default(),
            placement: PlacementConfig::default(),
            engine: EngineConfig::default(),
            metrics: MetricsConfig::default(),
            telemetry: Some(TelemetryConfig::default()),
        }
    }
}

fn check_range(name: &str, (from, to): (f64, f64)) -> Result<(f64, f64), FogError> {
    if !(from.is_finite() && to.is_finite()) || from < 0. || to < from {
        return Err(FogError::Config(format!("bad {} [{}, {})", name, from, to)));
    }
    Ok((from, to))
}

impl ScenarioConfig {
    /// Creates scenario config by reading parameter values from .yaml file (uses default values if some parameters
    /// are absent).
    pub fn from_file(file_name: &str) -> Result<Self, FogError> {
        let text = std::fs::read_to_string(file_name)
            .map_err(|e| FogError::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            FogError::Config(msg) => FogError::Config(format!("{}: {}", file_name, msg)),
            other => other,
        })
    }

    /// Parses scenario config from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, FogError> {
        let data: RawScenarioConfig =
            serde_yaml::from_str(text).map_err(|e| FogError::Config(format!("can't parse YAML: {}", e)))?;
        let default = ScenarioConfig::default();

        let engine = match data.engine {
            Some(raw) => EngineConfig {
                step_duration: raw.step_duration,
                idle_step: raw.idle_step.unwrap_or(default.engine.idle_step),
                max_steps: raw.max_steps.unwrap_or(default.engine.max_steps),
                parallel: raw.parallel.unwrap_or(default.engine.parallel),
                workers: raw.workers,
            },
            None => default.engine,
        };
        if let Some(step) = engine.step_duration {
            if !(step.is_finite() && step > 0.) {
                return Err(FogError::Config(format!("bad step duration {}", step)));
            }
        }
        if !(engine.idle_step.is_finite() && engine.idle_step > 0.) {
            return Err(FogError::Config(format!("bad idle step {}", engine.idle_step)));
        }

        let sensors = data.sensors.unwrap_or(default.sensors);
        let bindings: IndexMap<String, u32> = sensors
            .iter()
            .filter_map(|s| s.vm.map(|vm| (s.name.clone(), vm)))
            .collect();

        let metrics = MetricsConfig {
            unit_rate: data.unit_rate.unwrap_or(default.metrics.unit_rate),
            savings_fraction: data.savings_fraction.unwrap_or(default.metrics.savings_fraction),
        };
        if !(0.0..=1.0).contains(&metrics.savings_fraction) {
            return Err(FogError::Config(format!(
                "savings fraction {} is outside [0, 1]",
                metrics.savings_fraction
            )));
        }

        let workload = data.workload.unwrap_or(default.placement.workload);
        if workload.pes == 0 {
            return Err(FogError::Config("workload must request at least one PE".to_string()));
        }

        Ok(Self {
            seed: data.seed.unwrap_or(default.seed),
            broker: data.broker.unwrap_or(default.broker),
            latency_range: check_range("latency range", data.latency_range.unwrap_or(default.latency_range))?,
            energy_range: check_range("energy range", data.energy_range.unwrap_or(default.energy_range))?,
            sensors,
            resources: data
                .tiers
                .map(|tiers| ResourceSpec { tiers })
                .unwrap_or(default.resources),
            placement: PlacementConfig {
                base_factor: data.base_factor.unwrap_or(default.placement.base_factor),
                bindings,
                workload,
            },
            engine,
            metrics,
            telemetry: data.telemetry.or(default.telemetry),
        })
    }

    /// Returns total hosts count over all tiers.
    pub fn number_of_hosts(&self) -> u32 {
        self.resources
            .tiers
            .values()
            .flat_map(|t| t.hosts.iter())
            .map(|h| h.count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = ScenarioConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ScenarioConfig::default());
        assert_eq!(config.number_of_hosts(), 9);
    }

    #[test]
    fn sensor_bindings_are_collected() {
        let yaml = r#"
sensors:
  - name: ECG
    data_rate: 30
    criticality: 0.98
    vm: 1
  - name: HeartRate
    data_rate: 25
    criticality: 0.95
"#;
        let config = ScenarioConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.placement.bindings.get("ECG"), Some(&1));
        assert_eq!(config.placement.bindings.get("HeartRate"), None);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(ScenarioConfig::from_yaml_str("seed: [1, 2").is_err());
        assert!(ScenarioConfig::from_yaml_str("savings_fraction: 1.5").is_err());
        assert!(ScenarioConfig::from_yaml_str("latency_range: [30, 10]").is_err());
        assert!(ScenarioConfig::from_yaml_str("engine:\n  step_duration: 0").is_err());
    }

    #[test]
    fn workload_without_pes_is_rejected() {
        let yaml = r#"
workload:
  pes: 0
  input_size: 300
  output_size: 300
  utilization: Full
"#;
        assert!(matches!(ScenarioConfig::from_yaml_str(yaml), Err(FogError::Config(_))));
    }
}
