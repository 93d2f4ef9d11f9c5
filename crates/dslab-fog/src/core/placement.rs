//! Criticality-driven placement of sensor workloads onto tiers and VMs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::error::FogError;
use crate::core::sensor::SensorProfile;
use crate::core::tier::Tier;

/// Sensors at least this critical are processed on the edge.
pub const EDGE_CRITICALITY: f64 = 0.95;
/// Sensors at least this critical (and below the edge threshold) are processed in the fog.
pub const FOG_CRITICALITY: f64 = 0.90;

/// Trait for implementation of tier selection policies.
pub trait PlacementPolicy {
    fn select_tier(&self, sensor: &SensorProfile) -> Tier;
}

/// Threshold policy over half-open criticality bands:
/// `[0.95, 1] -> edge`, `[0.90, 0.95) -> fog`, `[0, 0.90) -> cloud`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CriticalityPolicy;

impl CriticalityPolicy {
    pub fn tier_for(criticality: f64) -> Tier {
        if criticality >= EDGE_CRITICALITY {
            Tier::Edge
        } else if criticality >= FOG_CRITICALITY {
            Tier::Fog
        } else {
            Tier::Cloud
        }
    }
}

impl PlacementPolicy for CriticalityPolicy {
    fn select_tier(&self, sensor: &SensorProfile) -> Tier {
        Self::tier_for(sensor.criticality)
    }
}

/// Instruction length of the sensor workload: `data_rate * criticality * base_factor * tier multiplier`.
pub fn workload_length(data_rate: f64, criticality: f64, base_factor: f64, tier: Tier) -> u64 {
    (data_rate * criticality * base_factor * tier.length_multiplier()).round() as u64
}

/// Parameters of the workloads created for sensors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub pes: u32,
    /// Input file size in MB.
    pub input_size: u64,
    /// Output file size in MB.
    pub output_size: u64,
    /// Utilization model, e.g. `Full` or `Constant[utilization=0.5]`.
    pub utilization: String,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            pes: 1,
            input_size: 300,
            output_size: 300,
            utilization: "Full".to_string(),
        }
    }
}

/// Placement settings of a scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Scenario constant scaling the workload length.
    pub base_factor: f64,
    /// Explicit sensor name to VM id bindings, overriding the declared sensor position.
    #[serde(default)]
    pub bindings: IndexMap<String, u32>,
    #[serde(default)]
    pub workload: WorkloadConfig,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            base_factor: 100.,
            bindings: IndexMap::new(),
            workload: WorkloadConfig::default(),
        }
    }
}

/// Where and how the workload of one sensor runs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementDecision {
    /// Position of the sensor in the scenario, also used as the workload id.
    pub sensor_index: usize,
    pub sensor: String,
    pub tier: Tier,
    pub vm_id: u32,
    pub length: u64,
}

/// Builds the sensor name to VM id table, validating it.
///
/// Every sensor name must be unique and every explicit binding must name a known sensor.
pub fn build_bindings(
    profiles: &[SensorProfile],
    explicit: &IndexMap<String, u32>,
) -> Result<IndexMap<String, u32>, FogError> {
    let mut bindings = IndexMap::new();
    for (idx, profile) in profiles.iter().enumerate() {
        if bindings.contains_key(&profile.name) {
            return Err(FogError::InvalidSensor {
                name: profile.name.clone(),
                reason: "duplicate sensor name".to_string(),
            });
        }
        let vm_id = explicit.get(&profile.name).copied().unwrap_or(idx as u32);
        bindings.insert(profile.name.clone(), vm_id);
    }
    if let Some(unknown) = explicit.keys().find(|name| !bindings.contains_key(*name)) {
        return Err(FogError::InvalidSensor {
            name: unknown.clone(),
            reason: "binding refers to unknown sensor".to_string(),
        });
    }
    Ok(bindings)
}

/// Decides tier, VM and workload length for every sensor, in declaration order.
pub fn place(
    profiles: &[SensorProfile],
    config: &PlacementConfig,
    policy: &dyn PlacementPolicy,
) -> Result<Vec<PlacementDecision>, FogError> {
    if !(config.base_factor.is_finite() && config.base_factor >= 0.) {
        return Err(FogError::Config(format!("bad base factor {}", config.base_factor)));
    }
    if config.workload.pes == 0 {
        return Err(FogError::Config("sensor workloads must request at least one PE".to_string()));
    }
    let bindings = build_bindings(profiles, &config.bindings)?;
    Ok(profiles
        .iter()
        .enumerate()
        .map(|(idx, profile)| {
            let tier = policy.select_tier(profile);
            PlacementDecision {
                sensor_index: idx,
                sensor: profile.name.clone(),
                tier,
                vm_id: bindings[&profile.name],
                length: workload_length(profile.data_rate, profile.criticality, config.base_factor, tier),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, data_rate: f64, criticality: f64) -> SensorProfile {
        SensorProfile::new(name, data_rate, criticality, 20., 2.).unwrap()
    }

    #[test]
    fn bands_are_half_open() {
        assert_eq!(CriticalityPolicy::tier_for(1.0), Tier::Edge);
        assert_eq!(CriticalityPolicy::tier_for(0.95), Tier::Edge);
        assert_eq!(CriticalityPolicy::tier_for(0.9499999), Tier::Fog);
        assert_eq!(CriticalityPolicy::tier_for(0.90), Tier::Fog);
        assert_eq!(CriticalityPolicy::tier_for(0.8999999), Tier::Cloud);
        assert_eq!(CriticalityPolicy::tier_for(0.0), Tier::Cloud);
    }

    #[test]
    fn lengths_use_tier_multiplier() {
        assert_eq!(workload_length(30., 0.98, 100., Tier::Edge), 2940);
        assert_eq!(workload_length(15., 0.92, 100., Tier::Fog), 1794);
        assert_eq!(workload_length(10., 0.85, 100., Tier::Cloud), 1445);
    }

    #[test]
    fn explicit_bindings_override_position() {
        let profiles = vec![profile("ECG", 30., 0.98), profile("HeartRate", 25., 0.95)];
        let mut explicit = IndexMap::new();
        explicit.insert("HeartRate".to_string(), 0);
        let config = PlacementConfig {
            bindings: explicit,
            ..Default::default()
        };
        let decisions = place(&profiles, &config, &CriticalityPolicy).unwrap();
        assert_eq!(decisions[0].vm_id, 0);
        assert_eq!(decisions[1].vm_id, 0);
    }

    #[test]
    fn bad_bindings_are_rejected() {
        let profiles = vec![profile("ECG", 30., 0.98), profile("ECG", 25., 0.95)];
        assert!(build_bindings(&profiles, &IndexMap::new()).is_err());

        let profiles = vec![profile("ECG", 30., 0.98)];
        let mut explicit = IndexMap::new();
        explicit.insert("Glucose".to_string(), 1);
        assert!(matches!(
            build_bindings(&profiles, &explicit),
            Err(FogError::InvalidSensor { .. })
        ));
    }

    #[test]
    fn workload_without_pes_is_rejected() {
        let profiles = vec![profile("ECG", 30., 0.98)];
        let mut config = PlacementConfig::default();
        config.workload.pes = 0;
        assert!(matches!(
            place(&profiles, &config, &CriticalityPolicy),
            Err(FogError::Config(_))
        ));
    }
}
