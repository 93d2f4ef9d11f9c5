//! Per-sensor and aggregate metrics of a scenario.

use serde::{Deserialize, Serialize};

use crate::core::events::WorkloadOutcome;
use crate::core::sensor::SensorProfile;
use crate::core::tier::Tier;

const HOURS_PER_MONTH: f64 = 24. * 30.;

/// Pricing constants of the cost comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Price of one kWh in the cloud.
    pub unit_rate: f64,
    /// Fraction of the cloud cost saved by fog processing.
    pub savings_fraction: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            unit_rate: 0.20,
            savings_fraction: 0.35,
        }
    }
}

/// Collection of samples with sum and mean.
#[derive(Clone, Debug, Default)]
pub struct SampleMetric {
    data: Vec<f64>,
}

impl SampleMetric {
    pub fn add(&mut self, x: f64) {
        self.data.push(x);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Mean of the samples, zero for an empty metric.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.;
        }
        self.sum() / self.data.len() as f64
    }
}

/// Metrics of one sensor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerSensorMetric {
    pub name: String,
    pub tier: Tier,
    pub latency_ms: f64,
    pub energy_w: f64,
    pub monthly_energy_kwh: f64,
    /// CPU time of the sensor workload, `None` if it never executed.
    pub actual_cpu_time: Option<f64>,
    pub processing_cost: Option<f64>,
    /// Reason why the workload did not execute.
    pub failure: Option<String>,
}

/// Metrics of the whole scenario.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateMetric {
    pub avg_latency_ms: f64,
    pub total_monthly_energy_kwh: f64,
    pub cloud_cost: f64,
    pub fog_cost: f64,
    pub savings: f64,
}

/// Final result of a scenario, handed to reporters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub sensors: Vec<PerSensorMetric>,
    pub aggregate: AggregateMetric,
}

/// Monthly energy in kWh of a device drawing `energy_w` watts around the clock.
pub fn monthly_energy(energy_w: f64) -> f64 {
    energy_w * HOURS_PER_MONTH / 1000.
}

/// Computes scenario metrics. Does no I/O.
pub struct MetricsAggregator {
    config: MetricsConfig,
}

impl MetricsAggregator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Builds the report from sensors and the outcomes of their workloads, index-aligned.
    ///
    /// Sensors whose workload failed still contribute their latency and energy samples to the aggregate.
    pub fn aggregate(&self, profiles: &[SensorProfile], outcomes: &[WorkloadOutcome]) -> ScenarioReport {
        let mut latency = SampleMetric::default();
        let mut energy = SampleMetric::default();
        let mut sensors = Vec::with_capacity(profiles.len());

        for (profile, outcome) in profiles.iter().zip(outcomes) {
            let monthly_energy_kwh = monthly_energy(profile.energy_w);
            latency.add(profile.latency_ms);
            energy.add(monthly_energy_kwh);

            let (actual_cpu_time, processing_cost, failure) = match outcome {
                WorkloadOutcome::Completed(record) => {
                    (Some(record.actual_cpu_time), Some(record.processing_cost), None)
                }
                WorkloadOutcome::Failed(failure) => (None, None, Some(failure.error.to_string())),
            };
            sensors.push(PerSensorMetric {
                name: profile.name.clone(),
                tier: outcome.tier(),
                latency_ms: profile.latency_ms,
                energy_w: profile.energy_w,
                monthly_energy_kwh,
                actual_cpu_time,
                processing_cost,
                failure,
            });
        }

        ScenarioReport {
            sensors,
            aggregate: self.summarize(latency.mean(), energy.sum()),
        }
    }

    fn summarize(&self, avg_latency_ms: f64, total_monthly_energy_kwh: f64) -> AggregateMetric {
        let cloud_cost = total_monthly_energy_kwh * self.config.unit_rate;
        let fog_cost = cloud_cost * (1. - self.config.savings_fraction);
        AggregateMetric {
            avg_latency_ms,
            total_monthly_energy_kwh,
            cloud_cost,
            fog_cost,
            savings: cloud_cost - fog_cost,
        }
    }
}
