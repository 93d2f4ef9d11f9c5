//! Health sensors and their sampled static attributes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::FogError;

/// Sensor as declared in the scenario config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub name: String,
    /// Nominal data rate in samples per second.
    pub data_rate: f64,
    /// Criticality score in [0, 1].
    pub criticality: f64,
    /// Explicit VM of the tier pool serving the sensor, the declared position is used otherwise.
    #[serde(default)]
    pub vm: Option<u32>,
}

impl SensorSpec {
    pub fn new(name: &str, data_rate: f64, criticality: f64) -> Self {
        Self {
            name: name.to_string(),
            data_rate,
            criticality,
            vm: None,
        }
    }
}

/// Sensor with fixed latency and energy samples.
///
/// The samples are drawn once when the scenario is built and never change during the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    pub name: String,
    pub data_rate: f64,
    pub criticality: f64,
    /// Latency sample in milliseconds.
    pub latency_ms: f64,
    /// Energy draw sample in watts.
    pub energy_w: f64,
}

impl SensorProfile {
    /// Creates profile from explicit values, validating them.
    pub fn new(name: &str, data_rate: f64, criticality: f64, latency_ms: f64, energy_w: f64) -> Result<Self, FogError> {
        let invalid = |reason: &str| FogError::InvalidSensor {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if !(0.0..=1.0).contains(&criticality) {
            return Err(invalid("criticality must be within [0, 1]"));
        }
        if !(data_rate.is_finite() && data_rate >= 0.) {
            return Err(invalid("data rate must be a non-negative number"));
        }
        if !(latency_ms.is_finite() && latency_ms >= 0.) || !(energy_w.is_finite() && energy_w >= 0.) {
            return Err(invalid("latency and energy samples must be non-negative numbers"));
        }
        Ok(Self {
            name: name.to_string(),
            data_rate,
            criticality,
            latency_ms,
            energy_w,
        })
    }
}

fn sample_range<R: Rng>(rng: &mut R, (from, to): (f64, f64)) -> f64 {
    if to > from {
        rng.gen_range(from..to)
    } else {
        from
    }
}

/// Draws latency and energy samples for every sensor, in declaration order.
pub fn sample_profiles<R: Rng>(
    specs: &[SensorSpec],
    rng: &mut R,
    latency_range: (f64, f64),
    energy_range: (f64, f64),
) -> Result<Vec<SensorProfile>, FogError> {
    specs
        .iter()
        .map(|spec| {
            let latency_ms = sample_range(rng, latency_range);
            let energy_w = sample_range(rng, energy_range);
            SensorProfile::new(&spec.name, spec.data_rate, spec.criticality, latency_ms, energy_w)
        })
        .collect()
}
