//! Compute tiers.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Class of compute location with distinct cost and latency characteristics.
///
/// Ordering follows the distance from the data source: edge < fog < cloud.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Edge,
    Fog,
    Cloud,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Edge, Tier::Fog, Tier::Cloud];

    /// Multiplier applied to the instruction length of workloads processed on this tier.
    pub fn length_multiplier(&self) -> f64 {
        match self {
            Tier::Edge => 1.0,
            Tier::Fog => 1.3,
            Tier::Cloud => 1.7,
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Tier::Edge => write!(f, "edge"),
            Tier::Fog => write!(f, "fog"),
            Tier::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "edge" => Ok(Tier::Edge),
            "fog" => Ok(Tier::Fog),
            "cloud" => Ok(Tier::Cloud),
            _ => Err(format!("unknown tier: {}", s)),
        }
    }
}
