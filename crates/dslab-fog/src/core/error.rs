//! Error taxonomy of the simulation core.

use thiserror::Error;

use crate::core::tier::Tier;

/// Errors raised while building or running a scenario.
///
/// Structural errors (`InsufficientSpec`, `InvalidSensor`, `Config`) abort the scenario before the
/// simulation starts. Per-VM and per-workload errors (`AdmissionFailure`, `VmNotFound`) are isolated
/// and surface in the results as [`WorkloadFailure`](crate::core::events::WorkloadFailure) markers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FogError {
    #[error("insufficient datacenter spec for {tier} tier: {reason}")]
    InsufficientSpec { tier: Tier, reason: String },
    #[error("vm #{vm_id} does not fit any host of {tier} tier")]
    AdmissionFailure { tier: Tier, vm_id: u32 },
    #[error("vm #{vm_id} not found in {tier} tier pool of {pool_size} vms")]
    VmNotFound { tier: Tier, vm_id: u32, pool_size: u32 },
    #[error("invalid sensor {name}: {reason}")]
    InvalidSensor { name: String, reason: String },
    #[error("datacenter for {0} tier is not registered")]
    TierNotRegistered(Tier),
    #[error("engine stalled at {time:.3} after {steps} steps with {pending} pending workloads")]
    EngineStalled { time: f64, steps: u64, pending: usize },
    #[error("engine worker failed: {0}")]
    Worker(String),
    #[error("config error: {0}")]
    Config(String),
}

/// Errors reported by external reporting collaborators.
///
/// These never propagate into the simulation core, see [`emit_all`](crate::reporting::emit_all).
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("export failed: {0}")]
    ExportFailure(String),
    #[error("upload failed: {0}")]
    UploadFailure(String),
    #[error("render failed: {0}")]
    RenderFailure(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        ReportError::ExportFailure(e.to_string())
    }
}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        ReportError::ExportFailure(e.to_string())
    }
}
