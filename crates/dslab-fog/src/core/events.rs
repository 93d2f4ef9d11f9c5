//! Records produced by the simulation.

use serde::Serialize;

use crate::core::error::FogError;
use crate::core::tier::Tier;

/// Describes how a workload finished. Produced once per completed workload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub workload_id: u32,
    pub vm_id: u32,
    pub host_id: u32,
    pub tier: Tier,
    pub exec_start_time: f64,
    pub finish_time: f64,
    pub actual_cpu_time: f64,
    /// Processing price: per-second rate times CPU time plus transfer of input and output files.
    pub processing_cost: f64,
}

/// Marks a workload which never executed.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkloadFailure {
    pub workload_id: u32,
    pub tier: Tier,
    pub vm_id: u32,
    pub error: FogError,
}

/// Result of a VM admission request.
#[derive(Clone, Debug, PartialEq)]
pub enum AdmissionOutcome {
    Admitted { vm_id: u32, host_id: u32 },
    Failed { vm_id: u32 },
}

/// Final state of the workload of one sensor.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkloadOutcome {
    Completed(CompletionRecord),
    Failed(WorkloadFailure),
}

impl WorkloadOutcome {
    pub fn workload_id(&self) -> u32 {
        match self {
            WorkloadOutcome::Completed(record) => record.workload_id,
            WorkloadOutcome::Failed(failure) => failure.workload_id,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            WorkloadOutcome::Completed(record) => record.tier,
            WorkloadOutcome::Failed(failure) => failure.tier,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, WorkloadOutcome::Completed(_))
    }
}
