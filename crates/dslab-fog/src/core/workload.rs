//! Workload (cloudlet) model.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::utilization_model::{FullUtilizationModel, UtilizationModel};

/// Lifecycle of a workload: `Created -> Admitted -> Executing -> Completed`.
///
/// `Failed` marks workloads which never ran (the VM was not found or was not admitted) or were abandoned by a
/// stalled engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WorkloadStatus {
    Created,
    Admitted,
    Executing,
    Completed,
    Failed,
}

impl Display for WorkloadStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            WorkloadStatus::Created => write!(f, "created"),
            WorkloadStatus::Admitted => write!(f, "admitted"),
            WorkloadStatus::Executing => write!(f, "executing"),
            WorkloadStatus::Completed => write!(f, "completed"),
            WorkloadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Unit of computation processing the data of one sensor.
#[derive(Clone)]
pub struct Workload {
    pub id: u32,
    pub broker_id: u32,
    /// Total number of instructions (in millions) to execute.
    pub length: u64,
    pub pes: u32,
    /// Input file size in MB.
    pub input_size: u64,
    /// Output file size in MB.
    pub output_size: u64,
    utilization_model: Box<dyn UtilizationModel>,
    status: WorkloadStatus,
    vm_id: Option<u32>,
    executed: f64,
    exec_start_time: Option<f64>,
    finish_time: Option<f64>,
}

impl Workload {
    pub fn new(id: u32, broker_id: u32, length: u64, pes: u32, input_size: u64, output_size: u64) -> Self {
        Self {
            id,
            broker_id,
            length,
            pes,
            input_size,
            output_size,
            utilization_model: Box::new(FullUtilizationModel),
            status: WorkloadStatus::Created,
            vm_id: None,
            executed: 0.,
            exec_start_time: None,
            finish_time: None,
        }
    }

    pub fn with_utilization_model(mut self, model: Box<dyn UtilizationModel>) -> Self {
        self.utilization_model = model;
        self
    }

    pub fn status(&self) -> WorkloadStatus {
        self.status
    }

    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    /// Instructions executed so far.
    pub fn executed(&self) -> f64 {
        self.executed
    }

    pub fn remaining(&self) -> f64 {
        (self.length as f64 - self.executed).max(0.)
    }

    pub fn exec_start_time(&self) -> Option<f64> {
        self.exec_start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, WorkloadStatus::Completed | WorkloadStatus::Failed)
    }

    /// Fraction of the granted capacity the workload consumes at `time`.
    pub fn utilization(&self, time: f64) -> f64 {
        let from_start = self.exec_start_time.map_or(0., |start| time - start);
        self.utilization_model.get_utilization(time, from_start).clamp(0., 1.)
    }

    /// Binds workload to the VM. The binding is set once and never changes.
    pub(crate) fn bind(&mut self, vm_id: u32) -> bool {
        if self.status != WorkloadStatus::Created {
            return false;
        }
        self.vm_id = Some(vm_id);
        self.status = WorkloadStatus::Admitted;
        true
    }

    pub(crate) fn start(&mut self, time: f64) {
        if self.status == WorkloadStatus::Admitted {
            self.status = WorkloadStatus::Executing;
            self.exec_start_time = Some(time);
        }
    }

    pub(crate) fn progress(&mut self, instructions: f64) {
        self.executed += instructions;
    }

    pub(crate) fn complete(&mut self, time: f64) {
        self.executed = self.length as f64;
        self.finish_time = Some(time);
        self.status = WorkloadStatus::Completed;
    }

    pub(crate) fn fail(&mut self) {
        self.status = WorkloadStatus::Failed;
    }

    /// CPU time between the start of execution and completion.
    pub fn actual_cpu_time(&self) -> Option<f64> {
        match (self.exec_start_time, self.finish_time) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }
}
