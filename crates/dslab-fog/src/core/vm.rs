//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::common::Allocation;
use crate::core::workload::Workload;

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Created,
    Running,
    FailedToAllocate,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Created => write!(f, "created"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::FailedToAllocate => write!(f, "failed_to_allocate"),
        }
    }
}

/// Resource requirements of a VM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VmSpec {
    /// Requested speed of each PE in MIPS.
    pub mips: f64,
    /// Number of PEs.
    pub pes: u32,
    /// Memory in MB.
    pub ram: u64,
    /// Bandwidth in Mbit/s.
    pub bw: u64,
    /// Image size in MB.
    pub size: u64,
    /// Virtual machine monitor label.
    #[serde(default = "default_vmm")]
    pub vmm: String,
}

fn default_vmm() -> String {
    "Xen".to_string()
}

impl VmSpec {
    /// Whether a VM of this spec can execute anything.
    pub fn is_runnable(&self) -> bool {
        self.pes > 0 && self.mips.is_finite() && self.mips > 0.
    }
}

impl Default for VmSpec {
    fn default() -> Self {
        Self {
            mips: 2500.,
            pes: 1,
            ram: 2048,
            bw: 10000,
            size: 10000,
            vmm: default_vmm(),
        }
    }
}

/// Represents virtual machine (VM).
///
/// A VM is a slice of one host's capacity owned by a broker. Once admitted it stays on the same host
/// until the end of the simulation. Workloads bound to the VM are kept here and share the VM capacity
/// in a time-shared manner.
#[derive(Clone)]
pub struct VirtualMachine {
    pub id: u32,
    pub broker_id: u32,
    pub spec: VmSpec,
    status: VmStatus,
    host_id: Option<u32>,
    workloads: Vec<Workload>,
}

impl VirtualMachine {
    pub fn new(id: u32, broker_id: u32, spec: VmSpec) -> Self {
        Self {
            id,
            broker_id,
            spec,
            status: VmStatus::Created,
            host_id: None,
            workloads: Vec::new(),
        }
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// Host the VM is bound to, `None` until admitted.
    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    /// Maximum speed of the VM (MIPS of all its PEs).
    pub fn capacity(&self) -> f64 {
        self.spec.mips * self.spec.pes as f64
    }

    /// Host capacity the VM asks for at admission.
    pub fn allocation(&self) -> Allocation {
        Allocation {
            id: self.id,
            pes: self.spec.pes,
            mips: self.spec.mips,
            ram: self.spec.ram,
            bw: self.spec.bw,
            storage: self.spec.size,
        }
    }

    pub(crate) fn bind_to_host(&mut self, host_id: u32) {
        debug_assert!(self.host_id.is_none(), "vm #{} is already bound", self.id);
        self.host_id = Some(host_id);
        self.status = VmStatus::Running;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.status = VmStatus::FailedToAllocate;
    }

    pub fn workloads(&self) -> &[Workload] {
        &self.workloads
    }

    pub(crate) fn workloads_mut(&mut self) -> &mut Vec<Workload> {
        &mut self.workloads
    }

    /// Maximum speed a single workload may use on this VM.
    pub fn workload_cap(&self, workload: &Workload) -> f64 {
        workload.pes.min(self.spec.pes) as f64 * self.spec.mips
    }

    /// Capacity the VM can put to use now: the sum of the caps of its unfinished workloads,
    /// limited by the VM capacity.
    pub fn demand(&self) -> f64 {
        let wanted: f64 = self
            .workloads
            .iter()
            .filter(|w| !w.is_finished())
            .map(|w| self.workload_cap(w))
            .sum();
        wanted.min(self.capacity())
    }
}

/// Creates `count` VMs with identical spec and ids `0..count` in creation order.
pub fn create_vms(broker_id: u32, count: u32, spec: &VmSpec) -> Vec<VirtualMachine> {
    (0..count)
        .map(|id| VirtualMachine::new(id, broker_id, spec.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vms_get_ids_in_creation_order() {
        let vms = create_vms(7, 5, &VmSpec::default());
        assert_eq!(vms.iter().map(|vm| vm.id).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(vms.iter().all(|vm| vm.broker_id == 7 && vm.status() == VmStatus::Created));
        assert_eq!(vms[0].capacity(), 2500.);
        assert_eq!(vms[0].allocation().storage, 10000);
    }
}
