//! Physical resources: processing elements, hosts and their specifications.

use serde::{Deserialize, Serialize};

use crate::core::fair_share::max_min_fair;

/// Processing element (CPU core) with its rated speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessingElement {
    id: u32,
    mips: f64,
}

impl ProcessingElement {
    pub fn new(id: u32, mips: f64) -> Self {
        Self { id, mips }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Rated speed in millions of instructions per second.
    pub fn mips(&self) -> f64 {
        self.mips
    }
}

/// Physical host owning its processing elements.
///
/// VMs resident on a host share its PEs in a time-shared manner: at every step the aggregate
/// capacity is divided max-min fairly among the VMs which currently have work to do.
#[derive(Clone, Debug)]
pub struct Host {
    pub id: u32,
    pub pes: Vec<ProcessingElement>,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
}

impl Host {
    pub fn new(id: u32, pes: Vec<ProcessingElement>, ram: u64, bw: u64, storage: u64) -> Self {
        Self {
            id,
            pes,
            ram,
            bw,
            storage,
        }
    }

    pub fn pe_count(&self) -> u32 {
        self.pes.len() as u32
    }

    /// Aggregate speed of all PEs.
    pub fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips()).sum()
    }

    /// Speed of the slowest PE, a VM PE is never faster than that.
    pub fn min_pe_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips()).fold(f64::INFINITY, f64::min)
    }

    /// Divides host capacity among VM demands (index-aligned).
    pub fn share_capacity(&self, vm_demands: &[f64]) -> Vec<f64> {
        max_min_fair(self.total_mips(), vm_demands)
    }
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostSpec {
    /// Number of processing elements.
    pub pes: u32,
    /// Speed of each processing element in MIPS.
    pub mips: f64,
    /// Memory capacity in MB.
    pub ram: u64,
    /// Bandwidth capacity in Mbit/s.
    pub bw: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// Number of such hosts.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

impl Default for HostSpec {
    fn default() -> Self {
        Self {
            pes: 2,
            mips: 3000.,
            ram: 8192,
            bw: 100000,
            storage: 1000000,
            count: 1,
        }
    }
}

impl HostSpec {
    /// Builds `count` hosts with ids starting from `first_id`.
    pub fn build(&self, first_id: u32) -> Vec<Host> {
        (0..self.count)
            .map(|i| {
                let pes = (0..self.pes).map(|pe_id| ProcessingElement::new(pe_id, self.mips)).collect();
                Host::new(first_id + i, pes, self.ram, self.bw, self.storage)
            })
            .collect()
    }
}

/// Static description of a datacenter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatacenterCharacteristics {
    pub architecture: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            architecture: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 10.0,
        }
    }
}

/// Prices of datacenter resources, constant over the run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    /// Price of one second of processing.
    pub per_second: f64,
    /// Price of one MB of memory.
    pub per_memory: f64,
    /// Price of one MB of storage.
    pub per_storage: f64,
    /// Price of one MB transferred.
    pub per_bandwidth: f64,
}

impl CostRates {
    /// Price of keeping a VM with the given memory and image size, charged once per admitted VM.
    pub fn reservation_cost(&self, ram: u64, size: u64) -> f64 {
        self.per_memory * ram as f64 + self.per_storage * size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_spec_builds_identical_hosts() {
        let spec = HostSpec {
            count: 3,
            ..Default::default()
        };
        let hosts = spec.build(10);
        assert_eq!(hosts.iter().map(|h| h.id).collect::<Vec<_>>(), vec![10, 11, 12]);
        assert!(hosts.iter().all(|h| h.pe_count() == 2 && h.total_mips() == 6000.));
    }

    #[test]
    fn host_shares_capacity_among_vms() {
        let host = HostSpec::default().build(0).remove(0);
        assert_eq!(host.share_capacity(&[5000., 5000.]), vec![3000., 3000.]);
        assert_eq!(host.share_capacity(&[2500., 2500.]), vec![2500., 2500.]);
    }
}
