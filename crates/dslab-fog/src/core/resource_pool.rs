//! Resource pool state.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::resource::Host;

/// Stores host properties (resource capacity) and state (available resources, current allocations).
#[derive(Clone, Debug)]
pub struct HostInfo {
    pub pes_total: u32,
    pub pe_mips: f64,
    pub ram_total: u64,
    pub bw_total: u64,
    pub storage_total: u64,

    pub pes_available: u32,
    pub ram_available: u64,
    pub bw_available: u64,
    pub storage_available: u64,

    pub allocations: BTreeMap<u32, Allocation>,
}

impl HostInfo {
    fn new(host: &Host) -> Self {
        Self {
            pes_total: host.pe_count(),
            pe_mips: host.min_pe_mips(),
            ram_total: host.ram,
            bw_total: host.bw,
            storage_total: host.storage,
            pes_available: host.pe_count(),
            ram_available: host.ram,
            bw_available: host.bw,
            storage_available: host.storage,
            allocations: BTreeMap::new(),
        }
    }
}

/// Reservation bookkeeping of the hosts of one datacenter.
///
/// Reservations are never overcommitted: an allocation is applied only after
/// [`can_allocate`](Self::can_allocate) returned [`AllocationVerdict::Success`].
#[derive(Clone, Debug, Default)]
pub struct ResourcePoolState {
    hosts: BTreeMap<u32, HostInfo>,
}

impl ResourcePoolState {
    /// Creates empty resource pool state.
    pub fn new() -> Self {
        Self { hosts: BTreeMap::new() }
    }

    /// Adds host to resource pool.
    pub fn add_host(&mut self, host: &Host) {
        self.hosts.insert(host.id, HostInfo::new(host));
    }

    /// Returns IDs of all hosts in ascending order.
    pub fn get_hosts_list(&self) -> Vec<u32> {
        self.hosts.keys().cloned().collect()
    }

    /// Checks if the specified allocation is currently possible on the specified host.
    pub fn can_allocate(&self, alloc: &Allocation, host_id: u32) -> AllocationVerdict {
        let host = match self.hosts.get(&host_id) {
            Some(host) => host,
            None => return AllocationVerdict::HostNotFound,
        };
        if host.pes_available < alloc.pes {
            return AllocationVerdict::NotEnoughPEs;
        }
        if host.pe_mips < alloc.mips {
            return AllocationVerdict::SlowPEs;
        }
        if host.ram_available < alloc.ram {
            return AllocationVerdict::NotEnoughMemory;
        }
        if host.bw_available < alloc.bw {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        if host.storage_available < alloc.storage {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    /// Reserves the allocation on the host if it fits, returns the verdict.
    pub fn allocate(&mut self, alloc: &Allocation, host_id: u32) -> AllocationVerdict {
        let verdict = self.can_allocate(alloc, host_id);
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        if let Some(host) = self.hosts.get_mut(&host_id) {
            if !host.allocations.contains_key(&alloc.id) {
                host.pes_available -= alloc.pes;
                host.ram_available -= alloc.ram;
                host.bw_available -= alloc.bw;
                host.storage_available -= alloc.storage;
                host.allocations.insert(alloc.id, alloc.clone());
            }
        }
        verdict
    }

    /// Returns the amount of unreserved PEs on the specified host.
    pub fn get_available_pes(&self, host_id: u32) -> u32 {
        self.hosts.get(&host_id).map_or(0, |h| h.pes_available)
    }

    /// Returns the amount of unreserved memory on the specified host.
    pub fn get_available_ram(&self, host_id: u32) -> u64 {
        self.hosts.get(&host_id).map_or(0, |h| h.ram_available)
    }

    /// Returns IDs of the VMs with reservations on the specified host.
    pub fn get_allocations(&self, host_id: u32) -> Vec<u32> {
        self.hosts
            .get(&host_id)
            .map(|h| h.allocations.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the PE reservation rate (ratio of reserved to total PEs) of the specified host.
    pub fn get_pe_load(&self, host_id: u32) -> f64 {
        match self.hosts.get(&host_id) {
            Some(h) => 1. - h.pes_available as f64 / h.pes_total as f64,
            None => 0.,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::{Host, ProcessingElement};

    fn host(id: u32, pes: u32) -> Host {
        let pes = (0..pes).map(|i| ProcessingElement::new(i, 3000.)).collect();
        Host::new(id, pes, 8192, 100000, 1000000)
    }

    fn alloc(id: u32, pes: u32, ram: u64) -> Allocation {
        Allocation {
            id,
            pes,
            mips: 2500.,
            ram,
            bw: 10000,
            storage: 10000,
        }
    }

    #[test]
    fn reservations_never_exceed_capacity() {
        let mut pool = ResourcePoolState::new();
        pool.add_host(&host(0, 2));
        assert_eq!(pool.allocate(&alloc(0, 1, 2048), 0), AllocationVerdict::Success);
        assert_eq!(pool.allocate(&alloc(1, 1, 2048), 0), AllocationVerdict::Success);
        assert_eq!(pool.allocate(&alloc(2, 1, 2048), 0), AllocationVerdict::NotEnoughPEs);
        assert_eq!(pool.get_available_pes(0), 0);
        assert_eq!(pool.get_available_ram(0), 4096);
        assert_eq!(pool.get_allocations(0), vec![0, 1]);
        assert_eq!(pool.get_pe_load(0), 1.);
    }

    #[test]
    fn memory_is_checked_after_pes() {
        let mut pool = ResourcePoolState::new();
        pool.add_host(&host(0, 4));
        assert_eq!(pool.allocate(&alloc(0, 1, 8000), 0), AllocationVerdict::Success);
        assert_eq!(pool.can_allocate(&alloc(1, 1, 1024), 0), AllocationVerdict::NotEnoughMemory);
        assert_eq!(pool.can_allocate(&alloc(1, 1, 1024), 7), AllocationVerdict::HostNotFound);
    }

    #[test]
    fn slow_pes_reject_vm() {
        let mut pool = ResourcePoolState::new();
        pool.add_host(&host(0, 2));
        let mut fast = alloc(0, 1, 1024);
        fast.mips = 3500.;
        assert_eq!(pool.can_allocate(&fast, 0), AllocationVerdict::SlowPEs);
    }
}
