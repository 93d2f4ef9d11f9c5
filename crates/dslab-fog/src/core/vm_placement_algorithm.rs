//! Binding of VM creation requests to hosts.

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::resource_pool::ResourcePoolState;

/// Trait for implementation of VM placement algorithms.
///
/// The algorithm is defined as a function of VM allocation request and current resource pool state, which returns an
/// ID of host selected for VM placement or `None` if there is not suitable host.
pub trait VMPlacementAlgorithm: Send + Sync {
    fn select_host(&self, alloc: &Allocation, pool_state: &ResourcePoolState) -> Option<u32>;
}

/// Uses the first suitable host in host id order.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VMPlacementAlgorithm for FirstFit {
    fn select_host(&self, alloc: &Allocation, pool_state: &ResourcePoolState) -> Option<u32> {
        pool_state
            .get_hosts_list()
            .into_iter()
            .find(|&host| pool_state.can_allocate(alloc, host) == AllocationVerdict::Success)
    }
}
