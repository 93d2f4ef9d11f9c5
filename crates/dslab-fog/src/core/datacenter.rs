//! Datacenters and the per-tier registry.

use std::collections::BTreeMap;

use crate::context::SimulationContext;
use crate::core::common::AllocationVerdict;
use crate::core::error::FogError;
use crate::core::events::{AdmissionOutcome, CompletionRecord};
use crate::core::fair_share::max_min_fair;
use crate::core::resource::{CostRates, DatacenterCharacteristics, Host, HostSpec};
use crate::core::resource_pool::ResourcePoolState;
use crate::core::tier::Tier;
use crate::core::vm::{VirtualMachine, VmStatus};
use crate::core::vm_placement_algorithm::{FirstFit, VMPlacementAlgorithm};
use crate::core::workload::{Workload, WorkloadStatus};
use crate::{log_debug, log_info, log_warn};

/// Relative tolerance under which the remaining length of a workload counts as done.
const COMPLETION_TOLERANCE: f64 = 1e-9;

/// Returns the fixed price table of the tier.
pub fn cost_rates(tier: Tier) -> CostRates {
    match tier {
        Tier::Edge => CostRates {
            per_second: 4.0,
            per_memory: 0.08,
            per_storage: 0.002,
            per_bandwidth: 0.01,
        },
        Tier::Fog => CostRates {
            per_second: 3.5,
            per_memory: 0.06,
            per_storage: 0.0015,
            per_bandwidth: 0.005,
        },
        Tier::Cloud => CostRates {
            per_second: 3.0,
            per_memory: 0.05,
            per_storage: 0.001,
            per_bandwidth: 0.0,
        },
    }
}

/// Capacity granted to one VM during a step.
#[derive(Clone, Debug, PartialEq)]
pub struct VmShare {
    pub vm_id: u32,
    pub host_id: u32,
    /// Maximum speed of the VM.
    pub capacity: f64,
    /// Speed granted by the host.
    pub granted: f64,
    /// Sum of the speeds granted to the VM workloads.
    pub workloads_total: f64,
}

/// Speed at which a workload executes during a step.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkloadRate {
    pub vm_id: u32,
    pub workload_id: u32,
    pub rate: f64,
}

/// Resource sharing computed for one step of one datacenter.
#[derive(Clone, Debug, Default)]
pub struct StepPlan {
    pub vm_shares: Vec<VmShare>,
    pub rates: Vec<WorkloadRate>,
    /// Time until the first workload completion at the planned rates.
    pub next_completion: Option<f64>,
}

/// Datacenter of one tier: hosts, prices and the pool of VMs admitted to it.
pub struct Datacenter {
    name: String,
    tier: Tier,
    characteristics: DatacenterCharacteristics,
    cost: CostRates,
    hosts: Vec<Host>,
    pool_state: ResourcePoolState,
    vm_placement_algorithm: Box<dyn VMPlacementAlgorithm>,
    vms: BTreeMap<u32, VirtualMachine>,
    ctx: SimulationContext,
}

impl Datacenter {
    /// Creates datacenter of the tier, validating host specs.
    pub fn new(tier: Tier, host_specs: &[HostSpec]) -> Result<Self, FogError> {
        let insufficient = |reason: String| FogError::InsufficientSpec { tier, reason };
        for spec in host_specs {
            if spec.pes == 0 {
                return Err(insufficient("host without processing elements".to_string()));
            }
            if !(spec.mips.is_finite() && spec.mips > 0.) {
                return Err(insufficient(format!("bad PE speed {}", spec.mips)));
            }
            if spec.ram == 0 || spec.bw == 0 || spec.storage == 0 {
                return Err(insufficient("host with zero memory, bandwidth or storage".to_string()));
            }
        }
        let mut hosts = Vec::new();
        for spec in host_specs {
            hosts.extend(spec.build(hosts.len() as u32));
        }
        if hosts.is_empty() {
            return Err(insufficient("no hosts".to_string()));
        }

        let mut pool_state = ResourcePoolState::new();
        for host in &hosts {
            pool_state.add_host(host);
        }
        let name = tier.to_string();
        Ok(Self {
            ctx: SimulationContext::new(name.clone()),
            name,
            tier,
            characteristics: DatacenterCharacteristics::default(),
            cost: cost_rates(tier),
            hosts,
            pool_state,
            vm_placement_algorithm: Box::new(FirstFit::new()),
            vms: BTreeMap::new(),
        })
    }

    pub fn with_placement_algorithm(mut self, algorithm: Box<dyn VMPlacementAlgorithm>) -> Self {
        self.vm_placement_algorithm = algorithm;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    pub fn cost(&self) -> &CostRates {
        &self.cost
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn pool_state(&self) -> &ResourcePoolState {
        &self.pool_state
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    pub fn vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.values()
    }

    /// Number of VMs requested in this datacenter, including the ones which failed admission.
    pub fn vm_pool_size(&self) -> u32 {
        self.vms.len() as u32
    }

    /// Memory and storage charges of the VMs admitted to this datacenter.
    pub fn reservation_cost(&self) -> f64 {
        self.vms
            .values()
            .filter(|vm| vm.status() == VmStatus::Running)
            .map(|vm| self.cost.reservation_cost(vm.spec.ram, vm.spec.size))
            .sum()
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.ctx.advance_to(time);
    }

    /// Reserves host capacity for the VM, succeeds iff the host has enough unreserved resources.
    ///
    /// A VM without PEs or with non-positive PE speed is never admitted.
    pub fn admit(&mut self, vm: &mut VirtualMachine, host_id: u32) -> bool {
        if !vm.spec.is_runnable() {
            return false;
        }
        if self.pool_state.allocate(&vm.allocation(), host_id) == AllocationVerdict::Success {
            vm.bind_to_host(host_id);
            true
        } else {
            false
        }
    }

    /// Adds the VM to the pool, placing it on the host selected by the placement algorithm.
    ///
    /// A VM which fits no host stays in the pool with `FailedToAllocate` status.
    pub fn create_vm(&mut self, mut vm: VirtualMachine) -> AdmissionOutcome {
        let vm_id = vm.id;
        let selected = self
            .vm_placement_algorithm
            .select_host(&vm.allocation(), &self.pool_state);
        let outcome = match selected {
            Some(host_id) if self.admit(&mut vm, host_id) => {
                log_debug!(self.ctx, "vm #{} admitted on host #{}", vm_id, host_id);
                AdmissionOutcome::Admitted { vm_id, host_id }
            }
            _ => {
                vm.mark_failed();
                if vm.spec.is_runnable() {
                    log_warn!(self.ctx, "vm #{} does not fit any host", vm_id);
                } else {
                    log_warn!(self.ctx, "vm #{} has no processing capacity", vm_id);
                }
                AdmissionOutcome::Failed { vm_id }
            }
        };
        self.vms.insert(vm_id, vm);
        outcome
    }

    /// Binds the workload to the VM of this datacenter.
    pub fn submit(&mut self, mut workload: Workload, vm_id: u32) -> Result<(), FogError> {
        let tier = self.tier;
        let pool_size = self.vm_pool_size();
        let vm = self
            .vms
            .get_mut(&vm_id)
            .ok_or(FogError::VmNotFound { tier, vm_id, pool_size })?;
        if vm.status() != VmStatus::Running {
            return Err(FogError::AdmissionFailure { tier, vm_id });
        }
        if workload.pes == 0 {
            return Err(FogError::Config(format!(
                "workload #{} requests no processing elements",
                workload.id
            )));
        }
        if !workload.bind(vm_id) {
            return Err(FogError::Config(format!("workload #{} is already bound", workload.id)));
        }
        log_debug!(self.ctx, "workload #{} bound to vm #{}", workload.id, vm_id);
        vm.workloads_mut().push(workload);
        Ok(())
    }

    /// Number of workloads that are not completed yet.
    pub fn pending_workloads(&self) -> usize {
        self.vms
            .values()
            .flat_map(|vm| vm.workloads())
            .filter(|w| !w.is_finished())
            .count()
    }

    /// Computes how host and VM capacity is shared during a step starting at `time`.
    pub fn plan_step(&self, time: f64) -> StepPlan {
        let mut plan = StepPlan::default();
        for host in &self.hosts {
            let resident: Vec<&VirtualMachine> = self
                .vms
                .values()
                .filter(|vm| vm.host_id() == Some(host.id))
                .collect();
            let demands: Vec<f64> = resident.iter().map(|vm| vm.demand()).collect();
            let grants = host.share_capacity(&demands);

            for (vm, granted) in resident.into_iter().zip(grants) {
                let active: Vec<&Workload> = vm.workloads().iter().filter(|w| !w.is_finished()).collect();
                let caps: Vec<f64> = active.iter().map(|w| vm.workload_cap(w)).collect();
                let shares = max_min_fair(granted.min(vm.capacity()), &caps);
                for (workload, share) in active.into_iter().zip(shares.iter()) {
                    let rate = share * workload.utilization(time);
                    let remaining = workload.remaining();
                    let until_done = if remaining <= COMPLETION_TOLERANCE * (workload.length.max(1) as f64) {
                        Some(0.)
                    } else if rate > 0. {
                        Some(remaining / rate)
                    } else {
                        None
                    };
                    if let Some(t) = until_done {
                        plan.next_completion = Some(plan.next_completion.map_or(t, |cur: f64| cur.min(t)));
                    }
                    plan.rates.push(WorkloadRate {
                        vm_id: vm.id,
                        workload_id: workload.id,
                        rate,
                    });
                }
                if !shares.is_empty() {
                    plan.vm_shares.push(VmShare {
                        vm_id: vm.id,
                        host_id: host.id,
                        capacity: vm.capacity(),
                        granted,
                        workloads_total: shares.iter().sum(),
                    });
                }
            }
        }
        plan
    }

    /// Executes the planned step of length `duration` starting at `start`, returns completed workloads.
    pub fn apply_step(&mut self, plan: &StepPlan, start: f64, duration: f64) -> Vec<CompletionRecord> {
        let finish = start + duration;
        let tier = self.tier;
        let cost = self.cost;
        let mut completed = Vec::new();
        for entry in &plan.rates {
            let vm = match self.vms.get_mut(&entry.vm_id) {
                Some(vm) => vm,
                None => continue,
            };
            let host_id = vm.host_id().unwrap_or_default();
            let workload = match vm.workloads_mut().iter_mut().find(|w| w.id == entry.workload_id) {
                Some(w) => w,
                None => continue,
            };
            if workload.is_finished() {
                continue;
            }
            workload.start(start);
            workload.progress(entry.rate * duration);
            if workload.remaining() <= COMPLETION_TOLERANCE * (workload.length.max(1) as f64) {
                workload.complete(finish);
                let exec_start_time = workload.exec_start_time().unwrap_or(start);
                let actual_cpu_time = finish - exec_start_time;
                let transferred = (workload.input_size + workload.output_size) as f64;
                completed.push(CompletionRecord {
                    workload_id: workload.id,
                    vm_id: entry.vm_id,
                    host_id,
                    tier,
                    exec_start_time,
                    finish_time: finish,
                    actual_cpu_time,
                    processing_cost: cost.per_second * actual_cpu_time + cost.per_bandwidth * transferred,
                });
            }
        }
        self.ctx.advance_to(finish);
        for record in &completed {
            log_info!(
                self.ctx,
                "workload #{} completed on vm #{} (cpu time {:.3})",
                record.workload_id,
                record.vm_id,
                record.actual_cpu_time
            );
        }
        completed
    }

    /// Marks unfinished workloads as failed, used when the engine gives up.
    pub(crate) fn fail_pending(&mut self) -> Vec<u32> {
        let mut failed = Vec::new();
        for vm in self.vms.values_mut() {
            for workload in vm.workloads_mut().iter_mut() {
                if matches!(workload.status(), WorkloadStatus::Admitted | WorkloadStatus::Executing) {
                    workload.fail();
                    failed.push(workload.id);
                }
            }
        }
        failed
    }
}

/// Datacenters of the simulation keyed by tier, at most one per tier.
#[derive(Default)]
pub struct DatacenterRegistry {
    datacenters: BTreeMap<Tier, Datacenter>,
}

impl DatacenterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, datacenter: Datacenter) -> Result<(), FogError> {
        let tier = datacenter.tier();
        if self.datacenters.contains_key(&tier) {
            return Err(FogError::InsufficientSpec {
                tier,
                reason: "datacenter for this tier is already registered".to_string(),
            });
        }
        self.datacenters.insert(tier, datacenter);
        Ok(())
    }

    /// Resolves the datacenter serving the tier.
    pub fn get(&self, tier: Tier) -> Result<&Datacenter, FogError> {
        self.datacenters.get(&tier).ok_or(FogError::TierNotRegistered(tier))
    }

    pub fn get_mut(&mut self, tier: Tier) -> Result<&mut Datacenter, FogError> {
        self.datacenters.get_mut(&tier).ok_or(FogError::TierNotRegistered(tier))
    }

    pub fn tiers(&self) -> Vec<Tier> {
        self.datacenters.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.datacenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datacenters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Datacenter> {
        self.datacenters.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Datacenter> {
        self.datacenters.values_mut()
    }

    pub(crate) fn take_all(&mut self) -> Vec<Datacenter> {
        std::mem::take(&mut self.datacenters).into_values().collect()
    }

    pub(crate) fn restore(&mut self, datacenters: Vec<Datacenter>) {
        for datacenter in datacenters {
            self.datacenters.insert(datacenter.tier(), datacenter);
        }
    }
}

/// Creates datacenter of the tier from host specs and registers it.
pub fn create_datacenter<'a>(
    registry: &'a mut DatacenterRegistry,
    tier: Tier,
    host_specs: &[HostSpec],
) -> Result<&'a Datacenter, FogError> {
    registry.register(Datacenter::new(tier, host_specs)?)?;
    registry.get(tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vm::{create_vms, VmSpec};

    #[test]
    fn tiers_have_distinct_prices() {
        for (i, a) in Tier::ALL.iter().enumerate() {
            for b in Tier::ALL.iter().skip(i + 1) {
                let (ca, cb) = (cost_rates(*a), cost_rates(*b));
                assert_ne!(ca.per_second, cb.per_second);
                assert_ne!(ca.per_memory, cb.per_memory);
                assert_ne!(ca.per_storage, cb.per_storage);
                assert_ne!(ca.per_bandwidth, cb.per_bandwidth);
            }
        }
    }

    #[test]
    fn rejects_empty_specs() {
        assert!(matches!(
            Datacenter::new(Tier::Fog, &[]),
            Err(FogError::InsufficientSpec { tier: Tier::Fog, .. })
        ));
        let no_pes = HostSpec {
            pes: 0,
            ..Default::default()
        };
        assert!(Datacenter::new(Tier::Edge, &[no_pes]).is_err());
    }

    #[test]
    fn duplicate_tier_is_rejected() {
        let mut registry = DatacenterRegistry::new();
        create_datacenter(&mut registry, Tier::Edge, &[HostSpec::default()]).unwrap();
        assert!(create_datacenter(&mut registry, Tier::Edge, &[HostSpec::default()]).is_err());
        assert!(matches!(registry.get(Tier::Cloud), Err(FogError::TierNotRegistered(Tier::Cloud))));
    }

    #[test]
    fn first_fit_fills_hosts_in_order() {
        let spec = HostSpec {
            count: 3,
            ..Default::default()
        };
        let mut dc = Datacenter::new(Tier::Cloud, &[spec]).unwrap();
        let outcomes: Vec<_> = create_vms(0, 5, &VmSpec::default())
            .into_iter()
            .map(|vm| dc.create_vm(vm))
            .collect();
        let hosts: Vec<_> = outcomes
            .iter()
            .map(|o| match o {
                AdmissionOutcome::Admitted { host_id, .. } => *host_id,
                AdmissionOutcome::Failed { .. } => u32::MAX,
            })
            .collect();
        assert_eq!(hosts, vec![0, 0, 1, 1, 2]);
    }

    #[test]
    fn submit_to_missing_vm_fails() {
        let mut dc = Datacenter::new(Tier::Fog, &[HostSpec::default()]).unwrap();
        dc.create_vm(VirtualMachine::new(0, 0, VmSpec::default()));
        let err = dc.submit(Workload::new(0, 0, 100, 1, 300, 300), 4).unwrap_err();
        assert_eq!(
            err,
            FogError::VmNotFound {
                tier: Tier::Fog,
                vm_id: 4,
                pool_size: 1
            }
        );
    }

    #[test]
    fn vm_without_capacity_is_not_admitted() {
        let mut dc = Datacenter::new(Tier::Cloud, &[HostSpec::default()]).unwrap();
        let no_pes = VmSpec {
            pes: 0,
            ..Default::default()
        };
        let no_mips = VmSpec {
            mips: 0.,
            ..Default::default()
        };
        assert_eq!(
            dc.create_vm(VirtualMachine::new(0, 0, no_pes)),
            AdmissionOutcome::Failed { vm_id: 0 }
        );
        assert_eq!(
            dc.create_vm(VirtualMachine::new(1, 0, no_mips)),
            AdmissionOutcome::Failed { vm_id: 1 }
        );
        assert_eq!(dc.vm(0).unwrap().status(), VmStatus::FailedToAllocate);
        assert_eq!(dc.vm(1).unwrap().status(), VmStatus::FailedToAllocate);
        assert!(matches!(
            dc.submit(Workload::new(0, 0, 100, 1, 300, 300), 0),
            Err(FogError::AdmissionFailure { vm_id: 0, .. })
        ));
        assert_eq!(dc.pool_state().get_available_pes(0), 2);
        assert!(dc.pool_state().get_allocations(0).is_empty());
    }

    #[test]
    fn workload_without_pes_is_rejected() {
        let mut dc = Datacenter::new(Tier::Fog, &[HostSpec::default()]).unwrap();
        dc.create_vm(VirtualMachine::new(0, 0, VmSpec::default()));
        assert!(matches!(
            dc.submit(Workload::new(0, 0, 100, 0, 300, 300), 0),
            Err(FogError::Config(_))
        ));
        dc.submit(Workload::new(1, 0, 100, 1, 300, 300), 0).unwrap();
        assert_eq!(dc.pending_workloads(), 1);
    }

    #[test]
    fn reservation_cost_counts_admitted_vms_only() {
        let mut dc = Datacenter::new(Tier::Edge, &[HostSpec::default()]).unwrap();
        for vm in create_vms(0, 3, &VmSpec::default()) {
            dc.create_vm(vm);
        }
        // one host with 2 PEs admits two single-PE VMs
        assert_eq!(dc.vm(2).unwrap().status(), VmStatus::FailedToAllocate);
        let per_vm = 0.08 * 2048. + 0.002 * 10000.;
        assert!((dc.reservation_cost() - 2. * per_vm).abs() < 1e-9);
    }
}
