//! Broker mediating between the user and the engine.

use std::collections::BTreeMap;

use crate::context::SimulationContext;
use crate::core::engine::SimulationEngine;
use crate::core::error::FogError;
use crate::core::events::{AdmissionOutcome, CompletionRecord, WorkloadFailure, WorkloadOutcome};
use crate::core::tier::Tier;
use crate::core::vm::{create_vms, VmSpec};
use crate::core::workload::Workload;
use crate::{log_debug, log_info, log_warn};

/// Owns the VM pools and workloads of a user and collects their results.
pub struct Broker {
    pub id: u32,
    vm_outcomes: BTreeMap<Tier, Vec<AdmissionOutcome>>,
    submitted: Vec<u32>,
    received: Vec<CompletionRecord>,
    failed: Vec<WorkloadFailure>,
    ctx: SimulationContext,
}

impl Broker {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            vm_outcomes: BTreeMap::new(),
            submitted: Vec::new(),
            received: Vec::new(),
            failed: Vec::new(),
            ctx: SimulationContext::new(name),
        }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// Creates `count` identical VMs in the datacenter of the tier and requests their admission.
    pub fn submit_vm_list(
        &mut self,
        engine: &mut SimulationEngine,
        tier: Tier,
        count: u32,
        spec: &VmSpec,
    ) -> Result<&[AdmissionOutcome], FogError> {
        let outcomes = engine.admit_vms(tier, create_vms(self.id, count, spec))?;
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o, AdmissionOutcome::Failed { .. }))
            .count();
        if failed > 0 {
            log_warn!(self.ctx, "{} of {} vms failed admission in {} tier", failed, count, tier);
        } else {
            log_debug!(self.ctx, "{} vms admitted in {} tier", count, tier);
        }
        let entry = self.vm_outcomes.entry(tier).or_default();
        entry.extend(outcomes);
        Ok(entry.as_slice())
    }

    /// Admission results of the VMs requested in the tier.
    pub fn vm_outcomes(&self, tier: Tier) -> &[AdmissionOutcome] {
        self.vm_outcomes.get(&tier).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Submits the workload bound to the VM of the tier.
    ///
    /// A failed submission is recorded and isolated to this workload, the method returns `false` then.
    pub fn submit_workload(
        &mut self,
        engine: &mut SimulationEngine,
        tier: Tier,
        workload: Workload,
        vm_id: u32,
    ) -> bool {
        let workload_id = workload.id;
        self.submitted.push(workload_id);
        match engine.submit(tier, workload, vm_id) {
            Ok(()) => true,
            Err(error) => {
                log_warn!(self.ctx, "workload #{} is not scheduled: {}", workload_id, error);
                self.failed.push(WorkloadFailure {
                    workload_id,
                    tier,
                    vm_id,
                    error,
                });
                false
            }
        }
    }

    /// Runs the engine until all submitted workloads are done and receives the completion records.
    pub fn run(&mut self, engine: &mut SimulationEngine) -> Result<(), FogError> {
        let records = engine.run_until_idle()?;
        self.ctx.advance_to(engine.time());
        log_info!(
            self.ctx,
            "received {} completed workloads, {} failed",
            records.len(),
            self.failed.len()
        );
        self.received = records;
        Ok(())
    }

    pub fn submitted(&self) -> &[u32] {
        &self.submitted
    }

    pub fn received(&self) -> &[CompletionRecord] {
        &self.received
    }

    pub fn failed(&self) -> &[WorkloadFailure] {
        &self.failed
    }

    /// Returns the final state of the workload, `None` if it was not submitted or is not done yet.
    pub fn outcome(&self, workload_id: u32) -> Option<WorkloadOutcome> {
        if let Some(record) = self.received.iter().find(|r| r.workload_id == workload_id) {
            return Some(WorkloadOutcome::Completed(record.clone()));
        }
        self.failed
            .iter()
            .find(|f| f.workload_id == workload_id)
            .map(|f| WorkloadOutcome::Failed(f.clone()))
    }
}
