//! Main class for the fog simulation.

use std::collections::BTreeMap;

use crate::context::SimulationContext;
use crate::core::broker::Broker;
use crate::core::config::ResourceSpec;
use crate::core::datacenter::{create_datacenter, DatacenterRegistry};
use crate::core::engine::{EngineConfig, SimulationEngine};
use crate::core::error::FogError;
use crate::core::events::{AdmissionOutcome, CompletionRecord, WorkloadOutcome};
use crate::core::placement::{place, PlacementConfig, PlacementDecision, PlacementPolicy};
use crate::core::sensor::SensorProfile;
use crate::core::tier::Tier;
use crate::core::utilization_model::utilization_model_resolver;
use crate::core::workload::Workload;
use crate::{log_debug, log_info};

/// Wires datacenters, the broker and the engine of one scenario together.
pub struct FogSimulation {
    engine: SimulationEngine,
    broker: Broker,
    ctx: SimulationContext,
}

impl FogSimulation {
    /// Creates datacenters of all tiers in the resource spec.
    pub fn new(resources: &ResourceSpec, engine_config: EngineConfig, broker_name: &str) -> Result<Self, FogError> {
        let ctx = SimulationContext::new("simulation");
        let mut registry = DatacenterRegistry::new();
        for (tier, spec) in &resources.tiers {
            let datacenter = create_datacenter(&mut registry, *tier, &spec.hosts)?;
            log_debug!(
                ctx,
                "created datacenter {} with {} hosts",
                datacenter.name(),
                datacenter.hosts().len()
            );
        }
        Ok(Self {
            engine: SimulationEngine::new(registry, engine_config),
            broker: Broker::new(0, broker_name),
            ctx,
        })
    }

    /// Requests the VM pool of every tier. Tiers without explicit VM count get `default_count` VMs.
    pub fn provision_vms(&mut self, resources: &ResourceSpec, default_count: u32) -> Result<(), FogError> {
        for (tier, spec) in &resources.tiers {
            let count = spec.vm_count.unwrap_or(default_count);
            self.broker.submit_vm_list(&mut self.engine, *tier, count, &spec.vm)?;
        }
        Ok(())
    }

    /// Places sensor workloads and submits them to their VMs.
    ///
    /// The workload id of a sensor is its position in `profiles`. Submission failures are isolated to the
    /// sensor and reported among the outcomes.
    pub fn submit_sensors(
        &mut self,
        profiles: &[SensorProfile],
        config: &PlacementConfig,
        policy: &dyn PlacementPolicy,
    ) -> Result<Vec<PlacementDecision>, FogError> {
        let decisions = place(profiles, config, policy)?;
        let wl = &config.workload;
        for decision in &decisions {
            let utilization_model = utilization_model_resolver(&wl.utilization).map_err(FogError::Config)?;
            let workload_id = decision.sensor_index as u32;
            let workload = Workload::new(
                workload_id,
                self.broker.id,
                decision.length,
                wl.pes,
                wl.input_size,
                wl.output_size,
            )
            .with_utilization_model(utilization_model);
            log_info!(
                self.ctx,
                "sensor {} -> {} tier, vm #{}, length {}",
                decision.sensor,
                decision.tier,
                decision.vm_id,
                decision.length
            );
            self.broker
                .submit_workload(&mut self.engine, decision.tier, workload, decision.vm_id);
        }
        Ok(decisions)
    }

    /// Runs the simulation until all submitted workloads are done.
    pub fn run(&mut self) -> Result<(), FogError> {
        self.broker.run(&mut self.engine)
    }

    /// Completion records sorted by finish time and workload id.
    pub fn records(&self) -> &[CompletionRecord] {
        self.broker.received()
    }

    /// Outcomes of the submitted workloads, in submission order.
    pub fn outcomes(&self) -> Result<Vec<WorkloadOutcome>, FogError> {
        self.broker
            .submitted()
            .iter()
            .map(|id| {
                self.broker
                    .outcome(*id)
                    .ok_or_else(|| FogError::Worker(format!("workload #{} has no outcome", id)))
            })
            .collect()
    }

    /// Memory and storage charges of the admitted VMs, per tier.
    pub fn reservation_costs(&self) -> BTreeMap<Tier, f64> {
        self.engine
            .registry()
            .iter()
            .map(|dc| (dc.tier(), dc.reservation_cost()))
            .collect()
    }

    pub fn vm_outcomes(&self, tier: Tier) -> &[AdmissionOutcome] {
        self.broker.vm_outcomes(tier)
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SimulationEngine {
        &mut self.engine
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Current simulation time.
    pub fn current_time(&self) -> f64 {
        self.engine.time()
    }
}
