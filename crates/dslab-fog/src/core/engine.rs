//! Event-driven execution engine.

use std::collections::BTreeMap;
use std::sync::mpsc::channel;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::context::SimulationContext;
use crate::core::datacenter::{Datacenter, DatacenterRegistry, StepPlan};
use crate::core::error::FogError;
use crate::core::events::{AdmissionOutcome, CompletionRecord};
use crate::core::tier::Tier;
use crate::core::vm::VirtualMachine;
use crate::core::workload::Workload;
use crate::{log_debug, log_error, log_info, log_trace};

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed step length in seconds. When absent the clock jumps to the next workload completion.
    pub step_duration: Option<f64>,
    /// Step length used when no workload makes progress and no fixed step is set.
    pub idle_step: f64,
    /// Number of steps after which the engine gives up.
    pub max_steps: u64,
    /// Whether datacenters are processed on a worker pool.
    pub parallel: bool,
    /// Number of worker threads, defaults to the number of datacenters.
    pub workers: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_duration: None,
            idle_step: 1.,
            max_steps: 1_000_000,
            parallel: false,
            workers: None,
        }
    }
}

/// Discrete-event engine executing workloads on the VMs of all registered datacenters.
///
/// At every step each host divides its capacity among its busy VMs and each VM divides its share among its
/// unfinished workloads (see [`Datacenter::plan_step`]). The step ends at the next workload completion (or after
/// the fixed step duration), then the progress is applied and completed workloads are reported.
///
/// Datacenters never share hosts, so in parallel mode the per-step work of each datacenter runs on a worker pool.
/// All datacenters finish the step before the clock advances.
pub struct SimulationEngine {
    ctx: SimulationContext,
    registry: DatacenterRegistry,
    config: EngineConfig,
    pool: Option<ThreadPool>,
    steps: u64,
    completed: Vec<CompletionRecord>,
}

impl SimulationEngine {
    pub fn new(registry: DatacenterRegistry, config: EngineConfig) -> Self {
        let pool = if config.parallel {
            let workers = config.workers.unwrap_or_else(|| registry.len()).max(1);
            Some(ThreadPool::new(workers))
        } else {
            None
        };
        Self {
            ctx: SimulationContext::new("engine"),
            registry,
            config,
            pool,
            steps: 0,
            completed: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.ctx.time()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Number of processed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn registry(&self) -> &DatacenterRegistry {
        &self.registry
    }

    pub fn datacenter(&self, tier: Tier) -> Result<&Datacenter, FogError> {
        self.registry.get(tier)
    }

    /// Requests creation of the VMs in the datacenter of the tier.
    pub fn admit_vms(&mut self, tier: Tier, vms: Vec<VirtualMachine>) -> Result<Vec<AdmissionOutcome>, FogError> {
        let datacenter = self.registry.get_mut(tier)?;
        Ok(vms.into_iter().map(|vm| datacenter.create_vm(vm)).collect())
    }

    /// Binds the workload to the VM of the tier.
    pub fn submit(&mut self, tier: Tier, workload: Workload, vm_id: u32) -> Result<(), FogError> {
        self.registry.get_mut(tier)?.submit(workload, vm_id)
    }

    pub fn pending_workloads(&self) -> usize {
        self.registry.iter().map(|dc| dc.pending_workloads()).sum()
    }

    /// Completion records collected so far, in completion order.
    pub fn completed(&self) -> &[CompletionRecord] {
        &self.completed
    }

    /// Computes the resource sharing of the next step without executing it.
    pub fn plan_step(&mut self) -> Result<BTreeMap<Tier, StepPlan>, FogError> {
        let time = self.ctx.time();
        let plans = self.for_each_datacenter(move |dc| {
            dc.set_time(time);
            (dc.tier(), dc.plan_step(time))
        })?;
        Ok(plans.into_iter().collect())
    }

    /// Processes one step, returns workloads completed in it.
    pub fn step(&mut self) -> Result<Vec<CompletionRecord>, FogError> {
        let start = self.ctx.time();
        let plans = self.plan_step()?;
        let next_completion = plans
            .values()
            .filter_map(|plan| plan.next_completion)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |cur| cur.min(t))));
        let duration = match (self.config.step_duration, next_completion) {
            (Some(step), _) => step,
            (None, Some(t)) => t,
            (None, None) => {
                log_trace!(self.ctx, "no workload makes progress, idle step");
                self.config.idle_step
            }
        };

        let plans = Arc::new(plans);
        let mut completed: Vec<CompletionRecord> = self
            .for_each_datacenter(move |dc| match plans.get(&dc.tier()) {
                Some(plan) => dc.apply_step(plan, start, duration),
                None => Vec::new(),
            })?
            .into_iter()
            .flatten()
            .collect();
        completed.sort_by_key(|record| record.workload_id);

        self.ctx.advance_to(start + duration);
        self.steps += 1;
        log_debug!(
            self.ctx,
            "step #{} done, {} workloads completed",
            self.steps,
            completed.len()
        );
        self.completed.extend(completed.iter().cloned());
        Ok(completed)
    }

    /// Runs steps until every admitted workload is completed.
    ///
    /// Returns all completion records sorted by finish time and workload id.
    pub fn run_until_idle(&mut self) -> Result<Vec<CompletionRecord>, FogError> {
        log_info!(self.ctx, "started with {} pending workloads", self.pending_workloads());
        while self.pending_workloads() > 0 {
            if self.steps >= self.config.max_steps {
                let pending = self.pending_workloads();
                for datacenter in self.registry.iter_mut() {
                    datacenter.fail_pending();
                }
                log_error!(self.ctx, "gave up after {} steps with {} pending workloads", self.steps, pending);
                return Err(FogError::EngineStalled {
                    time: self.ctx.time(),
                    steps: self.steps,
                    pending,
                });
            }
            self.step()?;
        }
        log_info!(self.ctx, "finished after {} steps", self.steps);
        let mut records = self.completed.clone();
        records.sort_by(|a, b| {
            a.finish_time
                .total_cmp(&b.finish_time)
                .then(a.workload_id.cmp(&b.workload_id))
        });
        Ok(records)
    }

    /// Applies `f` to every datacenter, on the worker pool in parallel mode.
    ///
    /// Results are returned in tier order. In parallel mode the call returns only after all datacenters are done.
    fn for_each_datacenter<R, F>(&mut self, f: F) -> Result<Vec<R>, FogError>
    where
        R: Send + 'static,
        F: Fn(&mut Datacenter) -> R + Send + Sync + 'static,
    {
        let pool = match &self.pool {
            Some(pool) => pool,
            None => return Ok(self.registry.iter_mut().map(f).collect()),
        };

        let f = Arc::new(f);
        let (tx, rx) = channel();
        let datacenters = self.registry.take_all();
        let len = datacenters.len();
        for (idx, mut datacenter) in datacenters.into_iter().enumerate() {
            let tx = tx.clone();
            let f = f.clone();
            pool.execute(move || {
                let result = f(&mut datacenter);
                tx.send((idx, datacenter, result)).ok();
            });
        }
        drop(tx);

        let mut results: Vec<_> = rx.iter().take(len).collect();
        results.sort_by_key(|x| x.0);
        let mut datacenters = Vec::with_capacity(len);
        let mut values = Vec::with_capacity(len);
        for (_, datacenter, value) in results {
            datacenters.push(datacenter);
            values.push(value);
        }
        self.registry.restore(datacenters);
        if values.len() != len {
            return Err(FogError::Worker(format!("{} of {} datacenters were lost", len - values.len(), len)));
        }
        Ok(values)
    }
}
