use approx::assert_relative_eq;

use dslab_fog::core::datacenter::{create_datacenter, DatacenterRegistry};
use dslab_fog::core::engine::{EngineConfig, SimulationEngine};
use dslab_fog::core::events::AdmissionOutcome;
use dslab_fog::core::resource::HostSpec;
use dslab_fog::core::tier::Tier;
use dslab_fog::core::vm::{create_vms, VmSpec};
use dslab_fog::core::workload::{Workload, WorkloadStatus};

fn engine_with(host: HostSpec, config: EngineConfig) -> SimulationEngine {
    let mut registry = DatacenterRegistry::new();
    create_datacenter(&mut registry, Tier::Fog, &[host]).unwrap();
    SimulationEngine::new(registry, config)
}

#[test]
// A 2-PE VM runs workloads of 1 and 2 PEs: every step the VM grants stay within its capacity
// and no workload runs faster than its own cap.
fn test_vm_shares_never_exceed_capacity() {
    let mut engine = engine_with(HostSpec::default(), EngineConfig::default());
    let spec = VmSpec {
        pes: 2,
        ..Default::default()
    };
    let outcomes = engine.admit_vms(Tier::Fog, create_vms(0, 1, &spec)).unwrap();
    assert_eq!(outcomes, vec![AdmissionOutcome::Admitted { vm_id: 0, host_id: 0 }]);

    engine.submit(Tier::Fog, Workload::new(0, 0, 4000, 1, 0, 0), 0).unwrap();
    engine.submit(Tier::Fog, Workload::new(1, 0, 6000, 1, 0, 0), 0).unwrap();
    engine.submit(Tier::Fog, Workload::new(2, 0, 9000, 2, 0, 0), 0).unwrap();

    let mut steps = 0;
    while engine.pending_workloads() > 0 {
        let plans = engine.plan_step().unwrap();
        for share in &plans[&Tier::Fog].vm_shares {
            assert!(share.granted <= share.capacity + 1e-9);
            assert!(share.workloads_total <= share.granted + 1e-9);
        }
        for rate in &plans[&Tier::Fog].rates {
            let cap = if rate.workload_id == 2 { 5000. } else { 2500. };
            assert!(rate.rate <= cap + 1e-9);
        }
        engine.step().unwrap();
        steps += 1;
        assert!(steps < 10);
    }

    let records = engine.run_until_idle().unwrap();
    assert_eq!(records.len(), 3);
    // 5000 MIPS shared by three workloads: 1666.67 each until #0 completes at 2.4
    assert_eq!(records[0].workload_id, 0);
    assert_relative_eq!(records[0].finish_time, 2.4, max_relative = 1e-9);
    for pair in records.windows(2) {
        assert!(pair[0].finish_time <= pair[1].finish_time);
    }
}

#[test]
fn test_host_capacity_is_shared_fairly() {
    // one 2-PE host of 3000 MIPS, two 1-PE VMs of 2500 MIPS: each VM gets its full speed
    let mut engine = engine_with(HostSpec::default(), EngineConfig::default());
    engine.admit_vms(Tier::Fog, create_vms(0, 2, &VmSpec::default())).unwrap();
    engine.submit(Tier::Fog, Workload::new(0, 0, 2500, 1, 0, 0), 0).unwrap();
    engine.submit(Tier::Fog, Workload::new(1, 0, 5000, 1, 0, 0), 1).unwrap();

    let plans = engine.plan_step().unwrap();
    let shares = &plans[&Tier::Fog].vm_shares;
    assert_eq!(shares.len(), 2);
    assert!(shares.iter().all(|s| s.granted == 2500.));
    assert_eq!(plans[&Tier::Fog].next_completion, Some(1.));

    let completed = engine.step().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(engine.time(), 1.);
    let records = engine.run_until_idle().unwrap();
    assert_relative_eq!(records[1].finish_time, 2., max_relative = 1e-9);
}

#[test]
fn test_third_vm_does_not_fit() {
    let mut engine = engine_with(HostSpec::default(), EngineConfig::default());
    let outcomes = engine.admit_vms(Tier::Fog, create_vms(0, 3, &VmSpec::default())).unwrap();
    assert_eq!(outcomes[2], AdmissionOutcome::Failed { vm_id: 2 });
    assert!(engine.submit(Tier::Fog, Workload::new(0, 0, 100, 1, 0, 0), 2).is_err());
    assert!(engine.submit(Tier::Fog, Workload::new(1, 0, 100, 1, 0, 0), 1).is_ok());
    assert!(engine.submit(Tier::Edge, Workload::new(2, 0, 100, 1, 0, 0), 0).is_err());

    let records = engine.run_until_idle().unwrap();
    assert_eq!(records.len(), 1);
    let dc = engine.datacenter(Tier::Fog).unwrap();
    let workload = &dc.vm(1).unwrap().workloads()[0];
    assert_eq!(workload.status(), WorkloadStatus::Completed);
    assert_eq!(workload.vm_id(), Some(1));
}

#[test]
fn test_clock_is_monotonic_with_idle_steps() {
    let mut engine = engine_with(HostSpec::default(), EngineConfig::default());
    let mut last = engine.time();
    for _ in 0..3 {
        engine.step().unwrap();
        assert!(engine.time() > last);
        last = engine.time();
    }
    assert_eq!(engine.time(), 3.);
    assert!(engine.run_until_idle().unwrap().is_empty());
}

#[test]
fn test_parallel_mode_matches_serial() {
    let run = |parallel: bool| {
        let mut registry = DatacenterRegistry::new();
        for tier in Tier::ALL {
            create_datacenter(&mut registry, tier, &[HostSpec::default()]).unwrap();
        }
        let config = EngineConfig {
            parallel,
            workers: Some(3),
            ..Default::default()
        };
        let mut engine = SimulationEngine::new(registry, config);
        let mut id = 0;
        for tier in Tier::ALL {
            engine.admit_vms(tier, create_vms(0, 2, &VmSpec::default())).unwrap();
            for vm in 0..2 {
                engine
                    .submit(tier, Workload::new(id, 0, 1000 + 700 * id as u64, 1, 10, 10), vm)
                    .unwrap();
                id += 1;
            }
        }
        engine.run_until_idle().unwrap()
    };
    assert_eq!(run(false), run(true));
}
