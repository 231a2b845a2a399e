use simcore::Simulation;

use cloudsched::core::cloudlet::CloudletStatus;
use cloudsched::core::common::SchedulingPolicy;
use cloudsched::core::config::SimulationConfig;
use cloudsched::core::error::SimulationError;
use cloudsched::core::metrics::{compare, Recommendation, RunOutcome, RunStats};
use cloudsched::experiment::ComparisonExperiment;
use cloudsched::extensions::random_workload::{RandomWorkloadGenerator, RandomWorkloadOptions};
use cloudsched::simulation::DatacenterSimulation;

const EPS: f64 = 1e-6;

// The reference workload: 4 single-core 1000 MIPS VMs fully backed by host
// PEs, 10 cloudlets of 40000 MI bound round-robin (cloudlet i to VM i mod 4),
// so VMs 0 and 1 receive 3 cloudlets and VMs 2 and 3 receive 2.
fn reference_workload(policy: SchedulingPolicy) -> DatacenterSimulation {
    let sim = Simulation::new(123);
    let mut cloud_sim = DatacenterSimulation::new(sim, policy);
    cloud_sim.add_host("h1", 2, 1000., 2048, 10000, 1000000);
    cloud_sim.add_host("h2", 2, 1000., 2048, 10000, 1000000);
    for _ in 0..4 {
        cloud_sim.submit_vm(1000., 1, 512, 1000, 1000);
    }
    for _ in 0..10 {
        cloud_sim.submit_cloudlet(40000., 1, 300, 300);
    }
    cloud_sim
}

fn run_outcome(mut cloud_sim: DatacenterSimulation) -> RunOutcome {
    cloud_sim.run().unwrap();
    RunOutcome {
        policy: cloud_sim.policy(),
        records: cloud_sim.received_cloudlets(),
        stats: cloud_sim.stats(),
        wall_time: 0.,
    }
}

#[test]
// Space-shared: one cloudlet per VM at a time at full speed, 40 s each.
// The VMs with 3 cloudlets finish theirs at 40, 80 and 120 s.
fn test_reference_workload_space_shared() {
    let outcome = run_outcome(reference_workload(SchedulingPolicy::SpaceShared));

    assert_eq!(outcome.stats.success_count, 10);
    assert!((outcome.stats.makespan - 120.).abs() < EPS);
    assert!((outcome.stats.avg_execution_time - 40.).abs() < EPS);

    // cloudlets 0, 4 and 8 run back-to-back on VM 0
    let starts: Vec<f64> = outcome
        .records
        .iter()
        .filter(|r| r.vm_id == Some(0))
        .map(|r| r.start_time)
        .collect();
    assert_eq!(starts, vec![0., 40., 80.]);
}

#[test]
// Time-shared: all cloudlets of a VM progress concurrently, so the
// 3-cloudlet VMs finish everything together near t = 120 and the 2-cloudlet
// VMs near t = 80. The makespan matches space-shared but the average
// execution time does not.
fn test_reference_workload_time_shared() {
    let outcome = run_outcome(reference_workload(SchedulingPolicy::TimeShared));

    assert_eq!(outcome.stats.success_count, 10);
    assert!((outcome.stats.makespan - 120.).abs() < EPS);
    assert!((outcome.stats.avg_execution_time - 104.).abs() < EPS);

    for record in outcome.records.iter().filter(|r| r.vm_id == Some(0)) {
        assert_eq!(record.start_time, 0.);
        assert!((record.finish_time - 120.).abs() < EPS);
    }
    for record in outcome.records.iter().filter(|r| r.vm_id == Some(2)) {
        assert!((record.finish_time - 80.).abs() < EPS);
    }
}

#[test]
// The comparison engine must report the near-matching makespans as a tie and
// the average execution time as a space-shared win, hence a trade-off.
fn test_reference_workload_comparison() {
    let time_shared = run_outcome(reference_workload(SchedulingPolicy::TimeShared));
    let space_shared = run_outcome(reference_workload(SchedulingPolicy::SpaceShared));
    let comparison = compare(Some(time_shared), Some(space_shared));

    assert_eq!(
        comparison.recommendation,
        Recommendation::TradeOff {
            makespan_winner: None,
            avg_time_winner: Some(SchedulingPolicy::SpaceShared),
        }
    );
}

#[test]
// A cloudlet requesting more cores than its VM possesses fails at submission
// and never reaches the running state.
fn test_cloudlet_exceeding_vm_cores_fails() {
    let sim = Simulation::new(123);
    let mut cloud_sim = DatacenterSimulation::new(sim, SchedulingPolicy::TimeShared);
    cloud_sim.add_host("h", 2, 1000., 2048, 10000, 1000000);
    let vm = cloud_sim.submit_vm(1000., 1, 512, 1000, 1000);
    let cloudlet = cloud_sim.submit_cloudlet_to(vm, 40000., 2, 0, 0);
    cloud_sim.run().unwrap();

    assert_eq!(cloud_sim.cloudlet_status(cloudlet), CloudletStatus::Failed);
    let record = cloud_sim.cloudlet_record(cloudlet);
    assert!(record.start_time < 0.);
    assert_eq!(record.execution_time, 0.);
    assert_eq!(cloud_sim.stats().success_count, 0);
}

#[test]
// An empty cloudlet list yields zero metrics without division by zero.
fn test_empty_cloudlet_list() {
    let sim = Simulation::new(123);
    let mut cloud_sim = DatacenterSimulation::new(sim, SchedulingPolicy::SpaceShared);
    cloud_sim.add_host("h", 1, 1000., 2048, 10000, 1000000);
    cloud_sim.submit_vm(1000., 1, 512, 1000, 1000);
    cloud_sim.run().unwrap();

    let stats = cloud_sim.stats();
    assert_eq!(stats.total_count, 0);
    assert_eq!(stats.success_count, 0);
    assert_eq!(stats.makespan, 0.);
    assert_eq!(stats.avg_execution_time, 0.);
}

#[test]
// A cloudlet with zero remaining instructions completes immediately at the
// current simulated time.
fn test_zero_length_cloudlet_completes_immediately() {
    let sim = Simulation::new(123);
    let mut cloud_sim = DatacenterSimulation::new(sim, SchedulingPolicy::TimeShared);
    cloud_sim.add_host("h", 1, 1000., 2048, 10000, 1000000);
    let vm = cloud_sim.submit_vm(1000., 1, 512, 1000, 1000);
    let cloudlet = cloud_sim.submit_cloudlet_to(vm, 0., 1, 0, 0);
    cloud_sim.run().unwrap();

    let record = cloud_sim.cloudlet_record(cloudlet);
    assert_eq!(record.status, CloudletStatus::Success);
    assert_eq!(record.start_time, 0.);
    assert_eq!(record.finish_time, 0.);
    assert_eq!(record.execution_time, 0.);
}

#[test]
// Two runs of the same workload under the same policy produce identical
// record sequences.
fn test_runs_are_deterministic() {
    let first = run_outcome(reference_workload(SchedulingPolicy::SpaceShared));
    let second = run_outcome(reference_workload(SchedulingPolicy::SpaceShared));
    assert_eq!(first.records, second.records);

    let first = run_outcome(reference_workload(SchedulingPolicy::TimeShared));
    let second = run_outcome(reference_workload(SchedulingPolicy::TimeShared));
    assert_eq!(first.records, second.records);
}

#[test]
// Executed instructions never decrease and equal the length exactly at finish.
fn test_monotonic_completion() {
    let sim = Simulation::new(123);
    let mut cloud_sim = DatacenterSimulation::new(sim, SchedulingPolicy::TimeShared);
    cloud_sim.add_host("h", 1, 1000., 2048, 10000, 1000000);
    let vm = cloud_sim.submit_vm(1000., 1, 512, 1000, 1000);
    let c1 = cloud_sim.submit_cloudlet_to(vm, 10000., 1, 0, 0);
    let c2 = cloud_sim.submit_cloudlet_to(vm, 30000., 1, 0, 0);

    cloud_sim.start();
    let mut previous = 0.;
    while cloud_sim.steps(1) {
        let executed = cloud_sim.datacenter().borrow().cloudlet(c2).executed();
        assert!(executed >= previous);
        previous = executed;
    }
    let datacenter = cloud_sim.datacenter();
    assert_eq!(datacenter.borrow().cloudlet(c1).executed(), 10000.);
    assert_eq!(datacenter.borrow().cloudlet(c2).executed(), 30000.);
}

#[test]
fn test_config_validation_rejects_malformed_values() {
    let config = SimulationConfig::from_yaml(
        r#"
hosts:
  - pes: 1
    pe_mips: -1000
    memory: 2048
    bandwidth: 10000
    storage: 1000000
"#,
    );
    assert!(matches!(config, Err(SimulationError::InvalidConfig(_))));

    let config = SimulationConfig::from_yaml("hosts: []");
    assert!(matches!(config, Err(SimulationError::InvalidConfig(_))));
}

#[test]
fn test_config_roundtrip_and_run() {
    let config = SimulationConfig::from_yaml(
        r#"
hosts:
  - pes: 2
    pe_mips: 1000
    memory: 2048
    bandwidth: 10000
    storage: 1000000
    count: 2
vms:
  - mips: 1000
    cores: 1
    memory: 512
    bandwidth: 1000
    storage: 1000
    count: 4
cloudlets:
  - length: 40000
    cores: 1
    input_size: 300
    output_size: 300
    count: 10
"#,
    )
    .unwrap();

    let sim = Simulation::new(123);
    let mut cloud_sim =
        DatacenterSimulation::from_config(sim, &config, SchedulingPolicy::SpaceShared).unwrap();
    cloud_sim.run().unwrap();

    let stats = cloud_sim.stats();
    assert_eq!(stats.success_count, 10);
    assert!((stats.makespan - 120.).abs() < EPS);
    // flat linear cost: 10 cloudlets * 40 s * 3.0 per second
    assert!((stats.cpu_cost - 1200.).abs() < EPS);
}

#[test]
// The comparison engine never requires both sides, mirroring the isolation
// of the two policy runs.
fn test_comparison_tolerates_missing_side() {
    let outcome = run_outcome(reference_workload(SchedulingPolicy::TimeShared));
    let comparison = compare(Some(outcome), None);
    assert_eq!(
        comparison.recommendation,
        Recommendation::OneSided(SchedulingPolicy::TimeShared)
    );

    let comparison = compare(None, None);
    assert_eq!(comparison.recommendation, Recommendation::Inconclusive);
    assert!(comparison.time_shared.is_none());

    let stats = RunStats::from_records(&[], 3.0);
    assert_eq!(stats.makespan, 0.);
    assert_eq!(stats.avg_execution_time, 0.);
}

#[test]
// End-to-end: the experiment runs both policies on independent contexts and
// produces a full comparison.
fn test_comparison_experiment() {
    let config = SimulationConfig::from_yaml(
        r#"
hosts:
  - pes: 2
    pe_mips: 1000
    memory: 2048
    bandwidth: 10000
    storage: 1000000
    count: 2
vms:
  - mips: 1000
    cores: 1
    memory: 512
    bandwidth: 1000
    storage: 1000
    count: 4
cloudlets:
  - length: 40000
    cores: 1
    count: 10
"#,
    )
    .unwrap();

    let comparison = ComparisonExperiment::new(config, 123).run(2);

    let time_shared = comparison.time_shared.as_ref().unwrap();
    let space_shared = comparison.space_shared.as_ref().unwrap();
    assert_eq!(time_shared.stats.success_count, 10);
    assert_eq!(space_shared.stats.success_count, 10);
    assert!((time_shared.stats.makespan - space_shared.stats.makespan).abs() < EPS);
    assert!(space_shared.stats.avg_execution_time < time_shared.stats.avg_execution_time);
}

#[test]
// The same seed generates the same random workload, so the two policy runs
// of a comparison observe identical inputs.
fn test_random_workload_is_reproducible() {
    let options = RandomWorkloadOptions {
        vm_count: 3,
        cloudlet_count: 8,
        vm_mips_min: 500.,
        vm_mips_max: 1500.,
        vm_cores_min: 1,
        vm_cores_max: 2,
        vm_memory: 512,
        vm_bandwidth: 1000,
        vm_storage: 1000,
        cloudlet_length_min: 10000.,
        cloudlet_length_max: 50000.,
        cloudlet_cores_min: 1,
        cloudlet_cores_max: 1,
    };
    let generator = RandomWorkloadGenerator::new(options);

    let run = |policy| {
        let sim = Simulation::new(7);
        let mut cloud_sim = DatacenterSimulation::new(sim, policy);
        cloud_sim.add_host("h", 4, 2000., 8192, 10000, 1000000);
        generator.submit_to(&mut cloud_sim);
        cloud_sim.run().unwrap();
        cloud_sim.received_cloudlets()
    };

    // identical workload within one policy implies identical results
    assert_eq!(
        run(SchedulingPolicy::TimeShared),
        run(SchedulingPolicy::TimeShared)
    );
    assert_eq!(
        run(SchedulingPolicy::SpaceShared),
        run(SchedulingPolicy::SpaceShared)
    );
}
