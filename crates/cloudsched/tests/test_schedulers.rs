use simcore::Simulation;

use cloudsched::core::cloudlet::CloudletStatus;
use cloudsched::core::common::SchedulingPolicy;
use cloudsched::core::vm::VmStatus;
use cloudsched::simulation::DatacenterSimulation;

const EPS: f64 = 1e-6;

fn single_host(policy: SchedulingPolicy, pes: u32, pe_mips: f64) -> DatacenterSimulation {
    let sim = Simulation::new(123);
    let mut cloud_sim = DatacenterSimulation::new(sim, policy);
    cloud_sim.add_host("h", pes, pe_mips, 2048, 10000, 1000000);
    cloud_sim
}

#[test]
// Time-shared hosts admit VMs regardless of PE contention and divide each
// PE's capacity evenly among its sharers.
fn test_time_shared_host_divides_pe_capacity() {
    let mut cloud_sim = single_host(SchedulingPolicy::TimeShared, 1, 1000.);
    let vm1 = cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    let vm2 = cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    cloud_sim.run().unwrap();

    assert_eq!(cloud_sim.vm_status(vm1), VmStatus::Running);
    assert_eq!(cloud_sim.vm_status(vm2), VmStatus::Running);
    let datacenter = cloud_sim.datacenter();
    assert!((datacenter.borrow().vm(vm1).allocated_mips() - 500.).abs() < EPS);
    assert!((datacenter.borrow().vm(vm2).allocated_mips() - 500.).abs() < EPS);
}

#[test]
// A VM never receives more than it requested even when the PE has capacity
// to spare.
fn test_time_shared_host_respects_requested_mips() {
    let mut cloud_sim = single_host(SchedulingPolicy::TimeShared, 1, 1000.);
    let vm1 = cloud_sim.submit_vm(300., 1, 256, 1000, 1000);
    let vm2 = cloud_sim.submit_vm(800., 1, 256, 1000, 1000);
    cloud_sim.run().unwrap();

    let datacenter = cloud_sim.datacenter();
    assert!((datacenter.borrow().vm(vm1).allocated_mips() - 300.).abs() < EPS);
    assert!((datacenter.borrow().vm(vm2).allocated_mips() - 500.).abs() < EPS);
}

#[test]
// Space-shared hosts admit a VM only when enough whole PEs are free; later
// requests wait in a FIFO queue.
fn test_space_shared_host_queues_vm_when_pes_are_busy() {
    let mut cloud_sim = single_host(SchedulingPolicy::SpaceShared, 2, 1000.);
    let vm1 = cloud_sim.submit_vm(1000., 2, 256, 1000, 1000);
    let vm2 = cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    let cloudlet = cloud_sim.submit_cloudlet_to(vm2, 40000., 1, 0, 0);
    cloud_sim.run().unwrap();

    assert_eq!(cloud_sim.vm_status(vm1), VmStatus::Running);
    assert_eq!(cloud_sim.vm_status(vm2), VmStatus::Queued);
    // the cloudlet bound to the queued VM never got to run
    assert_eq!(cloud_sim.cloudlet_status(cloudlet), CloudletStatus::Failed);
}

#[test]
// Releasing a VM drains the host queue in FIFO order and the queued VM picks
// up its held cloudlets.
fn test_space_shared_host_queue_drains_on_release() {
    let mut cloud_sim = single_host(SchedulingPolicy::SpaceShared, 1, 1000.);
    let vm1 = cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    let vm2 = cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    let c1 = cloud_sim.submit_cloudlet_to(vm1, 40000., 1, 0, 0);
    let c2 = cloud_sim.submit_cloudlet_to(vm2, 40000., 1, 0, 0);
    cloud_sim.destroy_vm(vm1, 50.);
    cloud_sim.run().unwrap();

    assert_eq!(cloud_sim.vm_status(vm1), VmStatus::Finished);
    assert_eq!(cloud_sim.vm_status(vm2), VmStatus::Running);

    let first = cloud_sim.cloudlet_record(c1);
    assert_eq!(first.status, CloudletStatus::Success);
    assert_eq!(first.finish_time, 40.);

    let second = cloud_sim.cloudlet_record(c2);
    assert_eq!(second.status, CloudletStatus::Success);
    assert_eq!(second.start_time, 50.);
    assert_eq!(second.finish_time, 90.);
}

#[test]
// Capacity invariant: under space sharing the sum of MIPS committed to
// resident VMs never exceeds the host capacity, and a VM that does not fit
// anywhere fails outright.
fn test_space_shared_capacity_invariant() {
    let sim = Simulation::new(123);
    let mut cloud_sim = DatacenterSimulation::new(sim, SchedulingPolicy::SpaceShared);
    let h1 = cloud_sim.add_host("h1", 2, 1000., 2048, 10000, 1000000);
    let h2 = cloud_sim.add_host("h2", 2, 1000., 2048, 10000, 1000000);
    for _ in 0..6 {
        cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    }
    let oversized = cloud_sim.submit_vm(1000., 3, 256, 1000, 1000);
    cloud_sim.run().unwrap();

    let datacenter = cloud_sim.datacenter();
    for host_id in [h1, h2] {
        let dc = datacenter.borrow();
        let host = dc.host(host_id);
        assert!(host.total_allocated_mips() <= host.total_mips() + EPS);
        assert!(host.memory_allocated() <= 2048. + EPS);
    }
    assert_eq!(cloud_sim.vm_status(oversized), VmStatus::FailedToAllocate);
}

#[test]
// A VM whose memory does not fit on any host is rejected, not queued, and
// its cloudlets fail.
fn test_vm_memory_admission_failure() {
    for policy in [SchedulingPolicy::TimeShared, SchedulingPolicy::SpaceShared] {
        let mut cloud_sim = single_host(policy, 2, 1000.);
        let vm = cloud_sim.submit_vm(1000., 1, 4096, 1000, 1000);
        let cloudlet = cloud_sim.submit_cloudlet_to(vm, 40000., 1, 0, 0);
        cloud_sim.run().unwrap();

        assert_eq!(cloud_sim.vm_status(vm), VmStatus::FailedToAllocate);
        assert_eq!(cloud_sim.cloudlet_status(cloudlet), CloudletStatus::Failed);
    }
}

#[test]
// Of two cloudlets submitted at the same time to an under-provisioned VM
// under space sharing, the one submitted first starts no later.
fn test_space_shared_vm_fifo_ordering() {
    let mut cloud_sim = single_host(SchedulingPolicy::SpaceShared, 1, 1000.);
    let vm = cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    let c1 = cloud_sim.submit_cloudlet_to(vm, 40000., 1, 0, 0);
    let c2 = cloud_sim.submit_cloudlet_to(vm, 40000., 1, 0, 0);
    cloud_sim.run().unwrap();

    let first = cloud_sim.cloudlet_record(c1);
    let second = cloud_sim.cloudlet_record(c2);
    assert!(first.start_time <= second.start_time);
    assert_eq!(first.start_time, 0.);
    assert_eq!(second.start_time, 40.);
    assert_eq!(second.finish_time, 80.);
}

#[test]
// Fair-share invariant: k mutually capacity-constrained cloudlets each run
// at vm_mips / k.
fn test_time_shared_vm_fair_share() {
    let mut cloud_sim = single_host(SchedulingPolicy::TimeShared, 1, 1000.);
    let vm = cloud_sim.submit_vm(1000., 1, 256, 1000, 1000);
    let c1 = cloud_sim.submit_cloudlet_to(vm, 20000., 1, 0, 0);
    let c2 = cloud_sim.submit_cloudlet_to(vm, 20000., 1, 0, 0);
    cloud_sim.run().unwrap();

    // both progress at 500 MIPS and finish together
    for cloudlet in [c1, c2] {
        let record = cloud_sim.cloudlet_record(cloudlet);
        assert_eq!(record.start_time, 0.);
        assert!((record.finish_time - 40.).abs() < EPS);
    }
}

#[test]
// A single-core cloudlet on a multi-core VM is capped by one core's rate,
// leaving the remaining capacity unused.
fn test_time_shared_vm_caps_rate_by_cloudlet_cores() {
    let mut cloud_sim = single_host(SchedulingPolicy::TimeShared, 2, 1000.);
    let vm = cloud_sim.submit_vm(1000., 2, 256, 1000, 1000);
    let cloudlet = cloud_sim.submit_cloudlet_to(vm, 40000., 1, 0, 0);
    cloud_sim.run().unwrap();

    let record = cloud_sim.cloudlet_record(cloudlet);
    assert!((record.finish_time - 40.).abs() < EPS);

    // three single-core cloudlets on the same VM share 2000 MIPS evenly,
    // below the per-core cap of 1000
    let mut cloud_sim = single_host(SchedulingPolicy::TimeShared, 2, 1000.);
    let vm = cloud_sim.submit_vm(1000., 2, 256, 1000, 1000);
    let mut cloudlets = Vec::new();
    for _ in 0..3 {
        cloudlets.push(cloud_sim.submit_cloudlet_to(vm, 40000., 1, 0, 0));
    }
    cloud_sim.run().unwrap();
    for cloudlet in cloudlets {
        let record = cloud_sim.cloudlet_record(cloudlet);
        assert!((record.finish_time - 60.).abs() < EPS);
    }
}

#[test]
// Space-shared cloudlets keep full per-core speed, so a 2-core cloudlet
// blocks a later 1-core one until it finishes.
fn test_space_shared_vm_whole_core_execution() {
    let mut cloud_sim = single_host(SchedulingPolicy::SpaceShared, 2, 1000.);
    let vm = cloud_sim.submit_vm(1000., 2, 256, 1000, 1000);
    let wide = cloud_sim.submit_cloudlet_to(vm, 40000., 2, 0, 0);
    let narrow = cloud_sim.submit_cloudlet_to(vm, 10000., 1, 0, 0);
    cloud_sim.run().unwrap();

    // the 2-core cloudlet runs at 2000 MIPS and finishes at t = 20
    let first = cloud_sim.cloudlet_record(wide);
    assert!((first.finish_time - 20.).abs() < EPS);
    let second = cloud_sim.cloudlet_record(narrow);
    assert_eq!(second.start_time, 20.);
    assert!((second.finish_time - 30.).abs() < EPS);
}
