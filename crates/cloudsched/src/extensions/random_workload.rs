//! Random workload generation with reproducible results.

use serde::{Deserialize, Serialize};

use crate::simulation::DatacenterSimulation;

/// Ranges for the generated VM and cloudlet parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomWorkloadOptions {
    pub vm_count: u32,
    pub cloudlet_count: u32,
    pub vm_mips_min: f64,
    pub vm_mips_max: f64,
    pub vm_cores_min: u32,
    pub vm_cores_max: u32,
    pub vm_memory: u64,
    pub vm_bandwidth: u64,
    pub vm_storage: u64,
    pub cloudlet_length_min: f64,
    pub cloudlet_length_max: f64,
    pub cloudlet_cores_min: u32,
    pub cloudlet_cores_max: u32,
}

/// Generates a workload by sampling the configured ranges with the
/// simulation-wide random number generator.
///
/// Simulations built with the same seed draw the same samples, so the two
/// policy runs of a comparison observe an identical workload.
pub struct RandomWorkloadGenerator {
    options: RandomWorkloadOptions,
}

impl RandomWorkloadGenerator {
    pub fn new(options: RandomWorkloadOptions) -> Self {
        Self { options }
    }

    /// Submits the generated VMs and cloudlets through the facade, returns
    /// their ids.
    pub fn submit_to(&self, sim: &mut DatacenterSimulation) -> (Vec<u32>, Vec<u32>) {
        let opts = &self.options;
        let mut vm_ids = Vec::with_capacity(opts.vm_count as usize);
        for _ in 0..opts.vm_count {
            let mips = sim.gen_range(opts.vm_mips_min..=opts.vm_mips_max);
            let cores = sim.gen_range(opts.vm_cores_min..=opts.vm_cores_max);
            vm_ids.push(sim.submit_vm(mips, cores, opts.vm_memory, opts.vm_bandwidth, opts.vm_storage));
        }
        let mut cloudlet_ids = Vec::with_capacity(opts.cloudlet_count as usize);
        for _ in 0..opts.cloudlet_count {
            let length = sim.gen_range(opts.cloudlet_length_min..=opts.cloudlet_length_max);
            let cores = sim.gen_range(opts.cloudlet_cores_min..=opts.cloudlet_cores_max);
            cloudlet_ids.push(sim.submit_cloudlet(length, cores, 0, 0));
        }
        (vm_ids, cloudlet_ids)
    }
}
