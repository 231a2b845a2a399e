//! Simulation facade wiring the engine, datacenter and broker together.

use std::cell::RefCell;
use std::rc::Rc;

use sugars::{rc, refcell};

use simcore::context::SimulationContext;
use simcore::simulation::Simulation;
use simcore::Id;

use crate::core::broker::Broker;
use crate::core::cloudlet::{Cloudlet, CloudletRecord, CloudletStatus};
use crate::core::common::SchedulingPolicy;
use crate::core::config::{CostConfig, SimulationConfig};
use crate::core::datacenter::Datacenter;
use crate::core::error::SimulationError;
use crate::core::events::allocation::VmDeleteRequest;
use crate::core::host::Host;
use crate::core::logger::{Logger, StdoutLogger};
use crate::core::metrics::RunStats;
use crate::core::vm::{VirtualMachine, VmStatus};

/// Facade for configuring and running one datacenter simulation under a
/// single scheduling policy.
pub struct DatacenterSimulation {
    policy: SchedulingPolicy,
    datacenter: Rc<RefCell<Datacenter>>,
    datacenter_id: Id,
    broker: Rc<RefCell<Broker>>,
    broker_id: Id,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    costs: CostConfig,
    host_counter: u32,
    vm_counter: u32,
    cloudlet_counter: u32,
    started: bool,
    sim: Simulation,
    ctx: SimulationContext,
}

impl DatacenterSimulation {
    pub fn new(sim: Simulation, policy: SchedulingPolicy) -> Self {
        Self::with_logger(sim, policy, Box::new(StdoutLogger::new()))
    }

    pub fn with_logger(mut sim: Simulation, policy: SchedulingPolicy, logger: Box<dyn Logger>) -> Self {
        let logger = rc!(refcell!(logger));
        let datacenter = rc!(refcell!(Datacenter::new(
            policy,
            logger.clone(),
            sim.create_context("datacenter")
        )));
        let datacenter_id = sim.add_handler("datacenter", datacenter.clone());
        let broker = rc!(refcell!(Broker::new(
            datacenter_id,
            logger.clone(),
            sim.create_context("broker")
        )));
        let broker_id = sim.add_handler("broker", broker.clone());
        let ctx = sim.create_context("simulation");
        Self {
            policy,
            datacenter,
            datacenter_id,
            broker,
            broker_id,
            logger,
            costs: CostConfig::default(),
            host_counter: 0,
            vm_counter: 0,
            cloudlet_counter: 0,
            started: false,
            sim,
            ctx,
        }
    }

    /// Builds a simulation from a validated scenario configuration.
    pub fn from_config(
        sim: Simulation,
        config: &SimulationConfig,
        policy: SchedulingPolicy,
    ) -> Result<Self, SimulationError> {
        Self::from_config_with_logger(sim, config, policy, Box::new(StdoutLogger::new()))
    }

    pub fn from_config_with_logger(
        sim: Simulation,
        config: &SimulationConfig,
        policy: SchedulingPolicy,
        logger: Box<dyn Logger>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut this = Self::with_logger(sim, policy, logger);
        this.costs = config.costs.clone();
        for host in &config.hosts {
            for i in 0..host.count {
                let name = match &host.name {
                    Some(name) if host.count == 1 => name.clone(),
                    Some(prefix) => format!("{}-{}", prefix, i),
                    None => format!("host-{}", this.host_counter),
                };
                this.add_host(&name, host.pes, host.pe_mips, host.memory, host.bandwidth, host.storage);
            }
        }
        for vm in &config.vms {
            for _ in 0..vm.count {
                this.submit_vm(vm.mips, vm.cores, vm.memory, vm.bandwidth, vm.storage);
            }
        }
        for cloudlet in &config.cloudlets {
            for _ in 0..cloudlet.count {
                this.submit_cloudlet(cloudlet.length, cloudlet.cores, cloudlet.input_size, cloudlet.output_size);
            }
        }
        Ok(this)
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// Adds a physical host to the datacenter, returns the host id.
    pub fn add_host(&mut self, name: &str, pes: u32, pe_mips: f64, memory: u64, bandwidth: u64, storage: u64) -> u32 {
        let id = self.host_counter;
        self.host_counter += 1;
        self.datacenter
            .borrow_mut()
            .add_host(Host::new(id, name, pes, pe_mips, memory, bandwidth, storage, self.policy));
        id
    }

    /// Registers a VM creation request submitted by the broker at simulation
    /// start, returns the VM id.
    pub fn submit_vm(&mut self, mips: f64, cores: u32, memory: u64, bandwidth: u64, storage: u64) -> u32 {
        let id = self.vm_counter;
        self.vm_counter += 1;
        self.datacenter.borrow_mut().add_vm(VirtualMachine::new(
            id,
            self.broker_id,
            mips,
            cores,
            memory,
            bandwidth,
            storage,
            self.policy,
        ));
        self.broker.borrow_mut().submit_vms(vec![id]);
        id
    }

    /// Registers a cloudlet bound by submission position (cloudlet *i* goes
    /// to VM *i mod V*), returns the cloudlet id.
    pub fn submit_cloudlet(&mut self, length: f64, cores: u32, input_size: u64, output_size: u64) -> u32 {
        let id = self.register_cloudlet(length, cores, input_size, output_size);
        self.broker.borrow_mut().submit_cloudlets(vec![id]);
        id
    }

    /// Registers a cloudlet explicitly bound to the given VM.
    pub fn submit_cloudlet_to(
        &mut self,
        vm_id: u32,
        length: f64,
        cores: u32,
        input_size: u64,
        output_size: u64,
    ) -> u32 {
        let id = self.register_cloudlet(length, cores, input_size, output_size);
        self.broker.borrow_mut().submit_cloudlet_to(id, vm_id);
        id
    }

    fn register_cloudlet(&mut self, length: f64, cores: u32, input_size: u64, output_size: u64) -> u32 {
        let id = self.cloudlet_counter;
        self.cloudlet_counter += 1;
        self.datacenter
            .borrow_mut()
            .add_cloudlet(Cloudlet::new(id, length, cores, input_size, output_size));
        id
    }

    /// Requests destruction of a VM after the given simulated delay.
    pub fn destroy_vm(&mut self, vm_id: u32, delay: f64) {
        self.ctx.emit(VmDeleteRequest { vm_id }, self.datacenter_id, delay);
    }

    /// Kicks off the broker submissions. Invoked by [`run`](Self::run), only
    /// needed directly when the simulation is driven step by step.
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            self.broker.borrow_mut().start();
        }
    }

    /// Runs the simulation until the event queue is exhausted.
    ///
    /// An engine-level invariant violation aborts the run; results collected
    /// so far stay available through the broker.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        self.start();
        while self.sim.step() {
            let error = self.datacenter.borrow().error();
            if let Some(error) = error {
                return Err(error);
            }
        }
        let time = self.sim.time();
        let leftovers = self.datacenter.borrow_mut().finalize(time);
        self.broker.borrow_mut().absorb(leftovers);
        Ok(())
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    /// Returns a random number in the specified range using the simulation-wide
    /// deterministic random number generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.sim.gen_range(range)
    }

    pub fn datacenter(&self) -> Rc<RefCell<Datacenter>> {
        self.datacenter.clone()
    }

    pub fn vm_status(&self, vm_id: u32) -> VmStatus {
        self.datacenter.borrow().vm_status(vm_id)
    }

    pub fn cloudlet_status(&self, cloudlet_id: u32) -> CloudletStatus {
        self.datacenter.borrow().cloudlet_status(cloudlet_id)
    }

    pub fn cloudlet_record(&self, cloudlet_id: u32) -> CloudletRecord {
        self.datacenter.borrow().cloudlet(cloudlet_id).record()
    }

    /// Cloudlet records collected by the broker, ordered by cloudlet id.
    pub fn received_cloudlets(&self) -> Vec<CloudletRecord> {
        self.broker.borrow().received_cloudlets()
    }

    /// Metrics over the records collected so far.
    pub fn stats(&self) -> RunStats {
        RunStats::from_records(&self.received_cloudlets(), self.costs.cpu_second)
    }

    /// Saves the accumulated trace if the underlying logger records one.
    pub fn save_log(&self, path: &str) -> Result<(), std::io::Error> {
        self.logger.borrow().save_log(path)
    }
}
