//! Datacenter: owns hosts, VMs and cloudlets and drives their execution.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use simcore::cast;
use simcore::context::SimulationContext;
use simcore::event::{Event, EventId};
use simcore::handler::EventHandler;
use simcore::EPSILON;

use crate::core::cloudlet::{Cloudlet, CloudletRecord, CloudletStatus};
use crate::core::common::{AllocationVerdict, SchedulingPolicy};
use crate::core::error::SimulationError;
use crate::core::events::allocation::{
    VmCreateRequest, VmCreated, VmCreationFailed, VmCreationQueued, VmDeleteRequest,
};
use crate::core::events::cloudlet::{CloudletCompleted, CloudletReturned, CloudletSubmitRequest};
use crate::core::host::Host;
use crate::core::logger::Logger;
use crate::core::vm::{VirtualMachine, VmStatus};

// Accumulated float error allowed in progress integration before it is
// treated as a modeling bug.
fn progress_tolerance(length: f64) -> f64 {
    (length * 1e-9).max(EPSILON)
}

/// Owns the host, VM and cloudlet registries and processes all allocation
/// and execution events of one simulation run.
///
/// VMs refer to hosts and cloudlets refer to VMs by id only; destruction
/// order is controlled by this registry alone. All state mutation happens
/// from the event dispatch loop.
pub struct Datacenter {
    policy: SchedulingPolicy,
    hosts: BTreeMap<u32, Host>,
    vms: BTreeMap<u32, VirtualMachine>,
    cloudlets: BTreeMap<u32, Cloudlet>,
    // cloudlets waiting for their (queued) VM to start, per VM in submission order
    held_cloudlets: HashMap<u32, Vec<u32>>,
    error: Option<SimulationError>,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    ctx: SimulationContext,
}

impl Datacenter {
    pub fn new(
        policy: SchedulingPolicy,
        logger: Rc<RefCell<Box<dyn Logger>>>,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            policy,
            hosts: BTreeMap::new(),
            vms: BTreeMap::new(),
            cloudlets: BTreeMap::new(),
            held_cloudlets: HashMap::new(),
            error: None,
            logger,
            ctx,
        }
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    pub fn add_host(&mut self, host: Host) -> u32 {
        let id = host.id;
        self.hosts.insert(id, host);
        id
    }

    pub fn add_vm(&mut self, vm: VirtualMachine) -> u32 {
        let id = vm.id;
        self.vms.insert(id, vm);
        id
    }

    pub fn add_cloudlet(&mut self, cloudlet: Cloudlet) -> u32 {
        let id = cloudlet.id;
        self.cloudlets.insert(id, cloudlet);
        id
    }

    pub fn host(&self, host_id: u32) -> &Host {
        &self.hosts[&host_id]
    }

    pub fn vm(&self, vm_id: u32) -> &VirtualMachine {
        &self.vms[&vm_id]
    }

    pub fn cloudlet(&self, cloudlet_id: u32) -> &Cloudlet {
        &self.cloudlets[&cloudlet_id]
    }

    pub fn vm_status(&self, vm_id: u32) -> VmStatus {
        self.vms[&vm_id].status()
    }

    pub fn cloudlet_status(&self, cloudlet_id: u32) -> CloudletStatus {
        self.cloudlets[&cloudlet_id].status()
    }

    /// Fatal error recorded during the run, if any.
    pub fn error(&self) -> Option<SimulationError> {
        self.error.clone()
    }

    fn raise(&mut self, message: String) {
        self.logger.borrow_mut().log_error(&self.ctx, message.clone());
        if self.error.is_none() {
            self.error = Some(SimulationError::InvariantViolation(message));
        }
    }

    // VM allocation -----------------------------------------------------------------------------

    fn on_vm_create_request(&mut self, vm_id: u32) {
        // the least loaded admitting host wins, ties go to the lowest id
        let host_ids: Vec<u32> = self.hosts.keys().copied().collect();
        let mut verdict = AllocationVerdict::NotEnoughCpu;
        let mut selected: Option<(i64, u32)> = None;
        for &host_id in &host_ids {
            let admission = self.hosts[&host_id].can_allocate(&self.vms[&vm_id]);
            if admission == AllocationVerdict::Success {
                let available = self.hosts[&host_id].available_pes();
                if selected.map_or(true, |(best, _)| available > best) {
                    selected = Some((available, host_id));
                }
            } else {
                verdict = admission;
            }
        }
        if let Some((_, host_id)) = selected {
            self.place_vm(vm_id, host_id);
            return;
        }
        // no host admits the VM right now
        if self.policy == SchedulingPolicy::SpaceShared {
            let fitting = host_ids
                .iter()
                .find(|&&host_id| self.hosts[&host_id].fits(&self.vms[&vm_id]))
                .copied();
            if let Some(host_id) = fitting {
                self.hosts.get_mut(&host_id).unwrap().enqueue(vm_id);
                self.vms.get_mut(&vm_id).unwrap().set_queued(host_id);
                self.logger
                    .borrow_mut()
                    .log_debug(&self.ctx, format!("vm #{} queued on host #{}", vm_id, host_id));
                let owner = self.vms[&vm_id].owner;
                self.ctx.emit(VmCreationQueued { vm_id, host_id }, owner, 0.);
                return;
            }
        }
        self.vms.get_mut(&vm_id).unwrap().set_failed();
        self.logger
            .borrow_mut()
            .log_debug(&self.ctx, format!("not enough space for vm #{}", vm_id));
        let owner = self.vms[&vm_id].owner;
        self.ctx.emit(VmCreationFailed { vm_id, reason: verdict }, owner, 0.);
    }

    fn place_vm(&mut self, vm_id: u32, host_id: u32) {
        {
            let vm = &self.vms[&vm_id];
            self.hosts.get_mut(&host_id).unwrap().allocate(vm);
        }
        let allocated = self.hosts[&host_id].allocated_mips(vm_id);
        self.vms.get_mut(&vm_id).unwrap().set_placed(host_id, allocated);
        self.logger
            .borrow_mut()
            .log_debug(&self.ctx, format!("vm #{} allocated on host #{}", vm_id, host_id));
        let owner = self.vms[&vm_id].owner;
        self.ctx.emit(VmCreated { vm_id, host_id }, owner, 0.);
        // admission may shrink shares of the other residents
        self.sync_host_shares(host_id);
        self.dispatch_held_cloudlets(vm_id);
    }

    fn on_vm_delete_request(&mut self, vm_id: u32) {
        let now = self.ctx.time();
        match self.vms[&vm_id].status() {
            VmStatus::Running => {
                let host_id = self.vms[&vm_id].host_id().unwrap();
                self.fail_bound_cloudlets(vm_id, now);
                self.vms.get_mut(&vm_id).unwrap().set_finished();
                self.hosts.get_mut(&host_id).unwrap().release(vm_id);
                self.logger
                    .borrow_mut()
                    .log_debug(&self.ctx, format!("vm #{} deleted from host #{}", vm_id, host_id));
                self.sync_host_shares(host_id);
                self.drain_host_queue(host_id);
            }
            VmStatus::Queued => {
                let host_id = self.vms[&vm_id].host_id().unwrap();
                self.hosts.get_mut(&host_id).unwrap().remove_from_queue(vm_id);
                self.fail_bound_cloudlets(vm_id, now);
                self.vms.get_mut(&vm_id).unwrap().set_finished();
            }
            _ => {
                self.logger
                    .borrow_mut()
                    .log_warn(&self.ctx, format!("cannot delete vm #{} which is not active", vm_id));
            }
        }
    }

    fn drain_host_queue(&mut self, host_id: u32) {
        let placed = {
            let host = self.hosts.get_mut(&host_id).unwrap();
            host.try_dequeue(&self.vms)
        };
        for vm_id in placed {
            let allocated = self.hosts[&host_id].allocated_mips(vm_id);
            self.vms.get_mut(&vm_id).unwrap().set_placed(host_id, allocated);
            self.logger
                .borrow_mut()
                .log_debug(&self.ctx, format!("vm #{} allocated on host #{}", vm_id, host_id));
            let owner = self.vms[&vm_id].owner;
            self.ctx.emit(VmCreated { vm_id, host_id }, owner, 0.);
            self.sync_host_shares(host_id);
            self.dispatch_held_cloudlets(vm_id);
        }
    }

    /// Pushes share changes of the host scheduler down to resident VMs and
    /// their running cloudlets. Invoked on resident-set changes only.
    fn sync_host_shares(&mut self, host_id: u32) {
        for vm_id in self.hosts[&host_id].resident_vms() {
            let allocated = self.hosts[&host_id].allocated_mips(vm_id);
            let changed = {
                let vm = self.vms.get_mut(&vm_id).unwrap();
                if (vm.allocated_mips() - allocated).abs() > EPSILON {
                    vm.set_allocated_mips(allocated);
                    true
                } else {
                    false
                }
            };
            if changed {
                self.reschedule_vm(vm_id);
            }
        }
    }

    // Cloudlet execution ------------------------------------------------------------------------

    fn on_cloudlet_submit(&mut self, cloudlet_id: u32, vm_id: Option<u32>, submitter: simcore::Id) {
        let now = self.ctx.time();
        self.cloudlets
            .get_mut(&cloudlet_id)
            .unwrap()
            .set_submitted(vm_id, submitter, now);
        let vm_id = match vm_id {
            Some(vm_id) if self.vms.contains_key(&vm_id) => vm_id,
            _ => {
                self.logger.borrow_mut().log_debug(
                    &self.ctx,
                    format!("cloudlet #{} is not bound to a valid vm", cloudlet_id),
                );
                self.fail_cloudlet(cloudlet_id, now);
                return;
            }
        };
        match self.vms[&vm_id].status() {
            VmStatus::Running => self.dispatch_cloudlet(cloudlet_id, vm_id),
            VmStatus::Requested | VmStatus::Queued => {
                self.cloudlets.get_mut(&cloudlet_id).unwrap().set_queued();
                self.held_cloudlets.entry(vm_id).or_default().push(cloudlet_id);
            }
            VmStatus::FailedToAllocate | VmStatus::Finished => {
                self.logger.borrow_mut().log_debug(
                    &self.ctx,
                    format!("cloudlet #{} is bound to inactive vm #{}", cloudlet_id, vm_id),
                );
                self.fail_cloudlet(cloudlet_id, now);
            }
        }
    }

    fn dispatch_cloudlet(&mut self, cloudlet_id: u32, vm_id: u32) {
        let now = self.ctx.time();
        let cores = self.cloudlets[&cloudlet_id].cores();
        let vm_cores = self.vms[&vm_id].cores();
        if cores > vm_cores {
            self.logger.borrow_mut().log_debug(
                &self.ctx,
                format!(
                    "cloudlet #{} requests {} cores but vm #{} has only {}",
                    cloudlet_id, cores, vm_id, vm_cores
                ),
            );
            self.fail_cloudlet(cloudlet_id, now);
            return;
        }
        let started = self.vms.get_mut(&vm_id).unwrap().scheduler.submit(cloudlet_id, cores);
        if started {
            self.cloudlets.get_mut(&cloudlet_id).unwrap().set_running(now);
            self.logger
                .borrow_mut()
                .log_debug(&self.ctx, format!("cloudlet #{} started on vm #{}", cloudlet_id, vm_id));
        } else {
            self.cloudlets.get_mut(&cloudlet_id).unwrap().set_queued();
            self.logger
                .borrow_mut()
                .log_debug(&self.ctx, format!("cloudlet #{} queued on vm #{}", cloudlet_id, vm_id));
        }
        self.reschedule_vm(vm_id);
    }

    fn dispatch_held_cloudlets(&mut self, vm_id: u32) {
        if let Some(held) = self.held_cloudlets.remove(&vm_id) {
            for cloudlet_id in held {
                self.dispatch_cloudlet(cloudlet_id, vm_id);
            }
        }
    }

    /// Recomputes progress rates of the VM's running cloudlets and reschedules
    /// their projected completion events accordingly.
    ///
    /// Progress accumulated at the old rate is integrated before the switch,
    /// so a recomputation never loses or duplicates work.
    fn reschedule_vm(&mut self, vm_id: u32) {
        let now = self.ctx.time();
        let rates = {
            let vm = &self.vms[&vm_id];
            vm.scheduler.rates(vm.allocated_mips(), vm.per_core_mips())
        };
        let mut failure = None;
        for (cloudlet_id, rate) in rates {
            let cloudlet = self.cloudlets.get_mut(&cloudlet_id).unwrap();
            cloudlet.update_progress(now);
            let remaining = cloudlet.remaining();
            if remaining < -progress_tolerance(cloudlet.length()) {
                failure = Some(format!(
                    "cloudlet #{} accumulated more instructions than its length",
                    cloudlet_id
                ));
                break;
            }
            cloudlet.set_rate(rate);
            if let Some(event_id) = cloudlet.completion_event.take() {
                self.ctx.cancel_event(event_id);
            }
            if rate > 0. {
                let delay = (remaining / rate).max(0.);
                cloudlet.completion_event =
                    Some(self.ctx.emit_self(CloudletCompleted { cloudlet_id }, delay));
            } else if remaining > progress_tolerance(cloudlet.length()) {
                failure = Some(format!("cloudlet #{} is running at zero rate", cloudlet_id));
                break;
            } else {
                cloudlet.completion_event =
                    Some(self.ctx.emit_self(CloudletCompleted { cloudlet_id }, 0.));
            }
        }
        if let Some(message) = failure {
            self.raise(message);
        }
    }

    fn on_cloudlet_completed(&mut self, cloudlet_id: u32, event_id: EventId) {
        let now = self.ctx.time();
        let stale = {
            let cloudlet = &self.cloudlets[&cloudlet_id];
            cloudlet.status() != CloudletStatus::Running || cloudlet.completion_event != Some(event_id)
        };
        if stale {
            self.raise(format!("stale completion event for cloudlet #{}", cloudlet_id));
            return;
        }
        let finished_early = {
            let cloudlet = self.cloudlets.get_mut(&cloudlet_id).unwrap();
            cloudlet.update_progress(now);
            cloudlet.remaining() > progress_tolerance(cloudlet.length())
        };
        if finished_early {
            self.raise(format!(
                "cloudlet #{} completed before reaching its length",
                cloudlet_id
            ));
            return;
        }
        let vm_id = {
            let cloudlet = self.cloudlets.get_mut(&cloudlet_id).unwrap();
            cloudlet.completion_event = None;
            cloudlet.set_success(now);
            cloudlet.vm_id().unwrap()
        };
        self.logger
            .borrow_mut()
            .log_debug(&self.ctx, format!("cloudlet #{} completed on vm #{}", cloudlet_id, vm_id));
        self.return_cloudlet(cloudlet_id);
        let started = self.vms.get_mut(&vm_id).unwrap().scheduler.remove(cloudlet_id);
        for started_id in started {
            self.cloudlets.get_mut(&started_id).unwrap().set_running(now);
            self.logger
                .borrow_mut()
                .log_debug(&self.ctx, format!("cloudlet #{} started on vm #{}", started_id, vm_id));
        }
        self.reschedule_vm(vm_id);
    }

    fn fail_cloudlet(&mut self, cloudlet_id: u32, time: f64) {
        self.cloudlets.get_mut(&cloudlet_id).unwrap().set_failed(time);
        self.return_cloudlet(cloudlet_id);
    }

    fn fail_bound_cloudlets(&mut self, vm_id: u32, time: f64) {
        self.held_cloudlets.remove(&vm_id);
        let bound: Vec<u32> = self
            .cloudlets
            .values()
            .filter(|cloudlet| {
                cloudlet.vm_id() == Some(vm_id)
                    && cloudlet.status() != CloudletStatus::Success
                    && cloudlet.status() != CloudletStatus::Failed
            })
            .map(|cloudlet| cloudlet.id)
            .collect();
        for cloudlet_id in bound {
            let cloudlet = self.cloudlets.get_mut(&cloudlet_id).unwrap();
            cloudlet.update_progress(time);
            if let Some(event_id) = cloudlet.completion_event.take() {
                self.ctx.cancel_event(event_id);
            }
            self.fail_cloudlet(cloudlet_id, time);
        }
    }

    fn return_cloudlet(&mut self, cloudlet_id: u32) {
        let (record, owner) = {
            let cloudlet = &self.cloudlets[&cloudlet_id];
            (cloudlet.record(), cloudlet.owner())
        };
        self.ctx.emit(CloudletReturned { record }, owner, 0.);
    }

    /// Fails every cloudlet that is still non-terminal once the event queue is
    /// drained, so that nothing submitted is silently dropped from the results.
    ///
    /// Returns the records of the newly failed cloudlets.
    pub fn finalize(&mut self, time: f64) -> Vec<CloudletRecord> {
        self.held_cloudlets.clear();
        let mut leftovers = Vec::new();
        for cloudlet in self.cloudlets.values_mut() {
            match cloudlet.status() {
                CloudletStatus::Success | CloudletStatus::Failed => {}
                _ => {
                    cloudlet.set_failed(time);
                    leftovers.push(cloudlet.record());
                }
            }
        }
        leftovers
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let event_id = event.id;
        let src = event.src;
        cast!(match event.data {
            VmCreateRequest { vm_id } => {
                self.on_vm_create_request(vm_id);
            }
            VmDeleteRequest { vm_id } => {
                self.on_vm_delete_request(vm_id);
            }
            CloudletSubmitRequest { cloudlet_id, vm_id } => {
                self.on_cloudlet_submit(cloudlet_id, vm_id, src);
            }
            CloudletCompleted { cloudlet_id } => {
                self.on_cloudlet_completed(cloudlet_id, event_id);
            }
        })
    }
}
