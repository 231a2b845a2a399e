//! Broker: submits VMs and cloudlets, collects completed cloudlets.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use simcore::cast;
use simcore::context::SimulationContext;
use simcore::event::Event;
use simcore::handler::EventHandler;
use simcore::Id;

use crate::core::cloudlet::CloudletRecord;
use crate::core::events::allocation::{VmCreateRequest, VmCreated, VmCreationFailed, VmCreationQueued};
use crate::core::events::cloudlet::{CloudletReturned, CloudletSubmitRequest};
use crate::core::logger::Logger;

/// Submits the VM list and the bound cloudlet list to the datacenter and
/// collects cloudlets as they reach a terminal status.
///
/// Cloudlets are submitted once every VM creation request has been answered.
/// A cloudlet without an explicit binding is bound by its position: cloudlet
/// *i* goes to VM *i mod V*.
pub struct Broker {
    datacenter_id: Id,
    vm_ids: Vec<u32>,
    cloudlets: Vec<(u32, Option<u32>)>,
    acked_vms: HashSet<u32>,
    cloudlets_submitted: bool,
    received: Vec<CloudletRecord>,
    logger: Rc<RefCell<Box<dyn Logger>>>,
    ctx: SimulationContext,
}

impl Broker {
    pub fn new(datacenter_id: Id, logger: Rc<RefCell<Box<dyn Logger>>>, ctx: SimulationContext) -> Self {
        Self {
            datacenter_id,
            vm_ids: Vec::new(),
            cloudlets: Vec::new(),
            acked_vms: HashSet::new(),
            cloudlets_submitted: false,
            received: Vec::new(),
            logger,
            ctx,
        }
    }

    pub fn id(&self) -> Id {
        self.ctx.id()
    }

    /// Queues VMs for creation at simulation start.
    pub fn submit_vms(&mut self, vm_ids: Vec<u32>) {
        self.vm_ids.extend(vm_ids);
    }

    /// Queues cloudlets bound by submission position (cloudlet *i* to VM *i mod V*).
    pub fn submit_cloudlets(&mut self, cloudlet_ids: Vec<u32>) {
        self.cloudlets.extend(cloudlet_ids.into_iter().map(|id| (id, None)));
    }

    /// Queues a cloudlet with an explicit VM binding.
    pub fn submit_cloudlet_to(&mut self, cloudlet_id: u32, vm_id: u32) {
        self.cloudlets.push((cloudlet_id, Some(vm_id)));
    }

    /// Emits creation requests for all queued VMs; called once at simulation start.
    pub fn start(&mut self) {
        let vm_ids = self.vm_ids.clone();
        for vm_id in vm_ids {
            self.ctx.emit(VmCreateRequest { vm_id }, self.datacenter_id, 0.);
        }
        if self.vm_ids.is_empty() {
            self.submit_bound_cloudlets();
        }
    }

    fn submit_bound_cloudlets(&mut self) {
        self.cloudlets_submitted = true;
        let cloudlets = self.cloudlets.clone();
        for (position, (cloudlet_id, binding)) in cloudlets.into_iter().enumerate() {
            let vm_id = binding.or_else(|| {
                if self.vm_ids.is_empty() {
                    None
                } else {
                    Some(self.vm_ids[position % self.vm_ids.len()])
                }
            });
            self.ctx
                .emit(CloudletSubmitRequest { cloudlet_id, vm_id }, self.datacenter_id, 0.);
        }
    }

    fn on_vm_ack(&mut self, vm_id: u32) {
        self.acked_vms.insert(vm_id);
        if !self.cloudlets_submitted && self.acked_vms.len() == self.vm_ids.len() {
            self.submit_bound_cloudlets();
        }
    }

    /// Returns collected cloudlet records ordered by cloudlet id.
    ///
    /// Meant to be consumed after the simulation reports idle.
    pub fn received_cloudlets(&self) -> Vec<CloudletRecord> {
        let mut records = self.received.clone();
        records.sort_by_key(|record| record.id);
        records
    }

    /// Accepts records produced outside the event loop (run finalization).
    pub(crate) fn absorb(&mut self, records: Vec<CloudletRecord>) {
        self.received.extend(records);
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreated { vm_id, host_id } => {
                self.logger
                    .borrow_mut()
                    .log_debug(&self.ctx, format!("vm #{} created on host #{}", vm_id, host_id));
                self.on_vm_ack(vm_id);
            }
            VmCreationQueued { vm_id, host_id } => {
                self.logger
                    .borrow_mut()
                    .log_debug(&self.ctx, format!("vm #{} queued on host #{}", vm_id, host_id));
                self.on_vm_ack(vm_id);
            }
            VmCreationFailed { vm_id, reason } => {
                self.logger
                    .borrow_mut()
                    .log_debug(&self.ctx, format!("vm #{} creation failed: {:?}", vm_id, reason));
                self.on_vm_ack(vm_id);
            }
            CloudletReturned { record } => {
                self.logger.borrow_mut().log_debug(
                    &self.ctx,
                    format!("cloudlet #{} returned with status {}", record.id, record.status),
                );
                self.received.push(record);
            }
        })
    }
}
