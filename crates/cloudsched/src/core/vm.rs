//! Virtual machine representation and status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use simcore::Id;

use crate::core::common::SchedulingPolicy;
use crate::core::vm_scheduler::{vm_scheduler_resolver, VmScheduler};

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    /// Creation requested, no placement decision yet.
    Requested,
    /// Waiting for host resources to free up.
    Queued,
    /// Placed on a host with its requested resources reserved.
    Running,
    /// No host could ever satisfy the request.
    FailedToAllocate,
    /// Destroyed, resources released.
    Finished,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Requested => write!(f, "requested"),
            VmStatus::Queued => write!(f, "queued"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::FailedToAllocate => write!(f, "failed_to_allocate"),
            VmStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Represents a virtual machine: the capacity it requests from a host plus
/// the scheduler that divides this capacity among cloudlets bound to the VM.
///
/// The VM refers to its host by id only; hosts are owned by the datacenter.
pub struct VirtualMachine {
    pub id: u32,
    /// Broker the VM belongs to.
    pub owner: Id,
    mips: f64,
    cores: u32,
    memory: u64,
    bandwidth: u64,
    storage: u64,
    status: VmStatus,
    host_id: Option<u32>,
    allocated_mips: f64,
    pub(crate) scheduler: Box<dyn VmScheduler>,
}

impl VirtualMachine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        owner: Id,
        mips: f64,
        cores: u32,
        memory: u64,
        bandwidth: u64,
        storage: u64,
        policy: SchedulingPolicy,
    ) -> Self {
        Self {
            id,
            owner,
            mips,
            cores,
            memory,
            bandwidth,
            storage,
            status: VmStatus::Requested,
            host_id: None,
            allocated_mips: 0.,
            scheduler: vm_scheduler_resolver(policy, cores),
        }
    }

    /// Requested MIPS per core.
    pub fn mips(&self) -> f64 {
        self.mips
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn memory(&self) -> u64 {
        self.memory
    }

    pub fn bandwidth(&self) -> u64 {
        self.bandwidth
    }

    pub fn storage(&self) -> u64 {
        self.storage
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// Id of the host the VM is placed on (or queued at).
    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    /// Effective total MIPS granted by the host scheduler.
    pub fn allocated_mips(&self) -> f64 {
        self.allocated_mips
    }

    /// Effective MIPS of one virtual core under the current host allocation.
    pub fn per_core_mips(&self) -> f64 {
        if self.cores > 0 {
            self.allocated_mips / self.cores as f64
        } else {
            0.
        }
    }

    pub(crate) fn set_placed(&mut self, host_id: u32, allocated_mips: f64) {
        self.status = VmStatus::Running;
        self.host_id = Some(host_id);
        self.allocated_mips = allocated_mips;
    }

    pub(crate) fn set_queued(&mut self, host_id: u32) {
        self.status = VmStatus::Queued;
        self.host_id = Some(host_id);
    }

    pub(crate) fn set_failed(&mut self) {
        self.status = VmStatus::FailedToAllocate;
    }

    pub(crate) fn set_finished(&mut self) {
        self.status = VmStatus::Finished;
        self.host_id = None;
        self.allocated_mips = 0.;
    }

    pub(crate) fn set_allocated_mips(&mut self, mips: f64) {
        self.allocated_mips = mips;
    }
}
