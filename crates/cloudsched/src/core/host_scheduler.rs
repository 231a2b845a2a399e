//! Division of host PE capacity among resident VMs.

use std::collections::BTreeMap;

use crate::core::common::SchedulingPolicy;
use crate::core::pe::Pe;
use crate::core::provisioner::Provisioner;

/// PE demand of a VM as seen by the host scheduler.
#[derive(Clone, Copy, Debug)]
pub struct PeDemand {
    pub vm_id: u32,
    pub cores: u32,
    pub mips_per_core: f64,
}

impl PeDemand {
    pub fn total_mips(&self) -> f64 {
        self.cores as f64 * self.mips_per_core
    }
}

/// Decides how the PE capacity of a host is divided among its resident VMs
/// and whether a new VM can be admitted.
pub trait HostScheduler {
    fn policy(&self) -> SchedulingPolicy;

    /// Checks whether the demand could ever be satisfied on the given PEs,
    /// regardless of the current residents.
    fn fits(&self, demand: &PeDemand, pes: &[Pe]) -> bool;

    /// Checks whether the demand can be admitted right now.
    fn can_admit(&self, demand: &PeDemand, pes: &[Pe]) -> bool;

    /// Admits the VM and recomputes effective shares of all residents.
    /// The caller must check `can_admit` first.
    fn admit(&mut self, demand: PeDemand, pes: &[Pe]);

    /// Removes the VM and recomputes effective shares of the remaining residents.
    fn remove(&mut self, vm_id: u32, pes: &[Pe]);

    /// Effective total MIPS currently granted to the VM.
    fn allocated_mips(&self, vm_id: u32) -> f64;

    /// Ids of resident VMs in admission order.
    fn resident_vms(&self) -> Vec<u32>;

    /// Number of PEs not yet claimed by resident VM cores. May go negative
    /// under time sharing; used only to rank hosts during placement.
    fn available_pes(&self, pes: &[Pe]) -> i64;
}

pub fn host_scheduler_resolver(policy: SchedulingPolicy, pes: &[Pe]) -> Box<dyn HostScheduler> {
    match policy {
        SchedulingPolicy::TimeShared => Box::new(TimeSharedHostScheduler::new(pes)),
        SchedulingPolicy::SpaceShared => Box::new(SpaceSharedHostScheduler::new(pes)),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Admits VMs regardless of PE contention and divides each PE's capacity
/// proportionally among the VM cores assigned to it, never granting a core
/// more than it requested.
///
/// Shares are recomputed on VM arrival and departure, not polled per step.
pub struct TimeSharedHostScheduler {
    mips: Provisioner,
    residents: Vec<PeDemand>,
    shares: BTreeMap<u32, f64>,
}

impl TimeSharedHostScheduler {
    pub fn new(pes: &[Pe]) -> Self {
        let capacity = pes.iter().map(|pe| pe.mips).sum();
        Self {
            mips: Provisioner::time_shared(capacity),
            residents: Vec::new(),
            shares: BTreeMap::new(),
        }
    }

    fn recompute_shares(&mut self, pes: &[Pe]) {
        // Cores are assigned to the least shared PE in admission order,
        // then every PE's capacity is split evenly among its sharers.
        let mut sharers = vec![0u32; pes.len()];
        let mut assignment = Vec::new();
        for demand in &self.residents {
            for _ in 0..demand.cores {
                let pe_idx = (0..pes.len()).min_by_key(|&i| (sharers[i], i)).unwrap();
                sharers[pe_idx] += 1;
                assignment.push((demand.vm_id, pe_idx, demand.mips_per_core));
            }
        }
        self.shares.clear();
        for (vm_id, pe_idx, requested) in assignment {
            let share = requested.min(pes[pe_idx].mips / sharers[pe_idx] as f64);
            *self.shares.entry(vm_id).or_insert(0.) += share;
        }
    }
}

impl HostScheduler for TimeSharedHostScheduler {
    fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::TimeShared
    }

    fn fits(&self, _demand: &PeDemand, pes: &[Pe]) -> bool {
        !pes.is_empty()
    }

    fn can_admit(&self, _demand: &PeDemand, pes: &[Pe]) -> bool {
        !pes.is_empty()
    }

    fn admit(&mut self, demand: PeDemand, pes: &[Pe]) {
        self.mips.allocate(demand.vm_id, demand.total_mips());
        self.residents.push(demand);
        self.recompute_shares(pes);
    }

    fn remove(&mut self, vm_id: u32, pes: &[Pe]) {
        self.mips.release(vm_id);
        self.residents.retain(|demand| demand.vm_id != vm_id);
        self.recompute_shares(pes);
    }

    fn allocated_mips(&self, vm_id: u32) -> f64 {
        self.shares.get(&vm_id).copied().unwrap_or(0.)
    }

    fn resident_vms(&self) -> Vec<u32> {
        self.residents.iter().map(|demand| demand.vm_id).collect()
    }

    fn available_pes(&self, pes: &[Pe]) -> i64 {
        let claimed: i64 = self.residents.iter().map(|demand| demand.cores as i64).sum();
        pes.len() as i64 - claimed
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Grants whole PEs exclusively: a VM is admitted only if enough free PEs
/// exist to cover its core count, and each resident VM keeps the full
/// nominal capacity of its PEs until it departs.
pub struct SpaceSharedHostScheduler {
    mips: Provisioner,
    free_pes: Vec<usize>,
    assignments: BTreeMap<u32, Vec<usize>>,
    order: Vec<u32>,
}

impl SpaceSharedHostScheduler {
    pub fn new(pes: &[Pe]) -> Self {
        let capacity = pes.iter().map(|pe| pe.mips).sum();
        Self {
            mips: Provisioner::space_shared(capacity),
            free_pes: (0..pes.len()).collect(),
            assignments: BTreeMap::new(),
            order: Vec::new(),
        }
    }
}

impl HostScheduler for SpaceSharedHostScheduler {
    fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::SpaceShared
    }

    fn fits(&self, demand: &PeDemand, pes: &[Pe]) -> bool {
        demand.cores as usize <= pes.len()
    }

    fn can_admit(&self, demand: &PeDemand, _pes: &[Pe]) -> bool {
        demand.cores as usize <= self.free_pes.len()
    }

    fn admit(&mut self, demand: PeDemand, pes: &[Pe]) {
        let assigned: Vec<usize> = self.free_pes.drain(..demand.cores as usize).collect();
        let granted: f64 = assigned.iter().map(|&i| demand.mips_per_core.min(pes[i].mips)).sum();
        self.mips.allocate(demand.vm_id, granted);
        self.assignments.insert(demand.vm_id, assigned);
        self.order.push(demand.vm_id);
    }

    fn remove(&mut self, vm_id: u32, _pes: &[Pe]) {
        if let Some(assigned) = self.assignments.remove(&vm_id) {
            self.free_pes.extend(assigned);
            self.free_pes.sort_unstable();
            self.mips.release(vm_id);
            self.order.retain(|&id| id != vm_id);
        }
    }

    fn allocated_mips(&self, vm_id: u32) -> f64 {
        self.mips.allocation_of(vm_id)
    }

    fn resident_vms(&self) -> Vec<u32> {
        self.order.clone()
    }

    fn available_pes(&self, _pes: &[Pe]) -> i64 {
        self.free_pes.len() as i64
    }
}
