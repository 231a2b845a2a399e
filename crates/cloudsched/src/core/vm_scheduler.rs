//! Division of a VM's allocated capacity among its cloudlets.

use std::collections::VecDeque;

use crate::core::common::SchedulingPolicy;

/// Decides which cloudlets bound to a VM run and at what instantaneous rate.
///
/// Mirrors the host scheduler one level down: the VM's allocated MIPS play
/// the role of host capacity, virtual cores play the role of PEs.
pub trait VmScheduler {
    fn policy(&self) -> SchedulingPolicy;

    /// Registers an arriving cloudlet; returns `true` if it starts immediately.
    fn submit(&mut self, cloudlet_id: u32, cores: u32) -> bool;

    /// Unregisters a finished or failed cloudlet; returns ids of queued
    /// cloudlets started in its place, in FIFO order.
    fn remove(&mut self, cloudlet_id: u32) -> Vec<u32>;

    /// Instantaneous rate in MIPS for every running cloudlet, given the total
    /// MIPS allocated to the VM and the effective MIPS of one virtual core.
    fn rates(&self, total_mips: f64, per_core_mips: f64) -> Vec<(u32, f64)>;

    /// Ids of currently running cloudlets.
    fn running(&self) -> Vec<u32>;
}

pub fn vm_scheduler_resolver(policy: SchedulingPolicy, cores: u32) -> Box<dyn VmScheduler> {
    match policy {
        SchedulingPolicy::TimeShared => Box::new(TimeSharedVmScheduler::new()),
        SchedulingPolicy::SpaceShared => Box::new(SpaceSharedVmScheduler::new(cores)),
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Processor-sharing scheduler: every bound cloudlet runs concurrently and
/// receives a max-min fair share of the VM capacity, capped by the rate its
/// core count can consume.
pub struct TimeSharedVmScheduler {
    active: Vec<(u32, u32)>,
}

impl TimeSharedVmScheduler {
    pub fn new() -> Self {
        Self { active: Vec::new() }
    }
}

impl Default for TimeSharedVmScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl VmScheduler for TimeSharedVmScheduler {
    fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::TimeShared
    }

    fn submit(&mut self, cloudlet_id: u32, cores: u32) -> bool {
        self.active.push((cloudlet_id, cores));
        true
    }

    fn remove(&mut self, cloudlet_id: u32) -> Vec<u32> {
        self.active.retain(|&(id, _)| id != cloudlet_id);
        Vec::new()
    }

    fn rates(&self, total_mips: f64, per_core_mips: f64) -> Vec<(u32, f64)> {
        if self.active.is_empty() {
            return Vec::new();
        }
        // Water-filling: satisfy the lightest consumers first, split what
        // remains evenly among those still capacity-constrained.
        let mut items: Vec<(u32, f64)> = self
            .active
            .iter()
            .map(|&(id, cores)| (id, cores as f64 * per_core_mips))
            .collect();
        items.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let mut remaining = total_mips;
        let mut left = items.len();
        let mut rates = Vec::with_capacity(items.len());
        for (id, cap) in items {
            let share = remaining / left as f64;
            let rate = cap.min(share);
            remaining -= rate;
            left -= 1;
            rates.push((id, rate));
        }
        rates
    }

    fn running(&self) -> Vec<u32> {
        self.active.iter().map(|&(id, _)| id).collect()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// FCFS scheduler: cloudlets occupy whole virtual cores at full per-core
/// capacity, the rest wait in a queue until cores free up.
pub struct SpaceSharedVmScheduler {
    cores_free: u32,
    active: Vec<(u32, u32)>,
    queue: VecDeque<(u32, u32)>,
}

impl SpaceSharedVmScheduler {
    pub fn new(cores: u32) -> Self {
        Self {
            cores_free: cores,
            active: Vec::new(),
            queue: VecDeque::new(),
        }
    }
}

impl VmScheduler for SpaceSharedVmScheduler {
    fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::SpaceShared
    }

    fn submit(&mut self, cloudlet_id: u32, cores: u32) -> bool {
        if self.queue.is_empty() && cores <= self.cores_free {
            self.cores_free -= cores;
            self.active.push((cloudlet_id, cores));
            true
        } else {
            self.queue.push_back((cloudlet_id, cores));
            false
        }
    }

    fn remove(&mut self, cloudlet_id: u32) -> Vec<u32> {
        if let Some(pos) = self.active.iter().position(|&(id, _)| id == cloudlet_id) {
            let (_, cores) = self.active.remove(pos);
            self.cores_free += cores;
        } else {
            self.queue.retain(|&(id, _)| id != cloudlet_id);
        }
        let mut started = Vec::new();
        while let Some(&(id, cores)) = self.queue.front() {
            if cores <= self.cores_free {
                self.cores_free -= cores;
                self.active.push((id, cores));
                self.queue.pop_front();
                started.push(id);
            } else {
                break;
            }
        }
        started
    }

    fn rates(&self, _total_mips: f64, per_core_mips: f64) -> Vec<(u32, f64)> {
        self.active
            .iter()
            .map(|&(id, cores)| (id, cores as f64 * per_core_mips))
            .collect()
    }

    fn running(&self) -> Vec<u32> {
        self.active.iter().map(|&(id, _)| id).collect()
    }
}
