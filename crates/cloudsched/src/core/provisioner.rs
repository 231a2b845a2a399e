//! Single-resource capacity bookkeeping.

use std::collections::BTreeMap;

use simcore::EPSILON;

/// Tracks allocations of one resource dimension against a finite capacity.
///
/// In space-shared mode a request that would exceed the remaining capacity is
/// rejected. In time-shared mode requests always succeed and record nominal
/// claims that may oversubscribe the capacity; normalizing effective rates
/// against the capacity is up to the scheduler owning the provisioner.
#[derive(Clone, Debug)]
pub struct Provisioner {
    capacity: f64,
    allocated: f64,
    allocations: BTreeMap<u32, f64>,
    overcommit: bool,
}

impl Provisioner {
    /// Creates a provisioner that rejects requests exceeding the capacity.
    pub fn space_shared(capacity: f64) -> Self {
        Self {
            capacity,
            allocated: 0.,
            allocations: BTreeMap::new(),
            overcommit: false,
        }
    }

    /// Creates a provisioner that records nominal claims without a capacity check.
    pub fn time_shared(capacity: f64) -> Self {
        Self {
            capacity,
            allocated: 0.,
            allocations: BTreeMap::new(),
            overcommit: true,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Returns the sum of current allocations (nominal claims in time-shared mode).
    pub fn allocated(&self) -> f64 {
        self.allocated
    }

    pub fn available(&self) -> f64 {
        (self.capacity - self.allocated).max(0.)
    }

    /// Returns the amount currently allocated to the consumer.
    pub fn allocation_of(&self, consumer: u32) -> f64 {
        self.allocations.get(&consumer).copied().unwrap_or(0.)
    }

    pub fn can_allocate(&self, amount: f64) -> bool {
        self.overcommit || amount <= self.available() + EPSILON
    }

    /// Records the allocation if capacity allows, returns whether it succeeded.
    pub fn allocate(&mut self, consumer: u32, amount: f64) -> bool {
        if !self.can_allocate(amount) {
            return false;
        }
        *self.allocations.entry(consumer).or_insert(0.) += amount;
        self.allocated += amount;
        true
    }

    /// Frees the consumer's allocation, returns the released amount.
    pub fn release(&mut self, consumer: u32) -> f64 {
        let amount = self.allocations.remove(&consumer).unwrap_or(0.);
        self.allocated = (self.allocated - amount).max(0.);
        amount
    }
}
