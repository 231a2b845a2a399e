//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Event identifier, assigned in order of event creation.
pub type EventId = u64;

/// Trait implemented by event payloads.
///
/// Any serializable static type can be used as a payload. Handlers recover
/// the concrete type by downcasting, usually via the [`cast!`](crate::cast!) macro.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// A timestamped message delivered to a simulation component.
pub struct Event {
    /// Unique identifier, doubles as the tie-breaker for equal timestamps.
    pub id: EventId,
    /// Simulation time at which the event is delivered.
    pub time: f64,
    /// Identifier of the component that produced the event.
    pub src: Id,
    /// Identifier of the component the event is delivered to.
    pub dst: Id,
    /// Erased payload.
    pub data: Box<dyn EventData>,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted ordering for use with BinaryHeap: the earliest event is the
// greatest, and on equal timestamps the event inserted first wins.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
