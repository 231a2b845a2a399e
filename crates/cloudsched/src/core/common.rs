use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Resource sharing discipline applied by host and VM schedulers.
///
/// Within one simulation run the same policy is used at both levels:
/// host PE capacity divided among VMs and VM capacity divided among cloudlets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPolicy {
    /// Capacity is divided concurrently and proportionally among active consumers.
    TimeShared,
    /// Capacity is granted exclusively to one consumer at a time, others queue.
    SpaceShared,
}

impl Display for SchedulingPolicy {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            SchedulingPolicy::TimeShared => write!(f, "time-shared"),
            SchedulingPolicy::SpaceShared => write!(f, "space-shared"),
        }
    }
}

/// Outcome of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AllocationVerdict {
    Success,
    NotEnoughCpu,
    NotEnoughMemory,
    NotEnoughBandwidth,
    NotEnoughStorage,
}
