//! Cloudlet: a schedulable unit of work with a fixed instruction length.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use simcore::{EventId, Id};

/// Status of cloudlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    Created,
    Queued,
    Running,
    Success,
    Failed,
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "CREATED"),
            CloudletStatus::Queued => write!(f, "QUEUED"),
            CloudletStatus::Running => write!(f, "RUNNING"),
            CloudletStatus::Success => write!(f, "SUCCESS"),
            CloudletStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A task with fixed instruction length submitted to a specific VM.
///
/// A cloudlet belongs to at most one VM for its entire lifetime and is
/// terminal once it reaches `Success` or `Failed`.
#[derive(Clone, Debug)]
pub struct Cloudlet {
    pub id: u32,
    length: f64,
    cores: u32,
    input_size: u64,
    output_size: u64,
    status: CloudletStatus,
    vm_id: Option<u32>,
    owner: Id,
    submit_time: f64,
    start_time: f64,
    finish_time: f64,
    executed: f64,
    rate: f64,
    last_update: f64,
    pub(crate) completion_event: Option<EventId>,
}

impl Cloudlet {
    pub fn new(id: u32, length: f64, cores: u32, input_size: u64, output_size: u64) -> Self {
        Self {
            id,
            length,
            cores,
            input_size,
            output_size,
            status: CloudletStatus::Created,
            vm_id: None,
            owner: 0,
            submit_time: -1.,
            start_time: -1.,
            finish_time: -1.,
            executed: 0.,
            rate: 0.,
            last_update: 0.,
            completion_event: None,
        }
    }

    /// Instruction length in MI.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn input_size(&self) -> u64 {
        self.input_size
    }

    pub fn output_size(&self) -> u64 {
        self.output_size
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    /// Id of the VM the cloudlet is bound to.
    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    pub fn owner(&self) -> Id {
        self.owner
    }

    pub fn submit_time(&self) -> f64 {
        self.submit_time
    }

    /// Time at which the cloudlet started executing, -1 if it never ran.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn finish_time(&self) -> f64 {
        self.finish_time
    }

    /// Instructions executed so far, non-decreasing over time.
    pub fn executed(&self) -> f64 {
        self.executed
    }

    pub fn remaining(&self) -> f64 {
        self.length - self.executed
    }

    pub(crate) fn set_submitted(&mut self, vm_id: Option<u32>, owner: Id, time: f64) {
        self.vm_id = vm_id;
        self.owner = owner;
        self.submit_time = time;
    }

    pub(crate) fn set_queued(&mut self) {
        self.status = CloudletStatus::Queued;
    }

    pub(crate) fn set_running(&mut self, time: f64) {
        if self.start_time < 0. {
            self.start_time = time;
        }
        self.status = CloudletStatus::Running;
        self.last_update = time;
    }

    pub(crate) fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Integrates executed instructions at the current rate up to `time`.
    ///
    /// Progress already made is preserved across rate changes, so shares can
    /// be recomputed at any moment without losing work.
    pub(crate) fn update_progress(&mut self, time: f64) {
        if self.status == CloudletStatus::Running {
            self.executed += self.rate * (time - self.last_update);
            self.last_update = time;
        }
    }

    pub(crate) fn set_success(&mut self, time: f64) {
        self.status = CloudletStatus::Success;
        self.finish_time = time;
        self.executed = self.length;
    }

    pub(crate) fn set_failed(&mut self, time: f64) {
        self.status = CloudletStatus::Failed;
        self.finish_time = time;
    }

    /// Completed-cloudlet projection handed to report generation.
    ///
    /// The actual execution time is `finish_time - start_time` for successful
    /// cloudlets and zero otherwise.
    pub fn record(&self) -> CloudletRecord {
        let execution_time = if self.status == CloudletStatus::Success {
            self.finish_time - self.start_time
        } else {
            0.
        };
        CloudletRecord {
            id: self.id,
            status: self.status,
            vm_id: self.vm_id,
            execution_time,
            start_time: self.start_time,
            finish_time: self.finish_time,
        }
    }
}

/// Completed-cloudlet record exposed to report generation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CloudletRecord {
    pub id: u32,
    pub status: CloudletStatus,
    pub vm_id: Option<u32>,
    pub execution_time: f64,
    pub start_time: f64,
    pub finish_time: f64,
}
