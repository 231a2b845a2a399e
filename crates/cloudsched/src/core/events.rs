//! Standard simulation events.

// VM ALLOCATION EVENTS ////////////////////////////////////////////////////////////////////////////

pub mod allocation {
    use serde::Serialize;

    use crate::core::common::AllocationVerdict;

    #[derive(Serialize)]
    pub struct VmCreateRequest {
        pub vm_id: u32,
    }

    #[derive(Serialize)]
    pub struct VmCreated {
        pub vm_id: u32,
        pub host_id: u32,
    }

    #[derive(Serialize)]
    pub struct VmCreationQueued {
        pub vm_id: u32,
        pub host_id: u32,
    }

    #[derive(Serialize)]
    pub struct VmCreationFailed {
        pub vm_id: u32,
        pub reason: AllocationVerdict,
    }

    #[derive(Serialize)]
    pub struct VmDeleteRequest {
        pub vm_id: u32,
    }
}

// CLOUDLET LIFECYCLE EVENTS ///////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::CloudletRecord;

    #[derive(Serialize)]
    pub struct CloudletSubmitRequest {
        pub cloudlet_id: u32,
        pub vm_id: Option<u32>,
    }

    /// Projected completion of a running cloudlet, rescheduled whenever the
    /// cloudlet's progress rate changes.
    #[derive(Serialize)]
    pub struct CloudletCompleted {
        pub cloudlet_id: u32,
    }

    #[derive(Serialize)]
    pub struct CloudletReturned {
        pub record: CloudletRecord,
    }
}
