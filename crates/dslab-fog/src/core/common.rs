use serde::Serialize;

/// Host capacity reserved for a single VM.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Allocation {
    pub id: u32,
    pub pes: u32,
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
}

#[derive(Debug, PartialEq)]
pub enum AllocationVerdict {
    NotEnoughPEs,
    SlowPEs,
    NotEnoughMemory,
    NotEnoughBandwidth,
    NotEnoughStorage,
    Success,
    HostNotFound,
}
