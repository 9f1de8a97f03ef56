//! Per-thread statistics

use serde::Serialize;
use std::ops::AddAssign;

/// Running counts for one traced thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerThreadStats {
    pub iops: u64,
    pub flops: u64,
    pub reads: u64,
    pub writes: u64,
    pub instrs: u64,
    pub comp_events: u64,
    pub comm_events: u64,
    pub sync_events: u64,
    pub markers: u64,
}

impl PerThreadStats {
    /// Events that consumed an event id
    #[must_use]
    pub fn events(&self) -> u64 {
        self.comp_events + self.comm_events + self.sync_events
    }
}

impl AddAssign for PerThreadStats {
    fn add_assign(&mut self, other: Self) {
        self.iops += other.iops;
        self.flops += other.flops;
        self.reads += other.reads;
        self.writes += other.writes;
        self.instrs += other.instrs;
        self.comp_events += other.comp_events;
        self.comm_events += other.comm_events;
        self.sync_events += other.sync_events;
        self.markers += other.markers;
    }
}
