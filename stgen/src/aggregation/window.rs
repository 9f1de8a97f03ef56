//! Aggregation windows
//!
//! A window accumulates primitive events between two flush points. Taking a
//! window converts it into a finished record and leaves it empty (idle).

use std::collections::BTreeMap;

use crate::domain::{AddrRange, Eid, Tid};
use crate::logging::{CommEdge, CommRecord, ComputeRecord};
use crate::shadow::Producer;

use super::RangeSet;

/// In-flight Compute event
#[derive(Debug, Default)]
pub struct ComputeWindow {
    iops: u64,
    flops: u64,
    reads: u64,
    writes: u64,
    write_ranges: RangeSet,
    read_ranges: RangeSet,
}

impl ComputeWindow {
    /// At least one op or access since the last flush
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.prims() > 0
    }

    /// Number of primitive events folded into this window
    #[must_use]
    pub fn prims(&self) -> u64 {
        self.iops + self.flops + self.reads + self.writes
    }

    pub fn add_iop(&mut self) {
        self.iops += 1;
    }

    pub fn add_flop(&mut self) {
        self.flops += 1;
    }

    pub fn add_read(&mut self, range: AddrRange) {
        self.reads += 1;
        self.read_ranges.insert(range);
    }

    pub fn add_write(&mut self, range: AddrRange) {
        self.writes += 1;
        self.write_ranges.insert(range);
    }

    /// Close the window
    pub fn take(&mut self) -> ComputeRecord {
        let window = std::mem::take(self);
        ComputeRecord {
            iops: window.iops,
            flops: window.flops,
            reads: window.reads,
            writes: window.writes,
            write_ranges: window.write_ranges.to_vec(),
            read_ranges: window.read_ranges.to_vec(),
        }
    }
}

/// In-flight Communication event
///
/// Edges are merged per producer event, so repeated reads of the same
/// producer's data yield one minimal range set.
#[derive(Debug, Default)]
pub struct CommWindow {
    edges: BTreeMap<(Tid, Eid), RangeSet>,
}

impl CommWindow {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.edges.is_empty()
    }

    pub fn add(&mut self, producer: Producer) {
        self.edges.entry((producer.tid, producer.eid)).or_default().insert(producer.range);
    }

    /// Close the window; edges are ordered by producer thread, event, address
    pub fn take(&mut self) -> CommRecord {
        let edges = std::mem::take(&mut self.edges);
        edges_from(edges)
    }
}

impl FromIterator<Producer> for CommRecord {
    fn from_iter<I: IntoIterator<Item = Producer>>(iter: I) -> Self {
        let mut window = CommWindow::default();
        for producer in iter {
            window.add(producer);
        }
        window.take()
    }
}

fn edges_from(edges: BTreeMap<(Tid, Eid), RangeSet>) -> CommRecord {
    let edges = edges
        .into_iter()
        .flat_map(|((producer, producer_eid), ranges)| {
            ranges
                .to_vec()
                .into_iter()
                .map(move |range| CommEdge { producer, producer_eid, range })
        })
        .collect();
    CommRecord { edges }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, end: u64) -> AddrRange {
        AddrRange::new(start, end).unwrap()
    }

    #[test]
    fn test_compute_window_counts_and_resets() {
        let mut window = ComputeWindow::default();
        assert!(!window.is_active());

        window.add_iop();
        window.add_flop();
        window.add_read(range(0, 8));
        window.add_read(range(4, 12));
        window.add_write(range(64, 72));
        assert_eq!(window.prims(), 5);

        let record = window.take();
        assert_eq!(record.iops, 1);
        assert_eq!(record.flops, 1);
        assert_eq!(record.reads, 2);
        assert_eq!(record.writes, 1);
        assert_eq!(record.read_ranges, vec![range(0, 12)]);
        assert_eq!(record.write_ranges, vec![range(64, 72)]);
        assert!(!window.is_active());
    }

    #[test]
    fn test_read_and_write_ranges_are_independent() {
        let mut window = ComputeWindow::default();
        window.add_write(range(0, 4));
        window.add_read(range(100, 104));

        let record = window.take();
        assert_eq!(record.write_ranges, vec![range(0, 4)]);
        assert_eq!(record.read_ranges, vec![range(100, 104)]);
    }

    #[test]
    fn test_comm_window_merges_per_producer_event() {
        let mut window = CommWindow::default();
        window.add(Producer { tid: Tid(2), eid: Eid(1), range: range(8, 16) });
        window.add(Producer { tid: Tid(1), eid: Eid(0), range: range(0, 4) });
        window.add(Producer { tid: Tid(2), eid: Eid(1), range: range(0, 8) });

        let record = window.take();
        assert_eq!(
            record.edges,
            vec![
                CommEdge { producer: Tid(1), producer_eid: Eid(0), range: range(0, 4) },
                CommEdge { producer: Tid(2), producer_eid: Eid(1), range: range(0, 16) },
            ]
        );
        assert!(!window.is_active());
    }
}
