//! Finished event records
//!
//! A [`TraceRecord`] is what a thread context hands to its logger once an
//! aggregated event is closed. Records carry no event id: every record except
//! a Marker consumes the next id of its thread, so the id is implied by the
//! record's position in the thread's trace.

use stgen_common::{schema, SyncType};

use crate::domain::{AddrRange, DecodeError, Eid, Tid};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputeRecord {
    pub iops: u64,
    pub flops: u64,
    pub reads: u64,
    pub writes: u64,
    pub write_ranges: Vec<AddrRange>,
    pub read_ranges: Vec<AddrRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommEdge {
    pub producer: Tid,
    pub producer_eid: Eid,
    pub range: AddrRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommRecord {
    pub edges: Vec<CommEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRecord {
    pub sync_type: SyncType,
    pub addr: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRecord {
    pub instruction_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceRecord {
    Compute(ComputeRecord),
    Communication(CommRecord),
    Sync(SyncRecord),
    Marker(MarkerRecord),
}

impl TraceRecord {
    /// Whether this record is numbered in the thread's event id sequence
    #[must_use]
    pub fn consumes_eid(&self) -> bool {
        !matches!(self, TraceRecord::Marker(_))
    }
}

fn range_to_wire(range: &AddrRange) -> schema::AddrRange {
    schema::AddrRange { start: range.start, end: range.end }
}

fn range_from_wire(range: &schema::AddrRange) -> Result<AddrRange, DecodeError> {
    AddrRange::new(range.start, range.end)
        .ok_or(DecodeError::InvalidRange { start: range.start, end: range.end })
}

impl From<&TraceRecord> for schema::Event {
    fn from(record: &TraceRecord) -> Self {
        use schema::event::Kind;

        let kind = match record {
            TraceRecord::Compute(comp) => Kind::Comp(schema::Compute {
                iops: comp.iops,
                flops: comp.flops,
                reads: comp.reads,
                writes: comp.writes,
                write_addrs: comp.write_ranges.iter().map(range_to_wire).collect(),
                read_addrs: comp.read_ranges.iter().map(range_to_wire).collect(),
            }),
            TraceRecord::Communication(comm) => Kind::Comm(schema::Communication {
                edges: comm
                    .edges
                    .iter()
                    .map(|edge| schema::CommEdge {
                        producer_thread: edge.producer.0,
                        producer_event: edge.producer_eid.0,
                        addrs: Some(range_to_wire(&edge.range)),
                    })
                    .collect(),
            }),
            TraceRecord::Sync(sync) => Kind::Sync(schema::Sync {
                sync_type: schema::SyncKind::from(sync.sync_type) as i32,
                id: sync.addr,
            }),
            TraceRecord::Marker(marker) => {
                Kind::Marker(schema::Marker { count: marker.instruction_count })
            }
        };

        schema::Event { kind: Some(kind) }
    }
}

impl TryFrom<schema::Event> for TraceRecord {
    type Error = DecodeError;

    fn try_from(event: schema::Event) -> Result<Self, Self::Error> {
        use schema::event::Kind;

        match event.kind.ok_or(DecodeError::EmptyEvent)? {
            Kind::Comp(comp) => Ok(TraceRecord::Compute(ComputeRecord {
                iops: comp.iops,
                flops: comp.flops,
                reads: comp.reads,
                writes: comp.writes,
                write_ranges: comp
                    .write_addrs
                    .iter()
                    .map(range_from_wire)
                    .collect::<Result<_, _>>()?,
                read_ranges: comp.read_addrs.iter().map(range_from_wire).collect::<Result<_, _>>()?,
            })),
            Kind::Comm(comm) => {
                let edges = comm
                    .edges
                    .iter()
                    .map(|edge| {
                        let range = edge.addrs.as_ref().ok_or(DecodeError::MissingRange)?;
                        Ok(CommEdge {
                            producer: Tid(edge.producer_thread),
                            producer_eid: Eid(edge.producer_event),
                            range: range_from_wire(range)?,
                        })
                    })
                    .collect::<Result<_, DecodeError>>()?;
                Ok(TraceRecord::Communication(CommRecord { edges }))
            }
            Kind::Sync(sync) => {
                let sync_type = schema::SyncKind::try_from(sync.sync_type)
                    .ok()
                    .and_then(|kind| SyncType::try_from(kind).ok())
                    .ok_or(DecodeError::UnknownSyncType(sync.sync_type))?;
                Ok(TraceRecord::Sync(SyncRecord { sync_type, addr: sync.id }))
            }
            Kind::Marker(marker) => {
                Ok(TraceRecord::Marker(MarkerRecord { instruction_count: marker.count }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_do_not_consume_eids() {
        let marker = TraceRecord::Marker(MarkerRecord { instruction_count: 10 });
        let sync = TraceRecord::Sync(SyncRecord { sync_type: SyncType::Join, addr: 0 });
        assert!(!marker.consumes_eid());
        assert!(sync.consumes_eid());
    }

    #[test]
    fn test_unspecified_sync_kind_rejected() {
        let event = schema::Event {
            kind: Some(schema::event::Kind::Sync(schema::Sync { sync_type: 0, id: 0x10 })),
        };
        assert!(matches!(TraceRecord::try_from(event), Err(DecodeError::UnknownSyncType(0))));
    }

    #[test]
    fn test_edge_without_range_rejected() {
        let event = schema::Event {
            kind: Some(schema::event::Kind::Comm(schema::Communication {
                edges: vec![schema::CommEdge { producer_thread: 1, producer_event: 0, addrs: None }],
            })),
        };
        assert!(matches!(TraceRecord::try_from(event), Err(DecodeError::MissingRange)));
    }

    #[test]
    fn test_empty_event_rejected() {
        let event = schema::Event { kind: None };
        assert!(matches!(TraceRecord::try_from(event), Err(DecodeError::EmptyEvent)));
    }
}
