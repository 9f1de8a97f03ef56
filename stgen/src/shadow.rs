//! # Shadow Memory
//!
//! Process-wide record of which thread (and which of its events) last wrote
//! each byte. Consulted on every read to discover inter-thread communication.
//!
//! ## Representation
//!
//! An ordered interval map keyed by segment start: `start -> (end, owner)`.
//! Segments never overlap. Bytes with no segment have never been written.
//!
//! ```text
//!  0x00        0x08        0x10        0x18
//!   ├── T1/E0 ──┤           ├── T2/E3 ──┤
//!                 (unowned)
//! ```
//!
//! A write carves its range out of any existing segments (keeping the parts
//! outside the range with their previous owner) and inserts a new segment,
//! coalescing with directly adjacent segments of the same owner.
//!
//! Addresses are treated as opaque 64-bit keys, so spurious addresses far
//! outside the normal process layout are stored like any other.
//!
//! ## Concurrency
//!
//! All traced threads share one instance. A single mutex guards the map; the
//! critical sections are short and I/O dominates the pipeline cost.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{AddrRange, Eid, Tid};

/// Identity of the last writer of a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner {
    pub tid: Tid,
    pub eid: Eid,
}

/// A communication edge found by a read: `range` was last written by event
/// `eid` of thread `tid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Producer {
    pub tid: Tid,
    pub eid: Eid,
    pub range: AddrRange,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    end: u64,
    owner: Owner,
}

/// Shared last-writer map
#[derive(Debug, Default)]
pub struct ShadowMemory {
    segments: Mutex<BTreeMap<u64, Segment>>,
}

impl ShadowMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation leaves the map consistent before returning, so a panic
    // elsewhere while holding the lock cannot corrupt it.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, Segment>> {
        self.segments.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assert ownership of `range` to `owner`, superseding previous owners of
    /// exactly that range.
    pub fn record_write(&self, range: AddrRange, owner: Owner) {
        let mut map = self.lock();
        carve(&mut map, range);

        let mut start = range.start;
        let mut end = range.end;

        if let Some((&left_start, left)) = map.range(..range.start).next_back() {
            if left.end == range.start && left.owner == owner {
                start = left_start;
            }
        }
        if let Some(right) = map.get(&range.end).copied() {
            if right.owner == owner {
                map.remove(&range.end);
                end = right.end;
            }
        }

        map.insert(start, Segment { end, owner });
    }

    /// Look up the producers of the bytes in `range` as seen by thread `reader`.
    ///
    /// Yields one [`Producer`] per maximal sub-range owned by a single event of
    /// a thread other than `reader`, in address order. Unowned bytes and bytes
    /// last written by `reader` itself yield nothing. Reads never change
    /// ownership.
    #[must_use]
    pub fn record_read(&self, range: AddrRange, reader: Tid) -> Vec<Producer> {
        let map = self.lock();

        let straddling = map
            .range(..=range.start)
            .next_back()
            .filter(|(_, seg)| seg.end > range.start);
        let inside = map.range((Bound::Excluded(range.start), Bound::Excluded(range.end)));

        let mut producers: Vec<Producer> = Vec::new();
        for (&start, seg) in straddling.into_iter().chain(inside) {
            if seg.owner.tid == reader {
                continue;
            }
            let Some(overlap) = AddrRange::new(start, seg.end).and_then(|s| s.intersect(&range))
            else {
                continue;
            };

            match producers.last_mut() {
                Some(last)
                    if last.tid == seg.owner.tid
                        && last.eid == seg.owner.eid
                        && last.range.end == overlap.start =>
                {
                    last.range.end = overlap.end;
                }
                _ => producers.push(Producer {
                    tid: seg.owner.tid,
                    eid: seg.owner.eid,
                    range: overlap,
                }),
            }
        }
        producers
    }

    /// Current last writer of a single byte
    #[must_use]
    pub fn owner_at(&self, addr: u64) -> Option<Owner> {
        let map = self.lock();
        map.range(..=addr)
            .next_back()
            .filter(|(_, seg)| seg.end > addr)
            .map(|(_, seg)| seg.owner)
    }

    /// Number of stored segments
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.lock().len()
    }
}

/// Remove `range` from the map, trimming segments that extend past either end.
fn carve(map: &mut BTreeMap<u64, Segment>, range: AddrRange) {
    if let Some((&start, &seg)) = map.range(..range.start).next_back() {
        if seg.end > range.start {
            map.insert(start, Segment { end: range.start, owner: seg.owner });
            if seg.end > range.end {
                // The old segment covered the whole range.
                map.insert(range.end, Segment { end: seg.end, owner: seg.owner });
                return;
            }
        }
    }

    let inside: Vec<u64> = map.range(range.start..range.end).map(|(&start, _)| start).collect();
    for start in inside {
        if let Some(seg) = map.remove(&start) {
            if seg.end > range.end {
                map.insert(range.end, Segment { end: seg.end, owner: seg.owner });
            }
        }
    }
}
