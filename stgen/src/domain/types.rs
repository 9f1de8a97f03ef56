//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing an event id where a
//! thread id is expected, and make function signatures more expressive.

use std::fmt;

/// Thread ID of a traced thread
///
/// Assigned by the instrumentation front end. This is not an OS thread of the
/// tracer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Event ID
///
/// Per-thread sequence number of a finished (flushed) event, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Eid(pub u64);

impl Eid {
    /// The id following this one
    #[must_use]
    pub fn next(self) -> Eid {
        Eid(self.0 + 1)
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EID:{}", self.0)
    }
}

/// Half-open byte address range `[start, end)`
///
/// Addresses are opaque 64-bit keys; no bound on the address space is assumed.
/// The constructors never yield an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddrRange {
    pub start: u64,
    pub end: u64,
}

impl AddrRange {
    /// Range `[start, end)`, or `None` if it would be empty
    #[must_use]
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Range covered by an access of `bytes` bytes at `start`.
    ///
    /// The end saturates at `u64::MAX` for accesses reported near the top of
    /// the address space. Zero-length accesses, and accesses starting at
    /// `u64::MAX`, yield `None`.
    #[must_use]
    pub fn from_access(start: u64, bytes: u64) -> Option<Self> {
        Self::new(start, start.saturating_add(bytes))
    }

    /// Overlapping part of two ranges
    #[must_use]
    pub fn intersect(&self, other: &AddrRange) -> Option<AddrRange> {
        AddrRange::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:x}, 0x{:x})", self.start, self.end)
    }
}
