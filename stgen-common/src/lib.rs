//! # Shared Trace Schema (Generator ↔ Readers)
//!
//! Defines the synchronization codes reported by the instrumentation front end
//! and the binary schema of the per-thread event trace. Both the generator
//! (`stgen`) and downstream trace readers depend on this crate so the two
//! sides can never disagree on tags or field numbers.
//!
//! ## Key Types
//!
//! - [`SyncType`] - Synchronization primitive kind, converted from the raw front-end code
//! - [`schema::EventStream`] - One serialized batch of finished event records
//! - [`schema::Event`] - A single tagged record (Compute, Communication, Sync or Marker)
//!
//! ## Wire Format
//!
//! A trace file is a gzip stream containing a sequence of length-delimited
//! [`schema::EventStream`] messages, one per flushed batch.

use core::fmt;

// ============================================================================
// Synchronization Codes
// ============================================================================

/// Mutex acquire (`pthread_mutex_lock`)
pub const SYNC_LOCK: u8 = 1;

/// Mutex release (`pthread_mutex_unlock`)
pub const SYNC_UNLOCK: u8 = 2;

/// Thread creation (`pthread_create`); the address is the new thread's handle
pub const SYNC_SPAWN: u8 = 3;

/// Thread join (`pthread_join`)
pub const SYNC_JOIN: u8 = 4;

/// Barrier wait (`pthread_barrier_wait`)
pub const SYNC_BARRIER: u8 = 5;

/// Condition variable wait
pub const SYNC_COND_WAIT: u8 = 6;

/// Condition variable signal
pub const SYNC_COND_SIGNAL: u8 = 7;

/// Condition variable broadcast
pub const SYNC_COND_BROADCAST: u8 = 8;

/// Spin lock acquire
pub const SYNC_SPIN_LOCK: u8 = 9;

/// Spin lock release
pub const SYNC_SPIN_UNLOCK: u8 = 10;

/// Synchronization primitive kind.
///
/// Discriminants match the raw codes emitted by the instrumentation front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum SyncType {
    Lock = SYNC_LOCK,
    Unlock = SYNC_UNLOCK,
    Spawn = SYNC_SPAWN,
    Join = SYNC_JOIN,
    Barrier = SYNC_BARRIER,
    CondWait = SYNC_COND_WAIT,
    CondSignal = SYNC_COND_SIGNAL,
    CondBroadcast = SYNC_COND_BROADCAST,
    SpinLock = SYNC_SPIN_LOCK,
    SpinUnlock = SYNC_SPIN_UNLOCK,
}

impl SyncType {
    /// Every synchronization kind, in code order
    pub const ALL: [SyncType; 10] = [
        SyncType::Lock,
        SyncType::Unlock,
        SyncType::Spawn,
        SyncType::Join,
        SyncType::Barrier,
        SyncType::CondWait,
        SyncType::CondSignal,
        SyncType::CondBroadcast,
        SyncType::SpinLock,
        SyncType::SpinUnlock,
    ];

    /// Raw front-end code
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Upper-case name as used in traces and replay scripts
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SyncType::Lock => "LOCK",
            SyncType::Unlock => "UNLOCK",
            SyncType::Spawn => "SPAWN",
            SyncType::Join => "JOIN",
            SyncType::Barrier => "BARRIER",
            SyncType::CondWait => "COND_WAIT",
            SyncType::CondSignal => "COND_SIGNAL",
            SyncType::CondBroadcast => "COND_BROADCAST",
            SyncType::SpinLock => "SPIN_LOCK",
            SyncType::SpinUnlock => "SPIN_UNLOCK",
        }
    }

    /// Look up a kind by name (case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<SyncType> {
        SyncType::ALL.into_iter().find(|ty| ty.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw code that does not name any synchronization kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownSyncCode(pub u8);

impl fmt::Display for UnknownSyncCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown synchronization code {}", self.0)
    }
}

impl std::error::Error for UnknownSyncCode {}

impl TryFrom<u8> for SyncType {
    type Error = UnknownSyncCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        SyncType::ALL
            .into_iter()
            .find(|ty| ty.code() == code)
            .ok_or(UnknownSyncCode(code))
    }
}

// ============================================================================
// Binary Schema
// ============================================================================

/// Protobuf schema of the trace.
///
/// Field numbers are part of the on-disk format and must never be reused.
pub mod schema {
    /// Half-open byte address range `[start, end)`
    #[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
    pub struct AddrRange {
        #[prost(uint64, tag = "1")]
        pub start: u64,
        #[prost(uint64, tag = "2")]
        pub end: u64,
    }

    /// Aggregated computation between two flush points
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Compute {
        #[prost(uint64, tag = "1")]
        pub iops: u64,
        #[prost(uint64, tag = "2")]
        pub flops: u64,
        #[prost(uint64, tag = "3")]
        pub reads: u64,
        #[prost(uint64, tag = "4")]
        pub writes: u64,
        #[prost(message, repeated, tag = "5")]
        pub write_addrs: ::prost::alloc::vec::Vec<AddrRange>,
        #[prost(message, repeated, tag = "6")]
        pub read_addrs: ::prost::alloc::vec::Vec<AddrRange>,
    }

    /// One producer -> consumer dependency
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CommEdge {
        #[prost(uint32, tag = "1")]
        pub producer_thread: u32,
        #[prost(uint64, tag = "2")]
        pub producer_event: u64,
        #[prost(message, optional, tag = "3")]
        pub addrs: ::core::option::Option<AddrRange>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Communication {
        #[prost(message, repeated, tag = "1")]
        pub edges: ::prost::alloc::vec::Vec<CommEdge>,
    }

    #[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
    pub struct Sync {
        #[prost(enumeration = "SyncKind", tag = "1")]
        pub sync_type: i32,
        /// Address of the synchronization object
        #[prost(uint64, tag = "2")]
        pub id: u64,
    }

    /// Instruction-count checkpoint
    #[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
    pub struct Marker {
        #[prost(uint64, tag = "1")]
        pub count: u64,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Event {
        #[prost(oneof = "event::Kind", tags = "1, 2, 3, 4")]
        pub kind: ::core::option::Option<event::Kind>,
    }

    pub mod event {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Kind {
            #[prost(message, tag = "1")]
            Comp(super::Compute),
            #[prost(message, tag = "2")]
            Comm(super::Communication),
            #[prost(message, tag = "3")]
            Sync(super::Sync),
            #[prost(message, tag = "4")]
            Marker(super::Marker),
        }
    }

    /// One batch of records; the unit of compression and I/O
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct EventStream {
        #[prost(message, repeated, tag = "1")]
        pub events: ::prost::alloc::vec::Vec<Event>,
    }

    /// Wire enumeration of synchronization kinds.
    ///
    /// Zero is reserved as the protobuf default and never written.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum SyncKind {
        Unspecified = 0,
        Lock = 1,
        Unlock = 2,
        Spawn = 3,
        Join = 4,
        Barrier = 5,
        CondWait = 6,
        CondSignal = 7,
        CondBroadcast = 8,
        SpinLock = 9,
        SpinUnlock = 10,
    }
}

impl From<SyncType> for schema::SyncKind {
    fn from(ty: SyncType) -> Self {
        match ty {
            SyncType::Lock => schema::SyncKind::Lock,
            SyncType::Unlock => schema::SyncKind::Unlock,
            SyncType::Spawn => schema::SyncKind::Spawn,
            SyncType::Join => schema::SyncKind::Join,
            SyncType::Barrier => schema::SyncKind::Barrier,
            SyncType::CondWait => schema::SyncKind::CondWait,
            SyncType::CondSignal => schema::SyncKind::CondSignal,
            SyncType::CondBroadcast => schema::SyncKind::CondBroadcast,
            SyncType::SpinLock => schema::SyncKind::SpinLock,
            SyncType::SpinUnlock => schema::SyncKind::SpinUnlock,
        }
    }
}

impl TryFrom<schema::SyncKind> for SyncType {
    type Error = UnknownSyncCode;

    fn try_from(kind: schema::SyncKind) -> Result<Self, Self::Error> {
        // Wire values 1..=10 are the front-end codes; 0 is rejected here.
        let code = u8::try_from(kind as i32).map_err(|_| UnknownSyncCode(u8::MAX))?;
        SyncType::try_from(code)
    }
}
