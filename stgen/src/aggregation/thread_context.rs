//! # Thread Context
//!
//! The aggregation state machine of one traced thread.
//!
//! ## States
//!
//! ```text
//!            iop / flop / read / write
//!   ┌──────┐ ───────────────────────────▶ ┌─────────────┐
//!   │ Idle │                              │ Aggregating │
//!   └──────┘ ◀─────────────────────────── └─────────────┘
//!             flush: sync, flush_all, threshold (compressed),
//!                    new communication (uncompressed)
//! ```
//!
//! Each flush numbers the finished records with the thread's next event ids
//! and hands them to the logger. Synchronization records are never aggregated:
//! the open window is flushed first, then the sync record is emitted.
//!
//! ## Variants
//!
//! - **Compressed**: reads that discover producers add edges to the window's
//!   communication set; computation and communication of one window are
//!   flushed together (Compute first, then Communication). The window also
//!   closes once it holds `prims_per_event` primitives.
//! - **Uncompressed**: a read that discovers producers closes the current
//!   Compute event and emits a Communication event of its own; the two are
//!   never mixed.
//!
//! Writes are attributed in shadow memory to the event id the open Compute
//! event will receive when flushed.

use std::sync::Arc;

use log::{error, trace};
use stgen_common::SyncType;

use crate::config::{AggregationMode, TraceConfig};
use crate::domain::{AddrRange, Eid, Tid, TraceError};
use crate::logging::{EventLog, MarkerRecord, SyncRecord, TraceRecord};
use crate::shadow::{Owner, ShadowMemory};

use super::{CommWindow, ComputeWindow, PerThreadStats};

enum Variant {
    Compressed { prims_per_event: u64, comm: CommWindow },
    Uncompressed,
}

/// Aggregation state, logger and statistics of one traced thread
pub struct ThreadContext<L: EventLog> {
    tid: Tid,
    shadow: Arc<ShadowMemory>,
    logger: L,
    next_eid: Eid,
    comp: ComputeWindow,
    variant: Variant,
    instrs_per_marker: u64,
    instrs_since_marker: u64,
    stats: PerThreadStats,
    closed: bool,
    /// A logger error has already been returned to the caller
    failed: bool,
}

impl<L: EventLog> ThreadContext<L> {
    /// Create a context in the variant selected by `config.mode`
    #[must_use]
    pub fn new(tid: Tid, config: &TraceConfig, shadow: Arc<ShadowMemory>, logger: L) -> Self {
        let variant = match config.mode {
            AggregationMode::Compressed => Variant::Compressed {
                prims_per_event: config.prims_per_event.max(1),
                comm: CommWindow::default(),
            },
            AggregationMode::Uncompressed => Variant::Uncompressed,
        };

        Self {
            tid,
            shadow,
            logger,
            next_eid: Eid(0),
            comp: ComputeWindow::default(),
            variant,
            instrs_per_marker: config.instrs_per_marker,
            instrs_since_marker: 0,
            stats: PerThreadStats::default(),
            closed: false,
            failed: false,
        }
    }

    #[must_use]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// Snapshot of the running statistics
    #[must_use]
    pub fn stats(&self) -> PerThreadStats {
        self.stats
    }

    #[must_use]
    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// An aggregated event is open
    #[must_use]
    pub fn is_aggregating(&self) -> bool {
        let comm_active = match &self.variant {
            Variant::Compressed { comm, .. } => comm.is_active(),
            Variant::Uncompressed => false,
        };
        self.comp.is_active() || comm_active
    }

    pub fn on_iop(&mut self) -> Result<(), TraceError> {
        self.comp.add_iop();
        self.stats.iops += 1;
        self.check_flush_limit()
    }

    pub fn on_flop(&mut self) -> Result<(), TraceError> {
        self.comp.add_flop();
        self.stats.flops += 1;
        self.check_flush_limit()
    }

    pub fn on_read(&mut self, start: u64, bytes: u64) -> Result<(), TraceError> {
        let Some(range) = self.access_range("read", start, bytes) else {
            return Ok(());
        };
        self.stats.reads += 1;

        let producers = self.shadow.record_read(range, self.tid);

        if let Variant::Compressed { comm, .. } = &mut self.variant {
            for producer in producers {
                comm.add(producer);
            }
            self.comp.add_read(range);
            return self.check_flush_limit();
        }

        if !producers.is_empty() {
            self.flush_compute()?;
            self.emit(TraceRecord::Communication(producers.into_iter().collect()))?;
            self.stats.comm_events += 1;
        }
        self.comp.add_read(range);
        Ok(())
    }

    pub fn on_write(&mut self, start: u64, bytes: u64) -> Result<(), TraceError> {
        let Some(range) = self.access_range("write", start, bytes) else {
            return Ok(());
        };
        self.stats.writes += 1;

        self.comp.add_write(range);
        self.shadow.record_write(range, Owner { tid: self.tid, eid: self.next_eid });
        self.check_flush_limit()
    }

    pub fn on_sync(&mut self, sync_type: SyncType, addr: u64) -> Result<(), TraceError> {
        self.flush_window()?;
        self.emit(TraceRecord::Sync(SyncRecord { sync_type, addr }))?;
        self.stats.sync_events += 1;
        Ok(())
    }

    /// Account `count` executed instructions, emitting a Marker each time the
    /// configured interval is reached
    pub fn on_instr(&mut self, count: u64) -> Result<(), TraceError> {
        self.stats.instrs += count;
        if self.instrs_per_marker == 0 {
            return Ok(());
        }

        // One marker per interval crossed, each at its exact instruction.
        self.instrs_since_marker += count;
        while self.instrs_since_marker >= self.instrs_per_marker {
            self.instrs_since_marker -= self.instrs_per_marker;
            let instruction_count = self.stats.instrs - self.instrs_since_marker;
            self.emit(TraceRecord::Marker(MarkerRecord { instruction_count }))?;
            self.stats.markers += 1;
        }
        Ok(())
    }

    /// Close any open aggregated event; a no-op when idle
    pub fn flush_all(&mut self) -> Result<(), TraceError> {
        self.flush_window()
    }

    /// Flush everything and close the logger. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), TraceError> {
        if self.closed {
            return Ok(());
        }
        self.flush_window()?;
        if let Err(e) = self.logger.close() {
            self.failed = true;
            return Err(e.into());
        }
        self.closed = true;
        Ok(())
    }

    /// Close the context and return its final statistics
    pub fn finish(mut self) -> Result<PerThreadStats, TraceError> {
        self.close()?;
        Ok(self.stats)
    }

    // Private helpers

    /// Range of an access, or `None` for one that covers no addressable byte
    fn access_range(&self, kind: &str, start: u64, bytes: u64) -> Option<AddrRange> {
        let range = AddrRange::from_access(start, bytes);
        if range.is_none() {
            if bytes == 0 {
                trace!("{}: ignoring zero-length {kind} at 0x{start:x}", self.tid);
            } else {
                trace!(
                    "{}: ignoring {kind} of {bytes} bytes at 0x{start:x}: past the end of the address space",
                    self.tid
                );
            }
        }
        range
    }

    fn emit(&mut self, record: TraceRecord) -> Result<(), TraceError> {
        if record.consumes_eid() {
            self.next_eid = self.next_eid.next();
        }
        if let Err(e) = self.logger.append(record) {
            self.failed = true;
            return Err(e.into());
        }
        Ok(())
    }

    fn check_flush_limit(&mut self) -> Result<(), TraceError> {
        match self.variant {
            Variant::Compressed { prims_per_event, .. } if self.comp.prims() >= prims_per_event => {
                self.flush_window()
            }
            _ => Ok(()),
        }
    }

    fn flush_compute(&mut self) -> Result<(), TraceError> {
        if self.comp.is_active() {
            let record = self.comp.take();
            self.emit(TraceRecord::Compute(record))?;
            self.stats.comp_events += 1;
        }
        Ok(())
    }

    fn flush_window(&mut self) -> Result<(), TraceError> {
        self.flush_compute()?;

        let comm = match &mut self.variant {
            Variant::Compressed { comm, .. } if comm.is_active() => comm.take(),
            _ => return Ok(()),
        };
        self.emit(TraceRecord::Communication(comm))?;
        self.stats.comm_events += 1;
        Ok(())
    }
}

impl<L: EventLog> Drop for ThreadContext<L> {
    fn drop(&mut self) {
        if self.closed || self.failed {
            return;
        }
        if let Err(e) = self.close() {
            // The trace would silently lose its tail; refuse to continue.
            error!("fatal: final flush for {} failed: {e}", self.tid);
            std::process::abort();
        }
    }
}
