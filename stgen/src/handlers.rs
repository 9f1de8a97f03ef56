//! # Event Dispatch
//!
//! [`EventHandlers`] sits between the instrumentation front end and the
//! per-thread aggregation state. It tracks which thread is currently active,
//! creates a [`ThreadContext`] the first time a thread id shows up and routes
//! every compute, memory, synchronization and instruction event to it.
//!
//! Consecutive events usually come from the same thread, so the active
//! context is cached by slot index and a context switch to the already
//! active thread does no lookup at all.
//!
//! Alongside dispatch it keeps the thread metadata a replaying simulator
//! needs: the order in which threads appeared, spawn points and barrier
//! participants. [`EventHandlers::shutdown`] drains every context and writes
//! `sigil.pthread.out` and `sigil.stats.json` next to the traces.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;
use stgen_common::SyncType;

use crate::aggregation::{PerThreadStats, ThreadContext};
use crate::config::TraceConfig;
use crate::domain::{ConfigError, Tid, TraceError};
use crate::input::{CompKind, MemKind, RawEvent};
use crate::logging::EventLogger;
use crate::shadow::ShadowMemory;

pub const PTHREAD_FILE: &str = "sigil.pthread.out";
pub const STATS_FILE: &str = "sigil.stats.json";

/// Thread lifecycle facts gathered while tracing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThreadMetadata {
    /// Thread ids in first-seen order
    pub threads: Vec<Tid>,
    /// `(spawning thread, spawned thread handle address)` per SPAWN
    pub spawns: Vec<(Tid, u64)>,
    /// Participating threads per barrier address
    pub barriers: BTreeMap<u64, BTreeSet<Tid>>,
}

impl ThreadMetadata {
    fn record_sync(&mut self, tid: Tid, sync_type: SyncType, addr: u64) {
        match sync_type {
            SyncType::Spawn => self.spawns.push((tid, addr)),
            SyncType::Barrier => {
                self.barriers.entry(addr).or_default().insert(tid);
            }
            _ => {}
        }
    }

    /// Write the metadata in the line format the trace replayer reads
    ///
    /// # Errors
    /// Returns any error from the underlying writer
    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for (parent, addr) in &self.spawns {
            writeln!(out, "##{},{addr:x}", parent.0)?;
        }
        for tid in &self.threads {
            writeln!(out, "@@{}", tid.0)?;
        }
        for (addr, tids) in &self.barriers {
            write!(out, "**{addr:x}")?;
            for tid in tids {
                write!(out, ",{}", tid.0)?;
            }
            writeln!(out)?;
        }
        out.flush()
    }
}

/// Final statistics of a trace run
#[derive(Debug, Serialize)]
pub struct TraceSummary {
    pub config: TraceConfig,
    pub threads: BTreeMap<u32, PerThreadStats>,
    pub totals: PerThreadStats,
}

pub struct EventHandlers {
    config: TraceConfig,
    shadow: Arc<ShadowMemory>,
    /// Contexts in creation order; `index` maps thread ids to slots
    contexts: Vec<ThreadContext<EventLogger>>,
    index: HashMap<Tid, usize>,
    /// Slot of the active thread's context
    current: Option<usize>,
    metadata: ThreadMetadata,
}

impl EventHandlers {
    /// Validate `config` and prepare its output directory
    ///
    /// # Errors
    /// Returns an error for an invalid config or an unusable output directory
    pub fn new(config: TraceConfig) -> Result<Self, TraceError> {
        config.validate()?;
        fs::create_dir_all(&config.output_dir).map_err(|source| ConfigError::OutputDir {
            path: config.output_dir.clone(),
            source,
        })?;
        info!(
            "Tracing to {} ({:?} aggregation, {:?} logger)",
            config.output_dir.display(),
            config.mode,
            config.logger
        );

        Ok(Self {
            config,
            shadow: Arc::new(ShadowMemory::new()),
            contexts: Vec::new(),
            index: HashMap::new(),
            current: None,
            metadata: ThreadMetadata::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    #[must_use]
    pub fn current_tid(&self) -> Option<Tid> {
        self.current.map(|slot| self.contexts[slot].tid())
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.contexts.len()
    }

    /// Running statistics of `tid`, if it has been seen
    #[must_use]
    pub fn stats(&self, tid: Tid) -> Option<PerThreadStats> {
        self.index.get(&tid).map(|&slot| self.contexts[slot].stats())
    }

    #[must_use]
    pub fn metadata(&self) -> &ThreadMetadata {
        &self.metadata
    }

    /// Make `tid` the active thread, creating its context on first sight
    ///
    /// # Errors
    /// Returns an error if the new thread's trace file cannot be opened
    pub fn on_context_switch(&mut self, tid: Tid) -> Result<(), TraceError> {
        if self.current_tid() == Some(tid) {
            return Ok(());
        }

        let slot = match self.index.get(&tid) {
            Some(&slot) => slot,
            None => self.create_context(tid)?,
        };
        debug!("Switched to {tid}");
        self.current = Some(slot);
        Ok(())
    }

    /// # Errors
    /// Returns an error if no thread is active or the trace cannot be written
    pub fn on_comp(&mut self, kind: CompKind) -> Result<(), TraceError> {
        let ctx = self.active()?;
        match kind {
            CompKind::Iop => ctx.on_iop(),
            CompKind::Flop => ctx.on_flop(),
        }
    }

    /// # Errors
    /// Returns an error if no thread is active or the trace cannot be written
    pub fn on_mem(&mut self, kind: MemKind, addr: u64, bytes: u64) -> Result<(), TraceError> {
        let ctx = self.active()?;
        match kind {
            MemKind::Read => ctx.on_read(addr, bytes),
            MemKind::Write => ctx.on_write(addr, bytes),
        }
    }

    /// Route a synchronization call given its raw front-end code
    ///
    /// # Errors
    /// Returns an error for an unknown code, when no thread is active, or if
    /// the trace cannot be written
    pub fn on_sync(&mut self, code: u8, addr: u64) -> Result<(), TraceError> {
        let slot = self.current.ok_or(TraceError::NoActiveThread)?;
        let tid = self.contexts[slot].tid();
        let sync_type =
            SyncType::try_from(code).map_err(|_| TraceError::UnknownSyncType { tid, code })?;

        self.metadata.record_sync(tid, sync_type, addr);
        self.contexts[slot].on_sync(sync_type, addr)
    }

    /// # Errors
    /// Returns an error if no thread is active or the trace cannot be written
    pub fn on_instr(&mut self, count: u64) -> Result<(), TraceError> {
        self.active()?.on_instr(count)
    }

    /// Route one raw event
    ///
    /// # Errors
    /// Returns the error of the handler the event is routed to
    pub fn dispatch(&mut self, event: RawEvent) -> Result<(), TraceError> {
        match event {
            RawEvent::ContextSwitch(tid) => self.on_context_switch(tid),
            RawEvent::Comp(kind) => self.on_comp(kind),
            RawEvent::Mem { kind, addr, bytes } => self.on_mem(kind, addr, bytes),
            RawEvent::Sync { code, addr } => self.on_sync(code, addr),
            RawEvent::Instr(count) => self.on_instr(count),
        }
    }

    /// Flush every open aggregated event without closing any trace
    ///
    /// # Errors
    /// Returns the first flush failure
    pub fn flush_all(&mut self) -> Result<(), TraceError> {
        for ctx in &mut self.contexts {
            ctx.flush_all()?;
        }
        Ok(())
    }

    /// Drain and close every thread's trace, then write the thread metadata
    /// and statistics report
    ///
    /// # Errors
    /// Returns the first failure while closing a trace or writing a report
    pub fn shutdown(mut self) -> Result<TraceSummary, TraceError> {
        self.current = None;

        let mut threads = BTreeMap::new();
        let mut totals = PerThreadStats::default();
        for ctx in std::mem::take(&mut self.contexts) {
            let tid = ctx.tid();
            let stats = ctx.finish()?;
            totals += stats;
            threads.insert(tid.0, stats);
        }

        let dir = self.config.output_dir.clone();
        write_report(&dir.join(PTHREAD_FILE), "thread metadata", |out| {
            self.metadata.write_to(out)
        })?;

        let summary = TraceSummary { config: self.config, threads, totals };
        write_report(&dir.join(STATS_FILE), "statistics report", |mut out| {
            serde_json::to_writer_pretty(&mut out, &summary)?;
            writeln!(out)?;
            out.flush()
        })?;

        info!(
            "Traced {} threads, {} events",
            summary.threads.len(),
            summary.totals.events()
        );
        Ok(summary)
    }

    // Private helpers

    fn active(&mut self) -> Result<&mut ThreadContext<EventLogger>, TraceError> {
        let slot = self.current.ok_or(TraceError::NoActiveThread)?;
        Ok(&mut self.contexts[slot])
    }

    fn create_context(&mut self, tid: Tid) -> Result<usize, TraceError> {
        let logger = EventLogger::create(
            self.config.logger,
            &self.config.output_dir,
            tid,
            self.config.batch_size,
        )?;
        let ctx = ThreadContext::new(tid, &self.config, Arc::clone(&self.shadow), logger);

        let slot = self.contexts.len();
        self.contexts.push(ctx);
        self.index.insert(tid, slot);
        self.metadata.threads.push(tid);
        info!("New thread {tid}");
        Ok(slot)
    }
}

fn write_report<F>(path: &Path, what: &'static str, write: F) -> Result<(), TraceError>
where
    F: FnOnce(BufWriter<File>) -> std::io::Result<()>,
{
    File::create(path)
        .and_then(|file| write(BufWriter::new(file)))
        .map_err(|source| TraceError::Report { what, source })?;
    debug!("Wrote {what} to {}", path.display());
    Ok(())
}

/// Output directory entries written by [`EventHandlers::shutdown`]
#[must_use]
pub fn report_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join(PTHREAD_FILE), dir.join(STATS_FILE))
}
