//! Trace output
//!
//! Turns the ordered stream of finished records of one thread into a
//! persisted trace:
//! - [`BinaryLogger`]: batches records and encodes, compresses and writes
//!   each batch on a background thread while the next batch accumulates
//! - [`TextLogger`]: synchronous line-oriented rendering for debugging
//! - [`codec`]: batch encoding and trace file decoding

pub mod binary;
pub mod codec;
pub mod record;
pub mod text;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::LoggerKind;
use crate::domain::{LoggerError, Tid};

// Re-export common types
pub use binary::BinaryLogger;
pub use codec::{decode_stream, encode_records, read_trace, read_trace_file};
pub use record::{CommEdge, CommRecord, ComputeRecord, MarkerRecord, SyncRecord, TraceRecord};
pub use text::{format_record, TextLogger};

/// Sink for the finished records of one thread
pub trait EventLog {
    /// Add one finished record, in emission order
    fn append(&mut self, record: TraceRecord) -> Result<(), LoggerError>;

    /// Block until every appended record has been persisted
    fn flush_now(&mut self) -> Result<(), LoggerError>;

    /// Drain and release the output. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), LoggerError>;
}

/// In-memory log, used where records are consumed by the caller
impl EventLog for Vec<TraceRecord> {
    fn append(&mut self, record: TraceRecord) -> Result<(), LoggerError> {
        self.push(record);
        Ok(())
    }

    fn flush_now(&mut self) -> Result<(), LoggerError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), LoggerError> {
        Ok(())
    }
}

/// Per-thread file logger selected by [`LoggerKind`]
pub enum EventLogger {
    Binary(BinaryLogger<BufWriter<File>>),
    Text(TextLogger<BufWriter<File>>),
}

impl EventLogger {
    /// Open the trace file of `tid` under `dir`
    ///
    /// # Errors
    /// Returns an error if the file cannot be created
    pub fn create(
        kind: LoggerKind,
        dir: &Path,
        tid: Tid,
        batch_size: usize,
    ) -> Result<Self, LoggerError> {
        let path = trace_path(kind, dir, tid);
        let file =
            File::create(&path).map_err(|source| LoggerError::Open { path: path.clone(), source })?;
        info!("{tid}: writing {} trace to {}", kind_name(kind), path.display());

        let writer = BufWriter::new(file);
        Ok(match kind {
            LoggerKind::Binary => EventLogger::Binary(BinaryLogger::new(tid, writer, batch_size)),
            LoggerKind::Text => EventLogger::Text(TextLogger::new(tid, writer)),
        })
    }
}

impl EventLog for EventLogger {
    fn append(&mut self, record: TraceRecord) -> Result<(), LoggerError> {
        match self {
            EventLogger::Binary(logger) => logger.append(record),
            EventLogger::Text(logger) => logger.append(record),
        }
    }

    fn flush_now(&mut self) -> Result<(), LoggerError> {
        match self {
            EventLogger::Binary(logger) => logger.flush_now(),
            EventLogger::Text(logger) => logger.flush_now(),
        }
    }

    fn close(&mut self) -> Result<(), LoggerError> {
        match self {
            EventLogger::Binary(logger) => logger.close(),
            EventLogger::Text(logger) => logger.close(),
        }
    }
}

fn kind_name(kind: LoggerKind) -> &'static str {
    match kind {
        LoggerKind::Binary => "binary",
        LoggerKind::Text => "text",
    }
}

/// Trace file of `tid` for the given output format
#[must_use]
pub fn trace_path(kind: LoggerKind, dir: &Path, tid: Tid) -> PathBuf {
    match kind {
        LoggerKind::Binary => dir.join(format!("sigil.events.out-{}.bin.gz", tid.0)),
        LoggerKind::Text => dir.join(format!("sigil.events.out-{}.txt", tid.0)),
    }
}

/// Thread id encoded in a trace file name, if it follows [`trace_path`]
#[must_use]
pub fn tid_from_trace_path(path: &Path) -> Option<Tid> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix("sigil.events.out-")?;
    let digits = rest.strip_suffix(".bin.gz").or_else(|| rest.strip_suffix(".txt"))?;
    digits.parse().ok().map(Tid)
}
