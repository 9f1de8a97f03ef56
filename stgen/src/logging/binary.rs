//! # Double-Buffered Binary Logger
//!
//! Records are converted to schema messages as they arrive and collected in
//! the active batch. When the batch reaches `batch_size` it is moved (not
//! copied) into a background thread which encodes, compresses and writes it,
//! while a fresh empty batch takes its place in the foreground.
//!
//! ## Flush Protocol
//!
//! ```text
//! foreground: ── append … append ─┬─ append … append ─┬─ …
//!                                 │ wait(prev), move  │ wait(prev), move
//! background:                     └─ encode+gz+write ─┘└─ encode+gz+write
//! ```
//!
//! - At most one flush is in flight: a new flush first joins the previous one
//! - The compressor travels with the flush thread and comes back on join, so
//!   batches reach the file in creation order
//! - `flush_now` drains synchronously; `close` drains and finishes the gzip
//!   stream
//!
//! Any I/O failure is fatal for the trace and is reported to the caller.

use std::io::Write;
use std::thread::{self, JoinHandle};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, error, info};
use stgen_common::schema;

use crate::domain::{LoggerError, Tid};

use super::codec::encode_events;
use super::{EventLog, TraceRecord};

/// Upper bound on the capacity reserved up front for a new batch
const INITIAL_BATCH_CAPACITY: usize = 4096;

type FlushHandle<W> = JoinHandle<Result<GzEncoder<W>, LoggerError>>;

pub struct BinaryLogger<W: Write + Send + 'static> {
    tid: Tid,
    batch: Vec<schema::Event>,
    batch_size: usize,
    /// Present while no flush is in flight
    sink: Option<GzEncoder<W>>,
    in_flight: Option<FlushHandle<W>>,
    flushes: u64,
    records: u64,
    closed: bool,
    /// An error has already been returned to the caller
    failed: bool,
}

impl<W: Write + Send + 'static> BinaryLogger<W> {
    #[must_use]
    pub fn new(tid: Tid, writer: W, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            tid,
            batch: Vec::with_capacity(batch_size.min(INITIAL_BATCH_CAPACITY)),
            batch_size,
            sink: Some(GzEncoder::new(writer, Compression::default())),
            in_flight: None,
            flushes: 0,
            records: 0,
            closed: false,
            failed: false,
        }
    }

    /// Records waiting in the active batch
    #[must_use]
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Background flushes started so far
    #[must_use]
    pub fn flushes_started(&self) -> u64 {
        self.flushes
    }

    /// Close the logger and hand back the underlying writer
    ///
    /// # Errors
    /// Returns an error if draining or finishing the gzip stream fails
    pub fn finish(mut self) -> Result<W, LoggerError> {
        let result = self.finish_sink();
        let writer = self.track(result)?;
        writer.ok_or(LoggerError::Closed(self.tid))
    }

    fn track<T>(&mut self, result: Result<T, LoggerError>) -> Result<T, LoggerError> {
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn wait_in_flight(&mut self) -> Result<(), LoggerError> {
        if let Some(handle) = self.in_flight.take() {
            let sink = handle.join().map_err(|_| LoggerError::FlushPanicked(self.tid))??;
            self.sink = Some(sink);
        }
        Ok(())
    }

    fn flush_async(&mut self) -> Result<(), LoggerError> {
        self.wait_in_flight()?;

        let tid = self.tid;
        let mut sink = self.sink.take().ok_or(LoggerError::Closed(tid))?;
        let batch = std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.batch_size.min(INITIAL_BATCH_CAPACITY)),
        );

        let handle = thread::Builder::new()
            .name(format!("stgen-flush-{}", tid.0))
            .spawn(move || {
                write_batch(&mut sink, batch, tid)?;
                Ok(sink)
            })
            .map_err(|source| LoggerError::Spawn { tid, source })?;

        self.in_flight = Some(handle);
        self.flushes += 1;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), LoggerError> {
        if !self.batch.is_empty() {
            self.flush_async()?;
        }
        self.wait_in_flight()
    }

    fn finish_sink(&mut self) -> Result<Option<W>, LoggerError> {
        if self.closed {
            return Ok(None);
        }
        self.drain()?;

        let tid = self.tid;
        let sink = self.sink.take().ok_or(LoggerError::Closed(tid))?;
        let mut writer = sink.finish().map_err(|source| LoggerError::Close { tid, source })?;
        writer.flush().map_err(|source| LoggerError::Close { tid, source })?;

        self.closed = true;
        info!("{tid}: closed trace ({} records, {} batches)", self.records, self.flushes);
        Ok(Some(writer))
    }
}

fn write_batch<W: Write>(
    sink: &mut GzEncoder<W>,
    events: Vec<schema::Event>,
    tid: Tid,
) -> Result<(), LoggerError> {
    let count = events.len();
    let bytes = encode_events(events);
    sink.write_all(&bytes).map_err(|source| LoggerError::Write { tid, source })?;
    debug!("{tid}: flushed {count} records ({} bytes before compression)", bytes.len());
    Ok(())
}

impl<W: Write + Send + 'static> EventLog for BinaryLogger<W> {
    fn append(&mut self, record: TraceRecord) -> Result<(), LoggerError> {
        if self.closed {
            return Err(LoggerError::Closed(self.tid));
        }
        self.batch.push(schema::Event::from(&record));
        self.records += 1;

        if self.batch.len() >= self.batch_size {
            let result = self.flush_async();
            return self.track(result);
        }
        Ok(())
    }

    fn flush_now(&mut self) -> Result<(), LoggerError> {
        if self.closed {
            return Ok(());
        }
        let tid = self.tid;
        let result = self.drain().and_then(|()| match self.sink.as_mut() {
            Some(sink) => sink.flush().map_err(|source| LoggerError::Write { tid, source }),
            None => Err(LoggerError::Closed(tid)),
        });
        self.track(result)
    }

    fn close(&mut self) -> Result<(), LoggerError> {
        let result = self.finish_sink().map(drop);
        self.track(result)
    }
}

impl<W: Write + Send + 'static> Drop for BinaryLogger<W> {
    fn drop(&mut self) {
        if self.closed || self.failed {
            return;
        }
        if let Err(e) = self.close() {
            // A truncated trace is worse than none.
            error!("fatal: closing trace for {} failed: {e}", self.tid);
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codec::{decode_batches, read_trace};
    use crate::logging::{MarkerRecord, SyncRecord};
    use stgen_common::SyncType;

    fn marker(count: u64) -> TraceRecord {
        TraceRecord::Marker(MarkerRecord { instruction_count: count })
    }

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        use std::io::Read;
        let mut out = Vec::new();
        flate2::read::MultiGzDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_full_batch_triggers_one_flush() {
        let mut logger = BinaryLogger::new(Tid(1), Vec::new(), 4);

        for i in 0..4 {
            logger.append(marker(i)).unwrap();
        }
        assert_eq!(logger.flushes_started(), 1);
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_partial_batch_waits_for_flush_now() {
        let mut logger = BinaryLogger::new(Tid(1), Vec::new(), 4);

        for i in 0..3 {
            logger.append(marker(i)).unwrap();
        }
        assert_eq!(logger.flushes_started(), 0);
        assert_eq!(logger.pending(), 3);

        logger.flush_now().unwrap();
        assert_eq!(logger.flushes_started(), 1);
        assert_eq!(logger.pending(), 0);
    }

    #[test]
    fn test_batches_written_in_order() {
        let mut logger = BinaryLogger::new(Tid(1), Vec::new(), 3);
        for i in 0..10 {
            logger.append(marker(i)).unwrap();
        }
        let bytes = logger.finish().unwrap();

        let batches = decode_batches(&gunzip(&bytes)).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);

        let records = read_trace(bytes.as_slice()).unwrap();
        let expected: Vec<TraceRecord> = (0..10).map(marker).collect();
        assert_eq!(records, expected);
    }

    #[test]
    fn test_close_is_idempotent_and_rejects_appends() {
        let mut logger = BinaryLogger::new(Tid(7), Vec::new(), 8);
        logger
            .append(TraceRecord::Sync(SyncRecord { sync_type: SyncType::Barrier, addr: 0x80 }))
            .unwrap();

        logger.close().unwrap();
        logger.close().unwrap();
        assert_eq!(logger.flushes_started(), 1);
        assert!(matches!(logger.append(marker(1)), Err(LoggerError::Closed(Tid(7)))));
    }

    #[test]
    fn test_empty_logger_produces_valid_empty_trace() {
        let logger = BinaryLogger::new(Tid(1), Vec::new(), 8);
        let bytes = logger.finish().unwrap();
        assert!(read_trace(bytes.as_slice()).unwrap().is_empty());
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut logger = BinaryLogger::new(Tid(3), FailingWriter, 1);

        // The failing flush runs in the background; it surfaces on the next
        // wait at the latest.
        let first = logger.append(marker(0));
        let result = first.and_then(|()| logger.flush_now());
        assert!(result.is_err());
    }
}
