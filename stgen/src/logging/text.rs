//! Plain-text trace rendering
//!
//! One line per record, numbered with the thread's event ids:
//!
//! ```text
//! 0,1,3,0,2,1 $ 0x100 0x108 * 0x0 0x10     compute: iops,flops,reads,writes
//! 1,1 # 2 0 0x0 0x8                         communication: producer tid/eid, range
//! 2,1,sync:BARRIER^0x80                     synchronization
//! ! 100000                                  marker (no event id)
//! ```
//!
//! Writes happen synchronously on append; there is no background task.

use std::fmt::Write as _;
use std::io::Write;

use log::{error, info};

use crate::domain::{AddrRange, Eid, LoggerError, Tid};

use super::{EventLog, TraceRecord};

pub struct TextLogger<W: Write> {
    tid: Tid,
    writer: W,
    next_eid: Eid,
    lines: u64,
    closed: bool,
    failed: bool,
}

impl<W: Write> TextLogger<W> {
    #[must_use]
    pub fn new(tid: Tid, writer: W) -> Self {
        Self { tid, writer, next_eid: Eid(0), lines: 0, closed: false, failed: false }
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn write_line(&mut self, line: &str) -> Result<(), LoggerError> {
        let tid = self.tid;
        let result = writeln!(self.writer, "{line}").map_err(|source| LoggerError::Write { tid, source });
        if result.is_err() {
            self.failed = true;
        }
        result
    }
}

/// Render one record; `eid` is `None` for records outside the id sequence
#[must_use]
pub fn format_record(tid: Tid, eid: Option<Eid>, record: &TraceRecord) -> String {
    let mut line = String::new();
    let prefix = |line: &mut String| {
        if let Some(eid) = eid {
            let _ = write!(line, "{},{}", eid.0, tid.0);
        }
    };

    match record {
        TraceRecord::Compute(comp) => {
            prefix(&mut line);
            let _ = write!(line, ",{},{},{},{}", comp.iops, comp.flops, comp.reads, comp.writes);
            push_ranges(&mut line, " $", &comp.write_ranges);
            push_ranges(&mut line, " *", &comp.read_ranges);
        }
        TraceRecord::Communication(comm) => {
            prefix(&mut line);
            for edge in &comm.edges {
                let _ = write!(
                    line,
                    " # {} {} 0x{:x} 0x{:x}",
                    edge.producer.0, edge.producer_eid.0, edge.range.start, edge.range.end
                );
            }
        }
        TraceRecord::Sync(sync) => {
            prefix(&mut line);
            let _ = write!(line, ",sync:{}^0x{:x}", sync.sync_type.name(), sync.addr);
        }
        TraceRecord::Marker(marker) => {
            let _ = write!(line, "! {}", marker.instruction_count);
        }
    }
    line
}

fn push_ranges(line: &mut String, tag: &str, ranges: &[AddrRange]) {
    if ranges.is_empty() {
        return;
    }
    line.push_str(tag);
    for range in ranges {
        let _ = write!(line, " 0x{:x} 0x{:x}", range.start, range.end);
    }
}

impl<W: Write> EventLog for TextLogger<W> {
    fn append(&mut self, record: TraceRecord) -> Result<(), LoggerError> {
        if self.closed {
            return Err(LoggerError::Closed(self.tid));
        }
        let eid = record.consumes_eid().then_some(self.next_eid);
        let line = format_record(self.tid, eid, &record);
        self.write_line(&line)?;

        if eid.is_some() {
            self.next_eid = self.next_eid.next();
        }
        self.lines += 1;
        Ok(())
    }

    fn flush_now(&mut self) -> Result<(), LoggerError> {
        let tid = self.tid;
        let result = self.writer.flush().map_err(|source| LoggerError::Write { tid, source });
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn close(&mut self) -> Result<(), LoggerError> {
        if self.closed {
            return Ok(());
        }
        let tid = self.tid;
        if let Err(source) = self.writer.flush() {
            self.failed = true;
            return Err(LoggerError::Close { tid, source });
        }
        self.closed = true;
        info!("{tid}: closed text trace ({} lines)", self.lines);
        Ok(())
    }
}

impl<W: Write> Drop for TextLogger<W> {
    fn drop(&mut self) {
        if self.closed || self.failed {
            return;
        }
        if let Err(e) = self.close() {
            error!("fatal: closing text trace for {} failed: {e}", self.tid);
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{CommEdge, CommRecord, ComputeRecord, MarkerRecord, SyncRecord};
    use stgen_common::SyncType;

    fn range(start: u64, end: u64) -> AddrRange {
        AddrRange::new(start, end).unwrap()
    }

    #[test]
    fn test_compute_line_lists_writes_then_reads() {
        let record = TraceRecord::Compute(ComputeRecord {
            iops: 3,
            flops: 0,
            reads: 2,
            writes: 1,
            write_ranges: vec![range(0x100, 0x108)],
            read_ranges: vec![range(0x0, 0x10)],
        });
        assert_eq!(
            format_record(Tid(1), Some(Eid(0)), &record),
            "0,1,3,0,2,1 $ 0x100 0x108 * 0x0 0x10"
        );
    }

    #[test]
    fn test_compute_without_memory_has_no_range_sections() {
        let record = TraceRecord::Compute(ComputeRecord { flops: 2, ..ComputeRecord::default() });
        assert_eq!(format_record(Tid(4), Some(Eid(9)), &record), "9,4,0,2,0,0");
    }

    #[test]
    fn test_logger_numbers_lines_and_skips_markers() {
        let mut logger = TextLogger::new(Tid(2), Vec::new());
        logger
            .append(TraceRecord::Communication(CommRecord {
                edges: vec![CommEdge { producer: Tid(1), producer_eid: Eid(0), range: range(4, 8) }],
            }))
            .unwrap();
        logger.append(TraceRecord::Marker(MarkerRecord { instruction_count: 500 })).unwrap();
        logger
            .append(TraceRecord::Sync(SyncRecord { sync_type: SyncType::Barrier, addr: 0x80 }))
            .unwrap();
        logger.close().unwrap();

        let text = String::from_utf8(logger.get_ref().clone()).unwrap();
        assert_eq!(text, "0,2 # 1 0 0x4 0x8\n! 500\n1,2,sync:BARRIER^0x80\n");
    }

    #[test]
    fn test_append_after_close_rejected() {
        let mut logger = TextLogger::new(Tid(2), Vec::new());
        logger.close().unwrap();
        let marker = TraceRecord::Marker(MarkerRecord { instruction_count: 1 });
        assert!(matches!(logger.append(marker), Err(LoggerError::Closed(Tid(2)))));
    }
}
