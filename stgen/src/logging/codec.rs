//! Trace file encoding
//!
//! A binary trace is one gzip stream holding a sequence of length-delimited
//! `EventStream` messages, one per flushed batch. Readers accept concatenated
//! gzip members, so a trace that was appended to in several sessions still
//! decodes as a whole.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use prost::Message;
use stgen_common::schema;

use crate::domain::DecodeError;

use super::TraceRecord;

/// Encode one batch as a length-delimited `EventStream`
#[must_use]
pub fn encode_events(events: Vec<schema::Event>) -> Vec<u8> {
    schema::EventStream { events }.encode_length_delimited_to_vec()
}

/// Encode `records` as a single uncompressed batch
#[must_use]
pub fn encode_records(records: &[TraceRecord]) -> Vec<u8> {
    encode_events(records.iter().map(schema::Event::from).collect())
}

/// Decode uncompressed batches, keeping batch boundaries
///
/// # Errors
/// Returns an error on a truncated message or an invalid record
pub fn decode_batches(mut bytes: &[u8]) -> Result<Vec<Vec<TraceRecord>>, DecodeError> {
    let mut batches = Vec::new();
    while !bytes.is_empty() {
        let stream = schema::EventStream::decode_length_delimited(&mut bytes)?;
        let batch = stream
            .events
            .into_iter()
            .map(TraceRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        batches.push(batch);
    }
    Ok(batches)
}

/// Decode uncompressed batches into one ordered record list
///
/// # Errors
/// Returns an error on a truncated message or an invalid record
pub fn decode_stream(bytes: &[u8]) -> Result<Vec<TraceRecord>, DecodeError> {
    Ok(decode_batches(bytes)?.into_iter().flatten().collect())
}

/// Decompress and decode a whole binary trace
///
/// # Errors
/// Returns an error if the input is not gzip or does not decode
pub fn read_trace<R: Read>(reader: R) -> Result<Vec<TraceRecord>, DecodeError> {
    let mut bytes = Vec::new();
    MultiGzDecoder::new(reader).read_to_end(&mut bytes)?;
    decode_stream(&bytes)
}

/// Read the binary trace at `path`
///
/// # Errors
/// Returns an error if the file cannot be read or does not decode
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceRecord>, DecodeError> {
    let file = File::open(path)?;
    read_trace(BufReader::new(file))
}
