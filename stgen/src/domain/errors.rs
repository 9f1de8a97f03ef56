//! Structured error types for stgen
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Every error here except [`InputError`] is fatal for the trace: callers are
//! expected to abort rather than continue with a partial or reordered trace.

use super::types::Tid;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("prims_per_event must be at least 1")]
    ZeroPrimsPerEvent,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Failed to open trace file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write trace for {tid}: {source}")]
    Write {
        tid: Tid,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to close trace for {tid}: {source}")]
    Close {
        tid: Tid,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start background flush for {tid}: {source}")]
    Spawn {
        tid: Tid,
        #[source]
        source: std::io::Error,
    },

    #[error("Background flush for {0} panicked")]
    FlushPanicked(Tid),

    #[error("Logger for {0} used after close")]
    Closed(Tid),
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Unrecognized synchronization type {code} on {tid}")]
    UnknownSyncType { tid: Tid, code: u8 },

    #[error("Event received before any thread became active")]
    NoActiveThread,

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write {what}: {source}")]
    Report {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to decode trace message: {0}")]
    Message(#[from] prost::DecodeError),

    #[error("Trace record without payload")]
    EmptyEvent,

    #[error("Communication edge without address range")]
    MissingRange,

    #[error("Invalid address range [0x{start:x}, 0x{end:x})")]
    InvalidRange { start: u64, end: u64 },

    #[error("Unknown synchronization code {0} in trace")]
    UnknownSyncType(i32),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("line {line}: unknown event `{word}`")]
    UnknownEvent { line: usize, word: String },

    #[error("line {line}: missing {field}")]
    MissingField { line: usize, field: &'static str },

    #[error("line {line}: invalid number `{value}`")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: unknown synchronization type `{name}`")]
    UnknownSyncName { line: usize, name: String },

    #[error("line {line}: unexpected trailing input `{rest}`")]
    TrailingInput { line: usize, rest: String },
}
