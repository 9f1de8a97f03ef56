//! Trace generation configuration

use serde::Serialize;
use std::path::PathBuf;

use crate::domain::ConfigError;

/// When communication forces a Compute event to close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Computation and communication share a window; windows close on
    /// synchronization or after `prims_per_event` primitives
    Compressed,
    /// Every newly discovered communication closes the current window
    Uncompressed,
}

/// Output format of per-thread traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoggerKind {
    /// Gzip-compressed, length-delimited protobuf batches
    Binary,
    /// Line-oriented text for debugging
    Text,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceConfig {
    pub mode: AggregationMode,
    /// Primitive events per Compute event (compressed mode)
    pub prims_per_event: u64,
    pub output_dir: PathBuf,
    pub logger: LoggerKind,
    /// Records per serialized batch
    pub batch_size: usize,
    /// Instructions between Marker events; 0 disables markers
    pub instrs_per_marker: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            mode: AggregationMode::Compressed,
            prims_per_event: 100,
            output_dir: PathBuf::from("."),
            logger: LoggerKind::Binary,
            batch_size: 100_000,
            instrs_per_marker: 100_000,
        }
    }
}

impl TraceConfig {
    /// Reject thresholds that would make aggregation or batching degenerate
    ///
    /// # Errors
    /// Returns an error if `prims_per_event` or `batch_size` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prims_per_event == 0 {
            return Err(ConfigError::ZeroPrimsPerEvent);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }
}
