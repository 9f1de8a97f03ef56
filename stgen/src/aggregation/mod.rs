//! Per-thread event aggregation
//!
//! Folds the high-frequency stream of primitive events (integer/float ops,
//! reads, writes) of one traced thread into coarse Compute and Communication
//! records, and emits Synchronization and Marker records in order:
//! - Range sets that keep the unique addresses of a window minimal
//! - Compute and communication windows
//! - The per-thread state machine (compressed and uncompressed variants)
//! - Per-thread statistics

pub mod range_set;
pub mod stats;
pub mod thread_context;
pub mod window;

// Re-export common types
pub use range_set::RangeSet;
pub use stats::PerThreadStats;
pub use thread_context::ThreadContext;
pub use window::{CommWindow, ComputeWindow};
