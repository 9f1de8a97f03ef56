//! Command-line interface for stgen
//!
//! This module contains CLI argument parsing and its mapping onto
//! [`TraceConfig`](crate::config::TraceConfig)

pub mod args;

pub use args::{Args, Command, RecordArgs};
