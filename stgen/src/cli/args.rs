//! CLI argument definitions

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{AggregationMode, LoggerKind, TraceConfig};

#[derive(Parser)]
#[command(
    name = "stgen",
    version,
    about = "Generate per-thread event traces with inter-thread communication edges",
    after_help = "\
EXAMPLES:
    stgen record events.txt -o traces/            Binary traces, compressed aggregation
    stgen record events.txt --mode uncompressed   One Communication event per producer read
    stgen dump traces/sigil.events.out-1.bin.gz   Render a binary trace as text"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a raw event script and write per-thread traces
    Record(RecordArgs),

    /// Print a binary trace in the text format
    Dump {
        /// Binary trace file (sigil.events.out-<tid>.bin.gz)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(ClapArgs)]
pub struct RecordArgs {
    /// Raw event script to replay
    #[arg(value_name = "EVENTS")]
    pub input: PathBuf,

    /// Directory for traces and reports
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Aggregation variant
    #[arg(long, value_enum, default_value_t = AggregationMode::Compressed)]
    pub mode: AggregationMode,

    /// Primitive events per Compute event (compressed mode)
    #[arg(long, default_value = "100")]
    pub prims_per_event: u64,

    /// Trace output format
    #[arg(long, value_enum, default_value_t = LoggerKind::Binary)]
    pub logger: LoggerKind,

    /// Records per serialized batch
    #[arg(long, default_value = "100000")]
    pub batch_size: usize,

    /// Instructions between Marker events (0 = no markers)
    #[arg(long, default_value = "100000")]
    pub instrs_per_marker: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl RecordArgs {
    #[must_use]
    pub fn trace_config(&self) -> TraceConfig {
        TraceConfig {
            mode: self.mode,
            prims_per_event: self.prims_per_event,
            output_dir: self.output_dir.clone(),
            logger: self.logger,
            batch_size: self.batch_size,
            instrs_per_marker: self.instrs_per_marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults_match_config_defaults() {
        let args = Args::parse_from(["stgen", "record", "events.txt"]);
        let Command::Record(record) = args.command else {
            panic!("expected record subcommand");
        };

        let config = record.trace_config();
        let defaults = TraceConfig::default();
        assert_eq!(config.mode, defaults.mode);
        assert_eq!(config.prims_per_event, defaults.prims_per_event);
        assert_eq!(config.logger, defaults.logger);
        assert_eq!(config.batch_size, defaults.batch_size);
        assert_eq!(config.instrs_per_marker, defaults.instrs_per_marker);
        assert_eq!(config.output_dir, defaults.output_dir);
    }

    #[test]
    fn test_record_flags_parsed() {
        let args = Args::parse_from([
            "stgen",
            "record",
            "events.txt",
            "--mode",
            "uncompressed",
            "--logger",
            "text",
            "-o",
            "out",
            "--batch-size",
            "8",
        ]);
        let Command::Record(record) = args.command else {
            panic!("expected record subcommand");
        };
        assert_eq!(record.mode, AggregationMode::Uncompressed);
        assert_eq!(record.logger, LoggerKind::Text);
        assert_eq!(record.batch_size, 8);
        assert_eq!(record.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
