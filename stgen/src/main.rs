//! # stgen - Main Entry Point
//!
//! Two subcommands:
//! - **record** (`stgen record <EVENTS>`): replay a raw event script through
//!   the event handlers and write per-thread traces plus reports
//! - **dump** (`stgen dump <FILE>`): decode a binary trace and print it in
//!   the text format

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use stgen::cli::{Args, Command, RecordArgs};
use stgen::domain::{ConfigError, Eid, InputError, Tid};
use stgen::handlers::{report_paths, EventHandlers};
use stgen::input::parse_line;
use stgen::logging::{format_record, read_trace_file, tid_from_trace_path};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let usage = err
        .chain()
        .any(|cause| cause.is::<InputError>() || cause.is::<ConfigError>());
    if usage {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Record(record) => run_record(&record),
        Command::Dump { file } => run_dump(&file),
    }
}

fn run_record(args: &RecordArgs) -> Result<()> {
    let script = File::open(&args.input)
        .with_context(|| format!("Failed to open event script {}", args.input.display()))?;
    let mut handlers = EventHandlers::new(args.trace_config())?;

    let mut events = 0u64;
    for (idx, line) in BufReader::new(script).lines().enumerate() {
        let line_no = idx + 1;
        let line = line
            .with_context(|| format!("Failed to read {} line {line_no}", args.input.display()))?;
        let Some(event) = parse_line(line_no, &line)? else {
            continue;
        };
        handlers
            .dispatch(event)
            .with_context(|| format!("{} line {line_no}", args.input.display()))?;
        events += 1;
    }
    info!("Replayed {events} raw events from {}", args.input.display());

    let summary = handlers.shutdown()?;

    if !args.quiet {
        println!("stgen v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "{:>8} {:>10} {:>10} {:>10} {:>10} {:>8}",
            "thread", "compute", "comm", "sync", "markers", "instrs"
        );
        for (tid, stats) in &summary.threads {
            println!(
                "{tid:>8} {:>10} {:>10} {:>10} {:>10} {:>8}",
                stats.comp_events, stats.comm_events, stats.sync_events, stats.markers, stats.instrs
            );
        }
        let (pthread, stats) = report_paths(&args.output_dir);
        println!("Thread metadata: {}", pthread.display());
        println!("Statistics:      {}", stats.display());
    }
    Ok(())
}

fn run_dump(path: &Path) -> Result<()> {
    let records = read_trace_file(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    let tid = tid_from_trace_path(path).unwrap_or(Tid(0));

    let mut out = std::io::stdout().lock();
    let mut next_eid = Eid(0);
    for record in &records {
        let eid = record.consumes_eid().then_some(next_eid);
        if eid.is_some() {
            next_eid = next_eid.next();
        }
        writeln!(out, "{}", format_record(tid, eid, record))?;
    }
    out.flush()?;
    Ok(())
}
