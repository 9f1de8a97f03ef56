//! # stgen - Synchronization-Aware Event Trace Generator
//!
//! stgen turns the primitive event stream of an instrumented multithreaded
//! program into compact per-thread traces that a trace-driven simulator can
//! replay. Runs of computation are folded into aggregated Compute events,
//! reads of data produced by another thread become Communication edges, and
//! synchronization calls are kept as ordering points.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Instrumentation Front End                       │
//! │        (or `stgen record`, replaying a raw event script)        │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ iop / flop / read / write / sync / switch
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       EventHandlers                             │
//! │     active-thread cursor, lazy per-thread context creation      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ one thread's events, strictly ordered
//!                         ▼
//! ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │  ThreadContext   │◀─▶│   ShadowMemory   │   │   EventLogger    │
//! │ (aggregation FSM)│   │ (last writer per │   │ batch ▶ encode ▶ │
//! │                  │──▶│  address range)  │   │ gzip ▶ file      │
//! └────────┬─────────┘   └──────────────────┘   └────────▲─────────┘
//!          │                 finished records            │
//!          └─────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`shadow`]: process-wide map from byte ranges to their last writer
//!   `(thread, event)`, the source of Communication edges
//!
//! - [`aggregation`]: per-thread state machine
//!   - `thread_context`: compressed and uncompressed aggregation variants
//!   - `window`: open Compute and Communication accumulators
//!   - `range_set`: minimal covering set of accessed ranges
//!
//! - [`logging`]: finished records and their persistence
//!   - `binary`: double-buffered batches encoded and compressed on a
//!     background thread
//!   - `text`: line-oriented rendering for debugging
//!   - `codec`: length-delimited protobuf batches, trace reading
//!
//! - [`handlers`]: event routing, thread metadata and shutdown reports
//!
//! - [`input`]: typed raw events and the replay script parser
//!
//! - [`config`], [`cli`], [`domain`]: configuration, arguments, newtypes
//!   and errors
//!
//! ## Event Ids
//!
//! Every thread numbers its finished Compute, Communication and Sync events
//! from 0. Markers carry an instruction count and take no id. A
//! Communication edge names its producer by `(thread, event id)`, which lets
//! a simulator make the consumer wait for exactly that event.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Replay a raw event script into ./traces
//! stgen record events.txt -o traces
//!
//! # Inspect one thread's trace
//! stgen dump traces/sigil.events.out-1.bin.gz
//! ```

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod domain;
pub mod handlers;
pub mod input;
pub mod logging;
pub mod shadow;
