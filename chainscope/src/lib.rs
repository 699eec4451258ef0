//! # chainscope - Kernel Call-Chain Reconstruction and Aggregation
//!
//! chainscope takes the function entry/exit events a kernel tracer records
//! while packets of one connection travel the network stack, and turns them
//! into two views:
//!
//! - a per-chain call tree for drill-down inspection, and
//! - an aggregated call graph with per-function timing statistics and the
//!   visual encoding (size, color, edge width) a renderer needs.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Tracer (trace + function table)                 │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ [receiveChains, sendChains] JSON
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    chainscope (This Crate)                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    Source    │──▶│  trace_data  │──▶│   Session    │         │
//! │  │ (TraceSource)│   │  (validate)  │   │  (memoize)   │         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               │                 │
//! │         ┌─────────────────────────────────────┤                 │
//! │         ▼                                     ▼                 │
//! │  ┌──────────────┐                      ┌──────────────┐         │
//! │  │  call_tree   │                      │    stats     │         │
//! │  │  + filter    │                      │  (replay)    │         │
//! │  │  + inspector │                      └──────┬───────┘         │
//! │  └──────┬───────┘                 ┌───────────┴──────┐          │
//! │         │                         ▼                  ▼          │
//! │         │                  ┌──────────────┐  ┌──────────────┐   │
//! │         │                  │duration_range│  │    graph     │   │
//! │         │                  └──────────────┘  └──────┬───────┘   │
//! │         ▼                                           ▼           │
//! │  ┌──────────────┐                           ┌──────────────┐    │
//! │  │    Report    │                           │    Export    │    │
//! │  │   (stdout)   │                           │   (JSON)     │    │
//! │  └──────────────┘                           └──────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`symbolization`]: address → function name lookup with `0x<hex>` fallback
//! - [`trace_data`]: validation of the positional wire tuples into typed events
//! - [`analysis`]: the engine proper
//!   - `call_tree`: depth annotation and per-chain forests
//!   - `stats`: entry/exit pairing, durations and caller → callee links
//!   - `filter` / `inspector`: record filtering and the drill-down view
//!   - `duration_range` / `graph`: window bounds and the aggregated graph
//! - [`session`]: memoization of every stage, keyed by input fingerprints
//! - [`source`]: the fetch contract and a file-backed implementation
//! - [`export`] / [`report`]: JSON and plain-text output
//! - [`cli`]: command-line argument parsing
//! - [`domain`]: shared types and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Call trees of the most recent receive chain
//! chainscope trace.json --symbols funcs.json
//!
//! # Aggregated graph over every chain, exported for a renderer
//! chainscope trace.json --all --graph --export graph.json
//! ```
//!
//! ## Key Concepts
//!
//! - **Chain**: events recorded for one packet on one path, in order
//! - **Category**: the path, receive or send; functions on different paths
//!   are distinct graph nodes even at the same address
//! - **Depth**: number of calls open when a record is processed
//! - **Duration window**: range of average durations a graph node must fall in

// Expose modules for testing
pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod report;
pub mod session;
pub mod source;
pub mod symbolization;
pub mod trace_data;
