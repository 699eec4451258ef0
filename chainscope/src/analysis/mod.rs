//! Analysis logic for call-chain traces
//!
//! This module contains the pure business logic of the engine, separated from
//! loading, export and presentation. Every function here takes an immutable
//! snapshot and returns a fresh value.
//!
//! ```text
//! Trace ──► call_tree ──► filter ──► inspector        (per-chain drill-down)
//!   │
//!   └────► stats ──┬──► duration_range                (window bounds)
//!                  └──► graph                         (aggregated call graph)
//! ```

pub mod call_tree;
pub mod duration_range;
pub mod filter;
pub mod graph;
pub mod inspector;
pub mod stats;

pub use call_tree::{
    build_call_tree, forest_record_count, process_chain, process_chains, CallRecord, CallTreeNode,
};
pub use duration_range::{
    duration_range, duration_range_of_trace, DurationWindow, DEFAULT_DURATION_WINDOW,
};
pub use filter::{filter_chains, thread_ids, CallFilter, CallTypeFilter, FilteredChain, ThreadFilter};
pub use graph::{
    build_graph, scope_thread_id, CategoryDescriptor, GraphBuilder, GraphDescription, GraphEdge,
    GraphNode, Hsl,
};
pub use inspector::{build_inspector, ChainView, InspectorView};
pub use stats::{collect_stats, CallStats, FunctionStats, Link, StatsBuilder};
