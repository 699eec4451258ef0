//! Plain-text rendering for terminal output
//!
//! ```text
//! receive: 2/3 chains match (6 calls)
//!
//! chain #1  thread 10  4/4 calls
//!   → ip_rcv                         0.000000s
//!     → ip_rcv_finish                0.000010s
//!       ← ip_rcv_finish              0.000030s
//!     ← ip_rcv                       0.000050s
//! ```

use crate::analysis::{CallTreeNode, ChainView, GraphDescription, GraphNode, InspectorView};
use crate::domain::{CallType, Micros};
use chainscope_common::Category;
use std::io::{self, Write};

const INDENT: &str = "  ";
const NAME_COLUMN: usize = 32;

fn arrow(call_type: CallType) -> &'static str {
    match call_type {
        CallType::Call => "→",
        CallType::Return => "←",
    }
}

fn write_node<W: Write>(out: &mut W, node: &CallTreeNode, level: usize) -> io::Result<()> {
    let record = &node.record;
    let indent = INDENT.repeat(level + 1);
    let width = NAME_COLUMN.saturating_sub(indent.len());
    writeln!(
        out,
        "{indent}{} {:<width$} {:.6}s",
        arrow(record.call_type),
        record.func_name,
        record.timestamp
    )?;
    for child in &node.children {
        write_node(out, child, level + 1)?;
    }
    Ok(())
}

fn write_chain<W: Write>(out: &mut W, chain: &ChainView) -> io::Result<()> {
    let thread = chain.thread_id.map_or_else(|| "-".to_string(), |t| t.to_string());
    writeln!(
        out,
        "chain #{}  thread {thread}  {}/{} calls",
        chain.chain_index + 1,
        chain.visible_calls,
        chain.original_length
    )?;
    for root in &chain.roots {
        write_node(out, root, 0)?;
    }
    Ok(())
}

/// Print the call trees of every chain that survived filtering
///
/// # Errors
/// Returns an error if writing to `out` fails.
pub fn write_inspector<W: Write>(
    out: &mut W,
    category: Category,
    view: &InspectorView,
) -> io::Result<()> {
    writeln!(
        out,
        "{category}: {}/{} chains match ({} calls)",
        view.filtered_chains, view.total_chains, view.total_calls
    )?;
    for chain in view.visible() {
        writeln!(out)?;
        write_chain(out, chain)?;
    }
    Ok(())
}

fn optional_micros(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| Micros(v).to_string())
}

/// Nodes ordered by total time spent, slowest first
#[must_use]
pub fn nodes_by_total_duration(graph: &GraphDescription) -> Vec<&GraphNode> {
    let mut nodes: Vec<&GraphNode> = graph.nodes.iter().collect();
    nodes.sort_by(|a, b| {
        b.total_duration.total_cmp(&a.total_duration).then_with(|| a.key.cmp(&b.key))
    });
    nodes
}

/// Print the per-function statistics and links of a graph
///
/// # Errors
/// Returns an error if writing to `out` fails.
pub fn write_graph<W: Write>(out: &mut W, graph: &GraphDescription) -> io::Result<()> {
    writeln!(out, "{}", graph.title)?;
    writeln!(out, "{}", graph.subtitle())?;
    for entry in &graph.legend {
        writeln!(out, "  {:<8} avg range {}", entry.name, entry.duration_range)?;
    }

    if graph.is_empty() {
        writeln!(out, "\n(no functions in range)")?;
        return Ok(());
    }

    writeln!(
        out,
        "\n{:<NAME_COLUMN$} {:<8} {:>7} {:>10} {:>10} {:>10} {:>10}",
        "function", "path", "calls", "avg", "min", "max", "total"
    )?;
    for node in nodes_by_total_duration(graph) {
        writeln!(
            out,
            "{:<NAME_COLUMN$} {:<8} {:>7} {:>10} {:>10} {:>10} {:>10}",
            node.label,
            node.category,
            node.call_count,
            Micros(node.avg_duration).to_string(),
            optional_micros(node.min_duration),
            optional_micros(node.max_duration),
            Micros(node.total_duration).to_string(),
        )?;
    }

    if !graph.edges.is_empty() {
        writeln!(out, "\nlinks:")?;
        for edge in &graph.edges {
            writeln!(out, "  {} → {}  ×{}", edge.source, edge.target, edge.weight)?;
        }
    }
    Ok(())
}
