//! Aggregated call graph with visual encoding.
//!
//! Turns a [`CallStats`] snapshot into a self-contained [`GraphDescription`]
//! that any graph renderer can draw without looking back at the trace.
//!
//! # Encoding
//!
//! ```text
//! node width   max(60 + m, label_chars·8 + 20)    m = min(ln(calls+1)·15, 80)
//! node height  35 + min(m/4, 15)
//! node color   hsl(hue, sat, 75 − 40·r)            r = relative avg duration
//! edge width   min(1 + ln(weight+1)·1.5, 6)
//! edge color   hsl(caller hue, sat, 65 − 25·r)    r = relative weight
//! ```
//!
//! Duration ratios are computed per path: a slow send function is compared to
//! other send functions only. Edge ratios are computed over the edges that
//! survive the duration window.

// Sizes and ratios are derived from integer counts
#![allow(clippy::cast_precision_loss)]

use super::duration_range::{positive_bounds, DurationWindow};
use super::stats::{collect_stats, CallStats, FunctionStats, Link};
use crate::domain::{ChainScope, FunctionKey};
use crate::symbolization::{display_label, SymbolTable};
use chainscope_common::{Category, Trace};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// CONSTANTS
// =============================================================================

const NODE_BASE_WIDTH: f64 = 60.0;
const NODE_BASE_HEIGHT: f64 = 35.0;
const NODE_SIZE_LOG_FACTOR: f64 = 15.0;
const NODE_MAX_MULTIPLIER: f64 = 80.0;
const NODE_MAX_HEIGHT_BONUS: f64 = 15.0;
/// Approximate rendered width of one label character
const LABEL_CHAR_WIDTH: f64 = 8.0;
const LABEL_PADDING: f64 = 20.0;

const NODE_LIGHTNESS_BASE: f64 = 75.0;
const NODE_LIGHTNESS_RANGE: f64 = 40.0;
const BORDER_DARKEN: f64 = 15.0;

const EDGE_BASE_WIDTH: f64 = 1.0;
const EDGE_LOG_FACTOR: f64 = 1.5;
const EDGE_MAX_WIDTH: f64 = 6.0;
const EDGE_LIGHTNESS_BASE: f64 = 65.0;
const EDGE_LIGHTNESS_RANGE: f64 = 25.0;

const LEGEND_LIGHTNESS: f64 = 55.0;
const LEGEND_BORDER_LIGHTNESS: f64 = 40.0;

/// Ratio used when all values in a group are equal
const NEUTRAL_RATIO: f64 = 0.5;

/// Upper bound used for a path with no measured durations
const EMPTY_RANGE_MAX: f64 = 0.001;

// =============================================================================
// COLORS
// =============================================================================

/// HSL color as understood by CSS-style renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: f64,
}

impl Hsl {
    #[must_use]
    pub fn darken(self, amount: f64) -> Self {
        Self { lightness: self.lightness - amount, ..self }
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

impl Serialize for Hsl {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fixed hue and saturation of a path; lightness carries the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPalette {
    pub hue: u16,
    pub saturation: u8,
}

impl CategoryPalette {
    #[must_use]
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Receive => Self { hue: 210, saturation: 70 },
            Category::Send => Self { hue: 35, saturation: 85 },
        }
    }

    #[must_use]
    pub fn with_lightness(self, lightness: f64) -> Hsl {
        Hsl { hue: self.hue, saturation: self.saturation, lightness }
    }
}

// =============================================================================
// GRAPH DESCRIPTION (OUTPUT TYPE)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeSize {
    pub width: f64,
    pub height: f64,
}

/// One function in the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Stable id, `<category>_<address>`
    pub id: String,
    #[serde(skip)]
    pub key: FunctionKey,
    pub address: u64,
    #[serde(serialize_with = "serialize_category")]
    pub category: Category,
    /// Full resolved name
    pub full_name: String,
    /// Name as drawn inside the node
    pub label: String,
    pub call_count: u64,
    pub avg_duration: f64,
    pub total_duration: f64,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
    pub size: NodeSize,
    pub color: Hsl,
    pub border_color: Hsl,
}

/// One caller → callee relation in the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(skip)]
    pub caller: FunctionKey,
    #[serde(skip)]
    pub callee: FunctionKey,
    pub weight: u64,
    pub width: f64,
    pub color: Hsl,
}

impl GraphEdge {
    #[must_use]
    pub fn is_cross_category(&self) -> bool {
        self.caller.category != self.callee.category
    }
}

/// Legend entry for one path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDescriptor {
    pub name: String,
    pub color: Hsl,
    pub border_color: Hsl,
    /// Bounds of non-zero average durations on this path
    pub duration_range: DurationWindow,
}

/// Render-ready graph, free of references into the trace
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDescription {
    pub title: String,
    #[serde(serialize_with = "serialize_scope")]
    pub scope: ChainScope,
    /// Thread of the selected receive chain (single-chain scope only)
    pub thread_id: Option<i64>,
    /// Window applied to average durations, if any
    pub duration_window: Option<DurationWindow>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub legend: Vec<CategoryDescriptor>,
}

/// Nodes and edges of one rendering group
#[derive(Debug, Default)]
pub struct GraphGroup<'a> {
    pub nodes: Vec<&'a GraphNode>,
    pub edges: Vec<&'a GraphEdge>,
}

/// Receive-only, send-only and cross-path groups
#[derive(Debug, Default)]
pub struct GraphPartition<'a> {
    pub receive: GraphGroup<'a>,
    pub send: GraphGroup<'a>,
    /// Edges joining the two paths. Links are only ever recorded within one
    /// path's replay, so this group is empty for every trace today.
    pub cross: GraphGroup<'a>,
}

impl GraphDescription {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[must_use]
    pub fn node(&self, key: &FunctionKey) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.key == *key)
    }

    #[must_use]
    pub fn edge(&self, caller: &FunctionKey, callee: &FunctionKey) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.caller == *caller && e.callee == *callee)
    }

    /// Split nodes and edges into rendering groups
    #[must_use]
    pub fn partition(&self) -> GraphPartition<'_> {
        let mut partition = GraphPartition::default();

        for node in &self.nodes {
            match node.category {
                Category::Receive => partition.receive.nodes.push(node),
                Category::Send => partition.send.nodes.push(node),
            }
        }

        for edge in &self.edges {
            if edge.is_cross_category() {
                partition.cross.edges.push(edge);
                continue;
            }
            match edge.caller.category {
                Category::Receive => partition.receive.edges.push(edge),
                Category::Send => partition.send.edges.push(edge),
            }
        }

        partition
    }

    /// Short human-readable summary line
    #[must_use]
    pub fn subtitle(&self) -> String {
        let window = self.duration_window.map_or_else(String::new, |w| format!("avg in {w}, "));
        let thread = self.thread_id.map_or_else(String::new, |t| format!("thread {t}, "));
        format!("{window}{thread}{} functions, {} links", self.nodes.len(), self.edges.len())
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_category<S: serde::Serializer>(c: &Category, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(c.as_str())
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_scope<S: serde::Serializer>(scope: &ChainScope, s: S) -> Result<S::Ok, S::Error> {
    match scope {
        ChainScope::All => s.serialize_str("all"),
        ChainScope::Single(index) => s.serialize_u64(*index as u64),
    }
}

// =============================================================================
// GRAPH BUILDER
// =============================================================================

/// Builds a [`GraphDescription`] from one stats snapshot
pub struct GraphBuilder<'a> {
    stats: &'a CallStats,
    symbols: &'a SymbolTable,
    scope: ChainScope,
    thread_id: Option<i64>,
}

impl<'a> GraphBuilder<'a> {
    /// `stats` must already be restricted to `scope`
    #[must_use]
    pub fn new(stats: &'a CallStats, symbols: &'a SymbolTable, scope: ChainScope) -> Self {
        Self { stats, symbols, scope, thread_id: None }
    }

    /// Thread id reported for single-chain graphs
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: Option<i64>) -> Self {
        self.thread_id = thread_id;
        self
    }

    /// Build the graph, keeping only functions whose average lies in `window`
    #[must_use]
    pub fn build(&self, window: Option<DurationWindow>) -> GraphDescription {
        let bounds = Category::ALL.map(|c| (c, category_bounds(self.stats, c)));
        let bounds_for = |category: Category| {
            bounds.iter().find(|(c, _)| *c == category).map_or(
                DurationWindow { min: 0.0, max: EMPTY_RANGE_MAX },
                |(_, b)| *b,
            )
        };

        let retained: Vec<(&FunctionKey, &FunctionStats)> = self
            .stats
            .functions()
            .filter(|(_, s)| window.is_none_or(|w| w.contains(s.avg_duration())))
            .collect();
        let retained_keys: BTreeSet<FunctionKey> = retained.iter().map(|(k, _)| **k).collect();

        let nodes: Vec<GraphNode> = retained
            .iter()
            .map(|(key, stats)| self.build_node(**key, stats, bounds_for(key.category)))
            .collect();

        let links: Vec<Link> = self
            .stats
            .links()
            .filter(|l| retained_keys.contains(&l.caller) && retained_keys.contains(&l.callee))
            .collect();
        let edges = build_edges(&links);

        let legend = Category::ALL
            .iter()
            .map(|&category| {
                let palette = CategoryPalette::for_category(category);
                CategoryDescriptor {
                    name: category.to_string(),
                    color: palette.with_lightness(LEGEND_LIGHTNESS),
                    border_color: palette.with_lightness(LEGEND_BORDER_LIGHTNESS),
                    duration_range: bounds_for(category),
                }
            })
            .collect();

        let title = match self.scope {
            ChainScope::All => "Aggregated call graph".to_string(),
            ChainScope::Single(index) => format!("Call graph of chain #{}", index + 1),
        };

        GraphDescription {
            title,
            scope: self.scope,
            thread_id: self.thread_id,
            duration_window: window,
            nodes,
            edges,
            legend,
        }
    }

    fn build_node(&self, key: FunctionKey, stats: &FunctionStats, bounds: DurationWindow) -> GraphNode {
        let full_name = self.symbols.resolve(key.address);
        let label = display_label(&full_name);
        let avg_duration = stats.avg_duration();

        let palette = CategoryPalette::for_category(key.category);
        let ratio = relative_position(avg_duration, bounds.min, bounds.max);
        let color = palette.with_lightness(NODE_LIGHTNESS_BASE - NODE_LIGHTNESS_RANGE * ratio);

        GraphNode {
            id: key.to_string(),
            key,
            address: key.address,
            category: key.category,
            size: node_size(stats.call_count, label.chars().count()),
            full_name,
            label,
            call_count: stats.call_count,
            avg_duration,
            total_duration: stats.total_duration,
            min_duration: stats.min_duration(),
            max_duration: stats.max_duration(),
            color,
            border_color: color.darken(BORDER_DARKEN),
        }
    }
}

/// Replay `trace` at `scope` and build its graph
#[must_use]
pub fn build_graph(
    trace: &Trace,
    symbols: &SymbolTable,
    scope: ChainScope,
    window: Option<DurationWindow>,
) -> GraphDescription {
    let stats = collect_stats(trace, scope);
    GraphBuilder::new(&stats, symbols, scope)
        .with_thread_id(scope_thread_id(trace, scope))
        .build(window)
}

/// Thread of the selected receive chain's first event
#[must_use]
pub fn scope_thread_id(trace: &Trace, scope: ChainScope) -> Option<i64> {
    match scope {
        ChainScope::All => None,
        ChainScope::Single(index) => trace
            .chains(Category::Receive)
            .get(index)
            .and_then(|chain| chain.first())
            .map(|event| event.thread_id),
    }
}

/// Bounds of the non-zero averages on one path, `[0, 0.001]` if there are none
fn category_bounds(stats: &CallStats, category: Category) -> DurationWindow {
    positive_bounds(stats.category(category).map(|(_, s)| s.avg_duration()))
        .map_or(DurationWindow { min: 0.0, max: EMPTY_RANGE_MAX }, |(min, max)| DurationWindow {
            min,
            max,
        })
}

/// Position of `value` in `[min, max]`, clamped; neutral when the range is empty
fn relative_position(value: f64, min: f64, max: f64) -> f64 {
    if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        NEUTRAL_RATIO
    }
}

fn node_size(call_count: u64, label_chars: usize) -> NodeSize {
    let multiplier = ((call_count as f64 + 1.0).ln() * NODE_SIZE_LOG_FACTOR).min(NODE_MAX_MULTIPLIER);
    let label_width = label_chars as f64 * LABEL_CHAR_WIDTH + LABEL_PADDING;
    NodeSize {
        width: (NODE_BASE_WIDTH + multiplier).max(label_width),
        height: NODE_BASE_HEIGHT + (multiplier / 4.0).min(NODE_MAX_HEIGHT_BONUS),
    }
}

fn edge_width(weight: u64) -> f64 {
    (EDGE_BASE_WIDTH + (weight as f64 + 1.0).ln() * EDGE_LOG_FACTOR).min(EDGE_MAX_WIDTH)
}

fn build_edges(links: &[Link]) -> Vec<GraphEdge> {
    let min_weight = links.iter().map(|l| l.weight).min().unwrap_or(0) as f64;
    let max_weight = links.iter().map(|l| l.weight).max().unwrap_or(0) as f64;

    links
        .iter()
        .map(|link| {
            let ratio = relative_position(link.weight as f64, min_weight, max_weight);
            let palette = CategoryPalette::for_category(link.caller.category);
            GraphEdge {
                source: link.caller.to_string(),
                target: link.callee.to_string(),
                caller: link.caller,
                callee: link.callee,
                weight: link.weight,
                width: edge_width(link.weight),
                color: palette.with_lightness(EDGE_LIGHTNESS_BASE - EDGE_LIGHTNESS_RANGE * ratio),
            }
        })
        .collect()
}
