//! Duration matching and per-function statistics.
//!
//! Chains are replayed through a call stack so every function entry can be
//! paired with its exit. The replay yields, per [`FunctionKey`]:
//!
//! - how many times the function was entered
//! - one duration sample per matched entry/exit pair (µs)
//! - caller → callee link counts between directly nested calls
//!
//! # Architecture
//!
//! - **`StatsBuilder`** - owns the accumulators while chains are replayed
//! - **`CallStats`** - immutable snapshot returned by `StatsBuilder::build()`
//! - **`collect_stats()`** - one pass over a trace at a given scope
//!
//! # Stack Desynchronisation
//!
//! A RETURN always pops the innermost frame. If that frame belongs to another
//! function the sample is dropped and the frame is not restored; the replay
//! keeps going rather than trying to resynchronise. A RETURN with nothing
//! open is ignored. Both cases are counted so callers can report them.

// Durations are accumulated as f64 microseconds and counts converted for averages
#![allow(clippy::cast_precision_loss)]

use crate::domain::{ChainScope, FunctionKey, Micros};
use chainscope_common::{Category, Chain, Event, Trace};
use log::debug;
use std::collections::BTreeMap;

// =============================================================================
// OUTPUT TYPES
// =============================================================================

/// Timing statistics of one function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionStats {
    /// Number of entries seen (matched or not).
    pub call_count: u64,

    /// Sum of all matched durations, in µs.
    pub total_duration: f64,

    /// Matched durations in replay order, in µs.
    pub durations: Vec<f64>,
}

impl FunctionStats {
    /// Mean matched duration in µs, 0 when nothing matched
    #[must_use]
    pub fn avg_duration(&self) -> f64 {
        if self.durations.is_empty() {
            0.0
        } else {
            self.total_duration / self.durations.len() as f64
        }
    }

    #[must_use]
    pub fn min_duration(&self) -> Option<f64> {
        self.durations.iter().copied().reduce(f64::min)
    }

    #[must_use]
    pub fn max_duration(&self) -> Option<f64> {
        self.durations.iter().copied().reduce(f64::max)
    }

    fn record_duration(&mut self, duration: Micros) {
        self.total_duration += duration.0;
        self.durations.push(duration.0);
    }
}

/// Caller → callee pair observed between directly nested calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
    pub caller: FunctionKey,
    pub callee: FunctionKey,
}

/// A link with the number of times it was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub caller: FunctionKey,
    pub callee: FunctionKey,
    pub weight: u64,
}

impl Link {
    /// Whether the two endpoints were traced on different paths
    #[must_use]
    pub fn is_cross_category(&self) -> bool {
        self.caller.category != self.callee.category
    }
}

/// Immutable result of a replay pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStats {
    functions: BTreeMap<FunctionKey, FunctionStats>,
    links: BTreeMap<LinkKey, u64>,
    orphan_returns: u64,
    mismatched_returns: u64,
}

impl CallStats {
    #[must_use]
    pub fn get(&self, key: &FunctionKey) -> Option<&FunctionStats> {
        self.functions.get(key)
    }

    /// All functions, ordered by key
    pub fn functions(&self) -> impl Iterator<Item = (&FunctionKey, &FunctionStats)> {
        self.functions.iter()
    }

    /// Functions traced on one path
    pub fn category(
        &self,
        category: Category,
    ) -> impl Iterator<Item = (&FunctionKey, &FunctionStats)> {
        self.functions.iter().filter(move |(key, _)| key.category == category)
    }

    /// All links, ordered by (caller, callee)
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.links.iter().map(|(key, &weight)| Link { caller: key.caller, callee: key.callee, weight })
    }

    #[must_use]
    pub fn link_weight(&self, caller: FunctionKey, callee: FunctionKey) -> u64 {
        self.links.get(&LinkKey { caller, callee }).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// RETURNs seen with no open call
    #[must_use]
    pub fn orphan_returns(&self) -> u64 {
        self.orphan_returns
    }

    /// RETURNs whose innermost open call belonged to another function
    #[must_use]
    pub fn mismatched_returns(&self) -> u64 {
        self.mismatched_returns
    }

    /// Total number of duration samples across all functions
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.functions.values().map(|s| s.durations.len()).sum()
    }
}

// =============================================================================
// STATS BUILDER (AGGREGATOR)
// =============================================================================

/// Open call on the replay stack
#[derive(Debug, Clone, Copy)]
struct Frame {
    start_time: f64,
    key: FunctionKey,
}

/// Accumulates statistics while chains are replayed
///
/// Each chain is replayed against its own fresh stack, so an unbalanced chain
/// never leaks frames into the next one.
#[derive(Debug, Default)]
pub struct StatsBuilder {
    stats: CallStats,
}

impl StatsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay one chain
    pub fn record_chain(&mut self, category: Category, chain: &[Event]) {
        let mut stack: Vec<Frame> = Vec::new();

        for event in chain {
            let key = FunctionKey::new(category, event.function_address);

            if event.is_return {
                self.record_return(&mut stack, key, event.timestamp);
                continue;
            }

            if let Some(caller) = stack.last() {
                *self.stats.links.entry(LinkKey { caller: caller.key, callee: key }).or_insert(0) += 1;
            }
            stack.push(Frame { start_time: event.timestamp, key });
            self.stats.functions.entry(key).or_default().call_count += 1;
        }
    }

    fn record_return(&mut self, stack: &mut Vec<Frame>, key: FunctionKey, timestamp: f64) {
        let Some(frame) = stack.pop() else {
            self.stats.orphan_returns += 1;
            return;
        };

        if frame.key != key {
            debug!("Return of {key} closed open call {}; dropping sample", frame.key);
            self.stats.mismatched_returns += 1;
            return;
        }

        self.stats
            .functions
            .entry(key)
            .or_default()
            .record_duration(Micros::between(frame.start_time, timestamp));
    }

    /// Replay the chains of one path that fall inside `scope`
    pub fn record_category(&mut self, category: Category, chains: &[Chain], scope: ChainScope) {
        for (index, chain) in chains.iter().enumerate() {
            if scope.includes(index) {
                self.record_chain(category, chain);
            }
        }
    }

    /// Finish the pass
    #[must_use]
    pub fn build(self) -> CallStats {
        if self.stats.orphan_returns > 0 || self.stats.mismatched_returns > 0 {
            debug!(
                "Replay finished with {} orphan and {} mismatched returns",
                self.stats.orphan_returns, self.stats.mismatched_returns
            );
        }
        self.stats
    }
}

/// Replay both paths of a trace at the given scope
#[must_use]
pub fn collect_stats(trace: &Trace, scope: ChainScope) -> CallStats {
    let mut builder = StatsBuilder::new();
    for category in Category::ALL {
        builder.record_category(category, trace.chains(category), scope);
    }
    builder.build()
}
