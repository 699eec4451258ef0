//! Memoized analysis session
//!
//! Holds the current trace and function table and caches every derived view,
//! keyed by exactly the inputs that view depends on:
//!
//! | view            | key                                        |
//! |-----------------|--------------------------------------------|
//! | processed       | trace, symbols, category                   |
//! | inspector       | trace, symbols, category, filter           |
//! | duration range  | trace                                      |
//! | graph           | trace, symbols, scope, duration window     |
//!
//! Each cache is single-slot per view: asking for the same inputs again returns
//! the previous `Arc`, asking for different inputs recomputes and replaces it.
//! The trace and table are compared by `Arc` identity; small inputs (filter,
//! scope, window) by value. Content fingerprints only decide whether a
//! replacement trace or table is new enough to need a fresh `Arc`.

use crate::analysis::{
    build_inspector, collect_stats, duration_range, process_chains, scope_thread_id, CallFilter,
    CallRecord, CallStats, DurationWindow, GraphBuilder, GraphDescription, InspectorView,
};
use crate::domain::ChainScope;
use crate::symbolization::SymbolTable;
use chainscope_common::{Category, Trace};
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

/// Value computed for the most recent key
#[derive(Debug)]
struct Memo<K, V> {
    slot: Option<(K, Arc<V>)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    fn get_or_compute(
        &mut self,
        key: K,
        counters: &mut CacheCounters,
        compute: impl FnOnce() -> V,
    ) -> Arc<V> {
        if let Some((cached_key, value)) = &self.slot {
            if *cached_key == key {
                counters.hits += 1;
                return Arc::clone(value);
            }
        }
        counters.misses += 1;
        let value = Arc::new(compute());
        self.slot = Some((key, Arc::clone(&value)));
        value
    }
}

/// Shared input compared by pointer identity
///
/// The memo slot holds a clone of the `Arc`, so the allocation cannot be
/// reused by another value while the key is alive.
#[derive(Debug)]
struct Same<T>(Arc<T>);

impl<T> PartialEq for Same<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Trace and function table a view was derived from
#[derive(Debug, PartialEq)]
struct Inputs {
    trace: Same<Trace>,
    symbols: Same<SymbolTable>,
}

/// Window as raw bit patterns, which compare totally
fn window_key(window: Option<DurationWindow>) -> Option<(u64, u64)> {
    window.map(|w| (w.min.to_bits(), w.max.to_bits()))
}

/// Fingerprint of a trace's full content
#[must_use]
pub fn trace_fingerprint(trace: &Trace) -> u64 {
    let mut hasher = DefaultHasher::new();
    for category in Category::ALL {
        let chains = trace.chains(category);
        chains.len().hash(&mut hasher);
        for chain in chains {
            chain.len().hash(&mut hasher);
            for event in chain {
                event.timestamp.to_bits().hash(&mut hasher);
                event.is_return.hash(&mut hasher);
                event.function_address.hash(&mut hasher);
                event.thread_id.hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

/// Fingerprint of a function table's content
#[must_use]
pub fn symbols_fingerprint(symbols: &SymbolTable) -> u64 {
    let mut hasher = DefaultHasher::new();
    symbols.sorted_entries().hash(&mut hasher);
    hasher.finish()
}

/// Current inputs plus cached views
#[derive(Debug)]
pub struct Session {
    trace: Arc<Trace>,
    trace_fp: u64,
    symbols: Arc<SymbolTable>,
    symbols_fp: u64,

    processed: HashMap<Category, Memo<Inputs, Vec<Vec<CallRecord>>>>,
    inspector: HashMap<Category, Memo<(Inputs, CallFilter), InspectorView>>,
    all_stats: Memo<Same<Trace>, CallStats>,
    range: Memo<Same<Trace>, DurationWindow>,
    graph: Memo<(Inputs, ChainScope, Option<(u64, u64)>), GraphDescription>,

    counters: CacheCounters,
}

impl Session {
    #[must_use]
    pub fn new(trace: Trace, symbols: SymbolTable) -> Self {
        Self {
            trace_fp: trace_fingerprint(&trace),
            trace: Arc::new(trace),
            symbols_fp: symbols_fingerprint(&symbols),
            symbols: Arc::new(symbols),
            processed: HashMap::new(),
            inspector: HashMap::new(),
            all_stats: Memo::default(),
            range: Memo::default(),
            graph: Memo::default(),
            counters: CacheCounters::default(),
        }
    }

    /// Replace the trace, e.g. after a new fetch
    ///
    /// A trace equal to the current one keeps every cached view.
    pub fn set_trace(&mut self, trace: Trace) {
        let fp = trace_fingerprint(&trace);
        if fp == self.trace_fp && *self.trace == trace {
            return;
        }
        debug!("Trace changed ({} → {})", self.trace_fp, fp);
        self.trace = Arc::new(trace);
        self.trace_fp = fp;
    }

    /// Replace the function table
    pub fn set_symbols(&mut self, symbols: SymbolTable) {
        let fp = symbols_fingerprint(&symbols);
        if fp == self.symbols_fp && *self.symbols == symbols {
            return;
        }
        self.symbols = Arc::new(symbols);
        self.symbols_fp = fp;
    }

    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[must_use]
    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    fn inputs(&self) -> Inputs {
        Inputs {
            trace: Same(Arc::clone(&self.trace)),
            symbols: Same(Arc::clone(&self.symbols)),
        }
    }

    /// Records of every chain of one path
    pub fn processed(&mut self, category: Category) -> Arc<Vec<Vec<CallRecord>>> {
        let key = self.inputs();
        let (trace, symbols) = (&self.trace, &self.symbols);
        self.processed.entry(category).or_default().get_or_compute(key, &mut self.counters, || {
            debug!("Processing {category} chains");
            process_chains(trace.chains(category), symbols)
        })
    }

    /// Filtered per-chain forests of one path
    pub fn inspector(&mut self, category: Category, filter: &CallFilter) -> Arc<InspectorView> {
        let processed = self.processed(category);
        let key = (self.inputs(), filter.clone());
        self.inspector.entry(category).or_default().get_or_compute(key, &mut self.counters, || {
            debug!("Filtering {category} chains");
            build_inspector(&processed, filter)
        })
    }

    fn all_stats(&mut self) -> Arc<CallStats> {
        let trace = &self.trace;
        self.all_stats.get_or_compute(Same(Arc::clone(trace)), &mut self.counters, || {
            debug!("Replaying all chains");
            collect_stats(trace, ChainScope::All)
        })
    }

    /// Bounds for the duration window; depends on the trace only
    pub fn duration_range(&mut self) -> DurationWindow {
        let stats = self.all_stats();
        let key = Same(Arc::clone(&self.trace));
        let range = self.range.get_or_compute(key, &mut self.counters, || duration_range(&stats));
        *range
    }

    /// Aggregated graph at `scope`, restricted to `window` when given
    pub fn graph(
        &mut self,
        scope: ChainScope,
        window: Option<DurationWindow>,
    ) -> Arc<GraphDescription> {
        let key = (self.inputs(), scope, window_key(window));

        let all_stats = match scope {
            ChainScope::All => Some(self.all_stats()),
            ChainScope::Single(_) => None,
        };
        let (trace, symbols) = (&self.trace, &self.symbols);
        self.graph.get_or_compute(key, &mut self.counters, || {
            debug!("Building call graph for {scope}");
            let scoped;
            let stats = if let Some(stats) = &all_stats {
                stats.as_ref()
            } else {
                scoped = collect_stats(trace, scope);
                &scoped
            };
            GraphBuilder::new(stats, symbols, scope)
                .with_thread_id(scope_thread_id(trace, scope))
                .build(window)
        })
    }
}
