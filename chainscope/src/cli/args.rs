//! CLI argument definitions

use crate::analysis::{CallFilter, CallTypeFilter, DurationWindow, ThreadFilter};
use crate::domain::{parse_category, ChainScope, Micros, UsageError};
use crate::source::TraceRequest;
use chainscope_common::Category;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "chainscope",
    version,
    about = "Reconstruct and aggregate kernel function call chains",
    after_help = "\
EXAMPLES:
    chainscope trace.json -s funcs.json                   Call trees of the latest receive chain
    chainscope trace.json --all -f tcp --call-type call   Filtered call trees of every chain
    chainscope trace.json --all --graph                   Aggregated call graph
    chainscope trace.json --all --graph --chain 3         Graph of the third chain only
    chainscope trace.json --all --graph --max-duration 50 --export graph.json"
)]
pub struct Args {
    /// Trace file as served by the tracer (`[receiveChains, sendChains]`)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Function table (JSON object keyed by decimal address)
    #[arg(short, long, value_name = "FILE")]
    pub symbols: Option<PathBuf>,

    /// Path to inspect
    #[arg(short, long, default_value = "receive", value_parser = parse_category)]
    pub category: Category,

    /// Case-insensitive text matched against function names and addresses
    #[arg(short, long, default_value = "")]
    pub filter: String,

    /// Keep only calls or only returns
    #[arg(long, default_value = "all", value_name = "all|call|return")]
    pub call_type: CallTypeFilter,

    /// Keep only records of one thread
    #[arg(long, default_value = "all", value_name = "TID")]
    pub thread: ThreadFilter,

    /// Print the thread ids present on the selected path and exit
    #[arg(long)]
    pub list_threads: bool,

    /// Show the aggregated call graph instead of call trees
    #[arg(long)]
    pub graph: bool,

    /// Restrict the graph to one chain (1-based)
    #[arg(long, requires = "graph")]
    pub chain: Option<usize>,

    /// Lower bound on average duration in µs
    #[arg(long, requires = "graph", value_name = "US")]
    pub min_duration: Option<Micros>,

    /// Upper bound on average duration in µs
    #[arg(long, requires = "graph", value_name = "US")]
    pub max_duration: Option<Micros>,

    /// Number of most recent chains to load
    #[arg(short = 'n', long, default_value = "1", conflicts_with = "all")]
    pub samples: u32,

    /// Load every chain the trace holds
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Export engine output as JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Connection the trace was captured for
#[derive(clap::Args, Debug)]
#[command(next_help_heading = "Connection")]
pub struct ConnectionArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub srcip: String,

    #[arg(long, default_value = "0.0.0.0")]
    pub dstip: String,

    #[arg(long, default_value = "0")]
    pub srcport: u16,

    #[arg(long, default_value = "0")]
    pub dstport: u16,
}

impl Args {
    #[must_use]
    pub fn request(&self) -> TraceRequest {
        let c = &self.connection;
        let request = TraceRequest::new(&c.srcip, &c.dstip, c.srcport, c.dstport);
        if self.all {
            request.all_history()
        } else {
            request.with_sample_count(self.samples)
        }
    }

    #[must_use]
    pub fn filter(&self) -> CallFilter {
        CallFilter::new(self.filter.clone(), self.call_type, self.thread.clone())
    }

    /// `--chain` if given, otherwise the request's default
    #[must_use]
    pub fn scope(&self, request: &TraceRequest) -> ChainScope {
        match self.chain {
            Some(n) => ChainScope::Single(n.saturating_sub(1)),
            None => request.default_scope(),
        }
    }

    #[must_use]
    pub fn wants_window(&self) -> bool {
        self.min_duration.is_some() || self.max_duration.is_some()
    }

    /// Window from `--min-duration/--max-duration`; a missing bound stays open
    ///
    /// # Errors
    /// Returns [`UsageError::ReversedWindow`] when the minimum exceeds the maximum.
    pub fn window(&self) -> Result<Option<DurationWindow>, UsageError> {
        if let (Some(min), Some(max)) = (self.min_duration, self.max_duration) {
            if min.0 > max.0 {
                return Err(UsageError::ReversedWindow { min, max });
            }
        }
        let (min, max) = (self.min_duration.map(|d| d.0), self.max_duration.map(|d| d.0));
        Ok(self.wants_window().then(|| DurationWindow::bounded(min, max)))
    }
}
