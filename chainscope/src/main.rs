//! # chainscope - Main Entry Point
//!
//! Loads a saved trace and function table, then prints either the per-chain
//! call trees of one path or the aggregated call graph.

use anyhow::{Context, Result};
use chainscope::analysis::thread_ids;
use chainscope::cli::Args;
use chainscope::domain::{ChainScope, FetchError, UsageError};
use chainscope::export::JsonExporter;
use chainscope::report::{write_graph, write_inspector};
use chainscope::session::Session;
use chainscope::source::{FileTraceSource, TraceSource};
use clap::Parser;
use log::{info, warn};
use std::io::{self, BufWriter, Write};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<UsageError>().is_some() {
        return EXIT_USAGE;
    }
    match err.downcast_ref::<FetchError>() {
        Some(FetchError::MissingParameter(_) | FetchError::InvalidSampleCount(_)) => EXIT_USAGE,
        _ => EXIT_ERROR,
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let window = args.window()?;

    let mut source = FileTraceSource::new(&args.trace);
    if let Some(symbols) = &args.symbols {
        source = source.with_symbols(symbols);
    }

    let request = args.request();
    let trace = source
        .fetch(&request)
        .with_context(|| format!("Failed to load trace {}", args.trace.display()))?;
    let symbols = source.symbol_table().context("Failed to load function table")?;
    info!("Function table holds {} entries", symbols.len());

    if trace.is_empty() && !args.quiet {
        eprintln!("warning: trace holds no chains");
    }

    let mut session = Session::new(trace, symbols);
    let range = session.duration_range();
    let mut exporter = JsonExporter::new();
    exporter.set_duration_range(range);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.list_threads {
        let processed = session.processed(args.category);
        for tid in thread_ids(&processed) {
            writeln!(out, "{tid}")?;
        }
        out.flush()?;
        return Ok(());
    }

    if args.graph {
        let scope = args.scope(&request);
        if let ChainScope::Single(index) = scope {
            let available = session.trace().receive.len().max(session.trace().send.len());
            if index >= available {
                warn!("Chain #{} is out of range ({available} chains loaded)", index + 1);
            }
        }
        if !args.quiet {
            eprintln!("duration range: {range}");
        }

        let graph = session.graph(scope, window);
        write_graph(&mut out, &graph)?;
        exporter.set_graph(graph);
    } else {
        let view = session.inspector(args.category, &args.filter());
        write_inspector(&mut out, args.category, &view)?;
        exporter.add_inspector(args.category, view);
    }
    out.flush()?;

    if let Some(path) = &args.export {
        exporter
            .export_to_path(path)
            .with_context(|| format!("Failed to export to {}", path.display()))?;
        if !args.quiet {
            eprintln!("export: {}", path.display());
        }
    }

    let counters = session.counters();
    info!("Cache: {} hits, {} misses", counters.hits, counters.misses);
    Ok(())
}
