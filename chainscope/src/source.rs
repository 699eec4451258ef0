//! Trace acquisition
//!
//! The tracer serves recent chains for one connection, selected by its
//! address/port 4-tuple. [`TraceSource`] is the boundary the engine consumes;
//! [`FileTraceSource`] implements it over JSON files saved from the tracer so
//! the engine can run offline.

use crate::domain::{ChainScope, FetchError};
use crate::symbolization::SymbolTable;
use crate::trace_data::parse_trace;
use chainscope_common::{Chain, Trace, MAX_SAMPLE_COUNT};
use log::{debug, info};
use std::fs;
use std::path::PathBuf;

/// Connection selector plus the number of recent chains wanted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRequest {
    pub src_address: String,
    pub dst_address: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub sample_count: u32,
}

impl TraceRequest {
    /// Request for the most recent chain of a connection
    #[must_use]
    pub fn new(
        src_address: impl Into<String>,
        dst_address: impl Into<String>,
        src_port: u16,
        dst_port: u16,
    ) -> Self {
        Self {
            src_address: src_address.into(),
            dst_address: dst_address.into(),
            src_port,
            dst_port,
            sample_count: 1,
        }
    }

    #[must_use]
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Same connection, as much history as the tracer keeps
    #[must_use]
    pub fn all_history(&self) -> Self {
        self.clone().with_sample_count(MAX_SAMPLE_COUNT)
    }

    /// # Errors
    /// Fails when the source address is empty or the sample count is outside
    /// `1..=MAX_SAMPLE_COUNT`.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.src_address.trim().is_empty() {
            return Err(FetchError::MissingParameter("srcip"));
        }
        if self.sample_count == 0 || self.sample_count > MAX_SAMPLE_COUNT {
            return Err(FetchError::InvalidSampleCount(self.sample_count));
        }
        Ok(())
    }

    /// Form encoding expected by the tracer
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("srcip", self.src_address.clone()),
            ("dstip", self.dst_address.clone()),
            ("srcport", self.src_port.to_string()),
            ("dstport", self.dst_port.to_string()),
            ("count", self.sample_count.to_string()),
        ]
    }

    /// Graph scope to start from: a multi-sample request shows all chains
    #[must_use]
    pub fn default_scope(&self) -> ChainScope {
        if self.sample_count > 1 {
            ChainScope::All
        } else {
            ChainScope::Single(0)
        }
    }
}

/// Where traces and the function table come from
pub trait TraceSource {
    /// Fetch the recent chains selected by `request`
    ///
    /// # Errors
    /// Returns a [`FetchError`] if the request is invalid, the source cannot be
    /// reached or the payload is malformed.
    fn fetch(&self, request: &TraceRequest) -> Result<Trace, FetchError>;

    /// Fetch the address → function table
    ///
    /// # Errors
    /// Returns [`FetchError::SymbolsUnavailable`] if the table cannot be read.
    fn symbol_table(&self) -> Result<SymbolTable, FetchError>;
}

/// Trace source backed by JSON files on disk
#[derive(Debug, Clone)]
pub struct FileTraceSource {
    trace_path: PathBuf,
    symbols_path: Option<PathBuf>,
}

impl FileTraceSource {
    #[must_use]
    pub fn new(trace_path: impl Into<PathBuf>) -> Self {
        Self { trace_path: trace_path.into(), symbols_path: None }
    }

    #[must_use]
    pub fn with_symbols(mut self, symbols_path: impl Into<PathBuf>) -> Self {
        self.symbols_path = Some(symbols_path.into());
        self
    }
}

/// The last `count` chains, oldest first
fn most_recent(chains: Vec<Chain>, count: usize) -> Vec<Chain> {
    let skip = chains.len().saturating_sub(count);
    chains.into_iter().skip(skip).collect()
}

impl TraceSource for FileTraceSource {
    fn fetch(&self, request: &TraceRequest) -> Result<Trace, FetchError> {
        request.validate()?;

        let content = fs::read_to_string(&self.trace_path).map_err(|e| {
            FetchError::Unavailable(format!("{}: {e}", self.trace_path.display()))
        })?;
        let trace = parse_trace(&content)?;

        let count = request.sample_count as usize;
        let trace = Trace::new(most_recent(trace.receive, count), most_recent(trace.send, count));
        info!(
            "Loaded {} receive and {} send chains from {}",
            trace.receive.len(),
            trace.send.len(),
            self.trace_path.display()
        );
        Ok(trace)
    }

    fn symbol_table(&self) -> Result<SymbolTable, FetchError> {
        let Some(path) = &self.symbols_path else {
            debug!("No function table configured; names fall back to addresses");
            return Ok(SymbolTable::new());
        };
        let content = fs::read_to_string(path)
            .map_err(|e| FetchError::SymbolsUnavailable(format!("{}: {e}", path.display())))?;
        SymbolTable::from_json_str(&content)
            .map_err(|e| FetchError::SymbolsUnavailable(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRACE: &str = r"[
        [[[0.0, 0, 1, 7], [0.1, 1, 1, 7]],
         [[1.0, 0, 2, 7], [1.1, 1, 2, 7]],
         [[2.0, 0, 3, 7], [2.1, 1, 3, 7]]],
        [[[0.5, 0, 9, 8], [0.6, 1, 9, 8]]]
    ]";

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn request() -> TraceRequest {
        TraceRequest::new("10.0.0.1", "10.0.0.2", 40000, 80)
    }

    #[test]
    fn test_validate() {
        assert!(request().validate().is_ok());
        assert!(matches!(
            TraceRequest::new(" ", "", 0, 0).validate(),
            Err(FetchError::MissingParameter("srcip"))
        ));
        assert!(matches!(
            request().with_sample_count(0).validate(),
            Err(FetchError::InvalidSampleCount(0))
        ));
        assert!(request().all_history().validate().is_ok());
        assert!(request().with_sample_count(MAX_SAMPLE_COUNT + 1).validate().is_err());
    }

    #[test]
    fn test_form_fields() {
        let fields = request().with_sample_count(5).form_fields();
        assert_eq!(
            fields,
            vec![
                ("srcip", "10.0.0.1".to_string()),
                ("dstip", "10.0.0.2".to_string()),
                ("srcport", "40000".to_string()),
                ("dstport", "80".to_string()),
                ("count", "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_scope() {
        assert_eq!(request().default_scope(), ChainScope::Single(0));
        assert_eq!(request().all_history().default_scope(), ChainScope::All);
    }

    #[test]
    fn test_fetch_keeps_most_recent_chains() {
        let file = file_with(TRACE);
        let source = FileTraceSource::new(file.path());

        let trace = source.fetch(&request()).unwrap();
        assert_eq!(trace.receive.len(), 1);
        assert_eq!(trace.receive[0][0].function_address, 3);
        assert_eq!(trace.send.len(), 1);

        let trace = source.fetch(&request().with_sample_count(2)).unwrap();
        assert_eq!(trace.receive.len(), 2);
        assert_eq!(trace.receive[0][0].function_address, 2);

        let trace = source.fetch(&request().all_history()).unwrap();
        assert_eq!(trace.event_count(chainscope_common::Category::Receive), 6);
    }

    #[test]
    fn test_fetch_errors() {
        let source = FileTraceSource::new("/nonexistent/trace.json");
        assert!(matches!(source.fetch(&request()), Err(FetchError::Unavailable(_))));

        let bad = file_with("[[[[0.0, 0, 1]]], []]");
        let source = FileTraceSource::new(bad.path());
        assert!(matches!(source.fetch(&request()), Err(FetchError::InvalidPayload(_))));

        // invalid requests never touch the file
        let missing = TraceRequest::new("", "", 0, 0);
        assert!(matches!(source.fetch(&missing), Err(FetchError::MissingParameter(_))));
    }

    #[test]
    fn test_symbol_table() {
        let trace = file_with(TRACE);
        let source = FileTraceSource::new(trace.path());
        assert!(source.symbol_table().unwrap().is_empty());

        let symbols = file_with(r#"{"1": {"name": "ip_rcv"}}"#);
        let source = source.with_symbols(symbols.path());
        assert_eq!(source.symbol_table().unwrap().resolve(1), "ip_rcv");

        let source = FileTraceSource::new(trace.path()).with_symbols("/nonexistent/funcs.json");
        assert!(matches!(source.symbol_table(), Err(FetchError::SymbolsUnavailable(_))));
    }
}
