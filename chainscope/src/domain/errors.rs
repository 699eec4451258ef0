//! Structured error types for chainscope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Engine stages themselves never fail; errors only come from wire parsing,
//! trace sources and export.

use super::Micros;
use chainscope_common::{Category, EVENT_FIELD_COUNT};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Trace must be a [receive, send] pair of chain lists: {0}")]
    InvalidShape(String),

    #[error("Chain {chain} of the {category} direction is not an array")]
    InvalidChain { category: Category, chain: usize },

    #[error(
        "Event {index} of {category} chain {chain} has {found} fields, expected {expected}",
        expected = EVENT_FIELD_COUNT
    )]
    WrongFieldCount { category: Category, chain: usize, index: usize, found: usize },

    #[error("Event {index} of {category} chain {chain} has an invalid {field}")]
    InvalidField { category: Category, chain: usize, index: usize, field: &'static str },

    #[error("Symbol table must be an object keyed by function address")]
    InvalidSymbolTable,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Missing required query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Sample count {0} is out of range (1..={max})", max = chainscope_common::MAX_SAMPLE_COUNT)]
    InvalidSampleCount(u32),

    #[error("Failed to fetch trace data: {0}")]
    Unavailable(String),

    #[error("Failed to fetch function table: {0}")]
    SymbolsUnavailable(String),

    #[error("Trace payload rejected: {0}")]
    InvalidPayload(#[from] TraceError),
}

/// Argument combinations clap cannot reject on its own
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("--min-duration {min} is greater than --max-duration {max}")]
    ReversedWindow { min: Micros, max: Micros },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_count_error_display() {
        let err = TraceError::WrongFieldCount {
            category: Category::Send,
            chain: 2,
            index: 5,
            found: 3,
        };
        assert_eq!(err.to_string(), "Event 5 of send chain 2 has 3 fields, expected 4");
    }

    #[test]
    fn test_fetch_error_wraps_payload_error() {
        let err: FetchError = TraceError::InvalidSymbolTable.into();
        assert!(err.to_string().starts_with("Trace payload rejected"));
        assert!(FetchError::MissingParameter("srcip").to_string().contains("srcip"));
    }

    #[test]
    fn test_reversed_window_display() {
        let err = UsageError::ReversedWindow { min: Micros(100.0), max: Micros(50.0) };
        assert_eq!(err.to_string(), "--min-duration 100.0μs is greater than --max-duration 50.0μs");
    }
}
