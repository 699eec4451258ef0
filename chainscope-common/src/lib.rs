//! # Shared Data Structures (Tracer ↔ Analysis)
//!
//! Defines the raw trace model shared between whatever captures function
//! entry/exit events and the userspace analysis engine. Nothing in here
//! interprets events; it only fixes their shape.
//!
//! ## Wire Shape
//!
//! A trace arrives as two collections of chains, one per traversal direction:
//!
//! ```text
//! [ receiveChains, sendChains ]
//!   chain  = [ event, event, ... ]
//!   event  = [ timestampSeconds, isReturn(0|1), functionAddress, threadId ]
//! ```
//!
//! ## Key Types
//!
//! - [`Event`] - One function entry or exit
//! - [`Chain`] - Ordered events of one traced execution path
//! - [`Trace`] - Receive and send chains captured for one connection
//! - [`Category`] - Traversal direction of a chain

use std::fmt;

// ============================================================================
// Contract Constants
// ============================================================================

/// Number of positional fields in a wire event tuple
pub const EVENT_FIELD_COUNT: usize = 4;

/// Conversion factor from event timestamps (seconds) to reported durations (µs)
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Largest history request the tracer service honours
///
/// A sample count of 1 asks for the most recent chain per direction; anything
/// larger asks for historical chains, up to this cap.
pub const MAX_SAMPLE_COUNT: u32 = 20_000;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Traversal direction of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Packet receive path
    Receive,
    /// Packet send path
    Send,
}

impl Category {
    /// Both directions, in the order they appear on the wire
    pub const ALL: [Category; 2] = [Category::Receive, Category::Send];

    /// Lowercase name used in keys and labels
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Receive => "receive",
            Category::Send => "send",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One function entry or exit captured by the tracer
///
/// Replaces the positional `[ts, isReturn, addr, tid]` tuple with named
/// fields. Use the analysis crate's wire parser to build these from JSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Capture time in seconds (fractional)
    pub timestamp: f64,

    /// `false` for a function entry, `true` for a function exit
    pub is_return: bool,

    /// Address of the traced function
    pub function_address: u64,

    /// Thread that executed the function
    pub thread_id: i64,
}

impl Event {
    /// Function entry event
    #[must_use]
    pub fn call(timestamp: f64, function_address: u64, thread_id: i64) -> Self {
        Self { timestamp, is_return: false, function_address, thread_id }
    }

    /// Function exit event
    #[must_use]
    pub fn ret(timestamp: f64, function_address: u64, thread_id: i64) -> Self {
        Self { timestamp, is_return: true, function_address, thread_id }
    }
}

/// Ordered events of one traced execution path
pub type Chain = Vec<Event>;

/// Receive and send chains captured for one connection
///
/// A trace is an immutable snapshot. Analysis never mutates it; every derived
/// view is rebuilt from scratch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub receive: Vec<Chain>,
    pub send: Vec<Chain>,
}

impl Trace {
    #[must_use]
    pub fn new(receive: Vec<Chain>, send: Vec<Chain>) -> Self {
        Self { receive, send }
    }

    /// Chains recorded for one direction
    #[must_use]
    pub fn chains(&self, category: Category) -> &[Chain] {
        match category {
            Category::Receive => &self.receive,
            Category::Send => &self.send,
        }
    }

    /// Total number of events in one direction
    #[must_use]
    pub fn event_count(&self, category: Category) -> usize {
        self.chains(category).iter().map(Vec::len).sum()
    }

    /// True when neither direction holds a single event
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|&c| self.event_count(c) == 0)
    }
}
