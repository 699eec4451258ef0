//! Domain types providing compile-time safety and self-documentation
//!
//! These types keep aggregation keys, scopes and durations from being mixed up
//! with raw integers and floats.

use chainscope_common::Category;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Aggregation identity of a function
///
/// The same address traced on the receive and the send path is two different
/// functions as far as statistics and graph nodes are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionKey {
    pub category: Category,
    pub address: u64,
}

impl FunctionKey {
    #[must_use]
    pub fn new(category: Category, address: u64) -> Self {
        Self { category, address }
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.category, self.address)
    }
}

/// Whether a record is a function entry or exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallType {
    Call,
    Return,
}

impl CallType {
    #[must_use]
    pub fn from_is_return(is_return: bool) -> Self {
        if is_return {
            CallType::Return
        } else {
            CallType::Call
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallType::Call => "CALL",
            CallType::Return => "RETURN",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which chains an aggregation pass covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainScope {
    /// Every chain of every direction
    #[default]
    All,
    /// Only the chain at this index, in each direction
    Single(usize),
}

impl ChainScope {
    /// Whether the chain at `index` takes part in this scope
    #[must_use]
    pub fn includes(self, index: usize) -> bool {
        match self {
            ChainScope::All => true,
            ChainScope::Single(selected) => selected == index,
        }
    }
}

impl fmt::Display for ChainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainScope::All => f.write_str("all chains"),
            ChainScope::Single(index) => write!(f, "chain #{}", index + 1),
        }
    }
}

/// Parse a direction name as accepted on the command line
///
/// # Errors
/// Returns the rejected input when it is neither `receive` nor `send`.
pub fn parse_category(s: &str) -> Result<Category, String> {
    match s.to_ascii_lowercase().as_str() {
        "receive" | "recv" | "rx" => Ok(Category::Receive),
        "send" | "tx" => Ok(Category::Send),
        other => Err(format!("unknown category '{other}' (expected receive or send)")),
    }
}

/// Duration in microseconds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Micros(pub f64);

impl Micros {
    /// Elapsed time between two event timestamps given in seconds
    #[must_use]
    pub fn between(start_seconds: f64, end_seconds: f64) -> Self {
        Micros((end_seconds - start_seconds) * chainscope_common::MICROS_PER_SECOND)
    }

    #[must_use]
    pub fn as_millis(self) -> f64 {
        self.0 / 1_000.0
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000.0 {
            write!(f, "{:.2}ms", self.as_millis())
        } else {
            write!(f, "{:.1}μs", self.0)
        }
    }
}

impl FromStr for Micros {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_end_matches("us").parse().map(Micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_key_display() {
        let key = FunctionKey::new(Category::Receive, 0x10);
        assert_eq!(key.to_string(), "receive_16");
    }

    #[test]
    fn test_function_key_separates_directions() {
        let rx = FunctionKey::new(Category::Receive, 0x10);
        let tx = FunctionKey::new(Category::Send, 0x10);
        assert_ne!(rx, tx);
        assert!(rx < tx);
    }

    #[test]
    fn test_call_type() {
        assert_eq!(CallType::from_is_return(false), CallType::Call);
        assert_eq!(CallType::from_is_return(true).to_string(), "RETURN");
    }

    #[test]
    fn test_chain_scope_includes() {
        assert!(ChainScope::All.includes(7));
        assert!(ChainScope::Single(2).includes(2));
        assert!(!ChainScope::Single(2).includes(3));
        assert_eq!(ChainScope::Single(0).to_string(), "chain #1");
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("Receive"), Ok(Category::Receive));
        assert_eq!(parse_category("send"), Ok(Category::Send));
        assert!(parse_category("sideways").is_err());
    }

    #[test]
    fn test_micros() {
        let d = Micros::between(0.0, 0.25);
        assert!((d.0 - 250_000.0).abs() < 1e-6);
        assert_eq!(Micros(12.34).to_string(), "12.3μs");
        assert_eq!(Micros(1_500.0).to_string(), "1.50ms");
        assert_eq!("42us".parse::<Micros>(), Ok(Micros(42.0)));
    }
}
