//! Record filters for the chain inspector.
//!
//! Three independent predicates narrow the records shown per chain. Every
//! predicate is always spelled out: "no constraint" is the explicit
//! [`CallTypeFilter::All`] / [`ThreadFilter::All`] / empty text, never an
//! omitted field.

use super::call_tree::CallRecord;
use crate::domain::CallType;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Sentinel accepted wherever a predicate can be switched off
pub const ALL_SENTINEL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTypeFilter {
    All,
    Only(CallType),
}

impl FromStr for CallTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ALL_SENTINEL => Ok(CallTypeFilter::All),
            "call" => Ok(CallTypeFilter::Only(CallType::Call)),
            "return" => Ok(CallTypeFilter::Only(CallType::Return)),
            other => Err(format!("unknown call type '{other}' (expected all, call or return)")),
        }
    }
}

impl fmt::Display for CallTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallTypeFilter::All => f.write_str(ALL_SENTINEL),
            CallTypeFilter::Only(call_type) => f.write_str(&call_type.as_str().to_lowercase()),
        }
    }
}

/// Thread constraint, matched against the thread id rendered as a string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThreadFilter {
    All,
    Only(String),
}

impl FromStr for ThreadFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if s == ALL_SENTINEL { ThreadFilter::All } else { ThreadFilter::Only(s.to_string()) })
    }
}

impl fmt::Display for ThreadFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadFilter::All => f.write_str(ALL_SENTINEL),
            ThreadFilter::Only(tid) => f.write_str(tid),
        }
    }
}

/// The full set of record predicates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallFilter {
    /// Case-insensitive match on the name, or substring of the decimal address.
    /// Empty matches everything.
    pub text: String,
    pub call_type: CallTypeFilter,
    pub thread: ThreadFilter,
}

impl CallFilter {
    #[must_use]
    pub fn new(text: impl Into<String>, call_type: CallTypeFilter, thread: ThreadFilter) -> Self {
        Self { text: text.into(), call_type, thread }
    }

    /// Filter that lets every record through
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::new(String::new(), CallTypeFilter::All, ThreadFilter::All)
    }

    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.text.is_empty()
            && self.call_type == CallTypeFilter::All
            && self.thread == ThreadFilter::All
    }

    #[must_use]
    pub fn matches(&self, record: &CallRecord) -> bool {
        if !self.text.is_empty() {
            let needle = self.text.to_lowercase();
            let name_hit = record.func_name.to_lowercase().contains(&needle);
            let address_hit = record.function_address.to_string().contains(&self.text);
            if !name_hit && !address_hit {
                return false;
            }
        }

        if let CallTypeFilter::Only(call_type) = self.call_type {
            if record.call_type != call_type {
                return false;
            }
        }

        if let ThreadFilter::Only(ref tid) = self.thread {
            if record.thread_id.to_string() != *tid {
                return false;
            }
        }

        true
    }
}

/// Surviving records of one chain
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredChain {
    pub chain_index: usize,
    pub calls: Vec<CallRecord>,
    /// Record count before filtering
    pub original_length: usize,
}

/// Apply a filter to every chain, dropping chains with no surviving record
#[must_use]
pub fn filter_chains(processed: &[Vec<CallRecord>], filter: &CallFilter) -> Vec<FilteredChain> {
    processed
        .iter()
        .enumerate()
        .filter_map(|(chain_index, chain)| {
            let calls: Vec<CallRecord> = chain.iter().filter(|r| filter.matches(r)).cloned().collect();
            if calls.is_empty() {
                return None;
            }
            Some(FilteredChain { chain_index, calls, original_length: chain.len() })
        })
        .collect()
}

/// Distinct thread ids across all chains, ascending
#[must_use]
pub fn thread_ids(processed: &[Vec<CallRecord>]) -> Vec<i64> {
    processed
        .iter()
        .flatten()
        .map(|r| r.thread_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
