//! Call tree reconstruction for the chain inspector.
//!
//! A chain is a flat list of entry/exit events. This module annotates each
//! event with its resolved name and nesting depth ([`CallRecord`]), then folds
//! the records into a forest by stack matching ([`CallTreeNode`]).
//!
//! # Stack Matching
//!
//! ```text
//! CALL   a          a
//! CALL   b          ├── b
//! RETURN b          │   └── RETURN b
//! RETURN a          └── RETURN a
//! RETURN x          RETURN x          (orphan: nothing open, becomes a root)
//! ```
//!
//! A RETURN closes whatever call is on top of the stack; it does not check
//! that the addresses agree. Malformed chains therefore still produce a tree
//! that contains every record exactly once, in temporal order.

use crate::domain::CallType;
use crate::symbolization::SymbolTable;
use chainscope_common::{Chain, Event};
use serde::Serialize;

/// One event annotated for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub timestamp: f64,
    pub is_return: bool,
    pub function_address: u64,
    pub thread_id: i64,
    pub func_name: String,
    pub call_type: CallType,
    /// Number of calls open when this record was processed.
    ///
    /// A RETURN carries the depth of the call it closes.
    pub depth: usize,
    pub chain_index: usize,
    pub call_index: usize,
}

/// Node of a reconstructed call tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallTreeNode {
    pub record: CallRecord,
    pub children: Vec<CallTreeNode>,
}

impl CallTreeNode {
    fn leaf(record: CallRecord) -> Self {
        Self { record, children: Vec::new() }
    }

    /// Number of records in this subtree, including this node
    #[must_use]
    pub fn record_count(&self) -> usize {
        1 + self.children.iter().map(CallTreeNode::record_count).sum::<usize>()
    }

    /// Records of this subtree in pre-order (which is temporal order)
    pub fn walk(&self) -> impl Iterator<Item = &CallRecord> + '_ {
        let mut pending = vec![self];
        std::iter::from_fn(move || {
            let node = pending.pop()?;
            pending.extend(node.children.iter().rev());
            Some(&node.record)
        })
    }
}

/// Annotate one chain with names and depths
#[must_use]
pub fn process_chain(chain: &[Event], chain_index: usize, symbols: &SymbolTable) -> Vec<CallRecord> {
    let mut open_calls = 0usize;

    chain
        .iter()
        .enumerate()
        .map(|(call_index, event)| {
            if event.is_return {
                open_calls = open_calls.saturating_sub(1);
            }
            let depth = open_calls;
            if !event.is_return {
                open_calls += 1;
            }

            CallRecord {
                timestamp: event.timestamp,
                is_return: event.is_return,
                function_address: event.function_address,
                thread_id: event.thread_id,
                func_name: symbols.resolve(event.function_address),
                call_type: CallType::from_is_return(event.is_return),
                depth,
                chain_index,
                call_index,
            }
        })
        .collect()
}

/// Annotate every chain of one direction
#[must_use]
pub fn process_chains(chains: &[Chain], symbols: &SymbolTable) -> Vec<Vec<CallRecord>> {
    chains
        .iter()
        .enumerate()
        .map(|(chain_index, chain)| process_chain(chain, chain_index, symbols))
        .collect()
}

/// Fold records into a forest
///
/// Works on any subsequence of a chain's records, which is how filtered
/// chains are rendered: the tree is rebuilt from the surviving records only.
#[must_use]
pub fn build_call_tree(records: &[CallRecord]) -> Vec<CallTreeNode> {
    let mut roots: Vec<CallTreeNode> = Vec::new();
    // Open calls, innermost last. A node is attached to its parent when it
    // closes, which keeps sibling order temporal.
    let mut open: Vec<CallTreeNode> = Vec::new();

    for record in records {
        match record.call_type {
            CallType::Call => open.push(CallTreeNode::leaf(record.clone())),
            CallType::Return => match open.pop() {
                Some(mut closed) => {
                    closed.children.push(CallTreeNode::leaf(record.clone()));
                    attach(&mut open, &mut roots, closed);
                }
                None => roots.push(CallTreeNode::leaf(record.clone())),
            },
        }
    }

    // Calls still open at the end of the chain keep everything recorded under them.
    while let Some(unclosed) = open.pop() {
        attach(&mut open, &mut roots, unclosed);
    }

    roots
}

fn attach(open: &mut [CallTreeNode], roots: &mut Vec<CallTreeNode>, node: CallTreeNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Total records held by a forest
#[must_use]
pub fn forest_record_count(roots: &[CallTreeNode]) -> usize {
    roots.iter().map(CallTreeNode::record_count).sum()
}
