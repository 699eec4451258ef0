//! Per-chain call forests for the inspector view.
//!
//! Every chain is represented, whether or not it survived filtering, so a
//! renderer can skip hidden chains without re-deriving anything.

use super::call_tree::{build_call_tree, CallRecord, CallTreeNode};
use super::filter::{filter_chains, CallFilter};
use serde::Serialize;

/// One chain as shown by the inspector
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainView {
    pub chain_index: usize,
    /// Thread of the chain's first record
    pub thread_id: Option<i64>,
    pub original_length: usize,
    pub visible_calls: usize,
    /// False when no record of the chain passed the filter
    pub visible: bool,
    /// Forest built from the surviving records only
    pub roots: Vec<CallTreeNode>,
}

/// All chains of one path after filtering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorView {
    pub chains: Vec<ChainView>,
    pub filtered_chains: usize,
    pub total_chains: usize,
    /// Records across all chains before filtering
    pub total_calls: usize,
}

impl InspectorView {
    /// Chains that survived filtering
    pub fn visible(&self) -> impl Iterator<Item = &ChainView> {
        self.chains.iter().filter(|c| c.visible)
    }

    /// Look up a record by its position in the unfiltered chain
    #[must_use]
    pub fn find_call(&self, chain_index: usize, call_index: usize) -> Option<&CallRecord> {
        let chain = self.chains.iter().find(|c| c.chain_index == chain_index)?;
        chain
            .roots
            .iter()
            .flat_map(CallTreeNode::walk)
            .find(|r| r.call_index == call_index)
    }
}

/// Filter the processed chains and build a forest for each survivor
#[must_use]
pub fn build_inspector(processed: &[Vec<CallRecord>], filter: &CallFilter) -> InspectorView {
    let survivors = filter_chains(processed, filter);
    let mut survivors = survivors.into_iter().peekable();

    let chains: Vec<ChainView> = processed
        .iter()
        .enumerate()
        .map(|(chain_index, records)| {
            let thread_id = records.first().map(|r| r.thread_id);
            match survivors.next_if(|s| s.chain_index == chain_index) {
                Some(survivor) => ChainView {
                    chain_index,
                    thread_id,
                    original_length: survivor.original_length,
                    visible_calls: survivor.calls.len(),
                    visible: true,
                    roots: build_call_tree(&survivor.calls),
                },
                None => ChainView {
                    chain_index,
                    thread_id,
                    original_length: records.len(),
                    visible_calls: 0,
                    visible: false,
                    roots: Vec::new(),
                },
            }
        })
        .collect();

    let filtered_chains = chains.iter().filter(|c| c.visible).count();
    InspectorView {
        total_chains: chains.len(),
        total_calls: processed.iter().map(Vec::len).sum(),
        filtered_chains,
        chains,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::call_tree::{forest_record_count, process_chains};
    use crate::analysis::filter::{CallTypeFilter, ThreadFilter};
    use crate::symbolization::SymbolTable;
    use chainscope_common::Event;

    fn processed() -> Vec<Vec<CallRecord>> {
        let chains = vec![
            vec![Event::call(0.0, 1, 10), Event::call(0.1, 2, 10), Event::ret(0.2, 2, 10), Event::ret(0.3, 1, 10)],
            vec![Event::call(1.0, 3, 11), Event::ret(1.1, 3, 11)],
            vec![],
        ];
        process_chains(&chains, &SymbolTable::new())
    }

    #[test]
    fn test_unfiltered_view() {
        let view = build_inspector(&processed(), &CallFilter::unconstrained());
        assert_eq!(view.total_chains, 3);
        // empty chains never survive filtering
        assert_eq!(view.filtered_chains, 2);
        assert_eq!(view.total_calls, 6);
        assert_eq!(forest_record_count(&view.chains[0].roots), 4);
        assert_eq!(view.chains[1].thread_id, Some(11));
        assert!(!view.chains[2].visible);
        assert_eq!(view.chains[2].thread_id, None);
    }

    #[test]
    fn test_hidden_chains_are_annotated() {
        let filter = CallFilter::new("0x3", CallTypeFilter::All, ThreadFilter::All);
        let view = build_inspector(&processed(), &filter);
        assert_eq!(view.filtered_chains, 1);
        assert!(!view.chains[0].visible);
        assert!(view.chains[0].roots.is_empty());
        assert_eq!(view.chains[0].original_length, 4);
        assert!(view.chains[1].visible);
        assert_eq!(view.visible().count(), 1);
    }

    #[test]
    fn test_filtered_forest_uses_survivors_only() {
        let filter = CallFilter::new("", CallTypeFilter::All, "10".parse().unwrap());
        let view = build_inspector(&processed(), &filter);
        assert_eq!(view.chains[0].visible_calls, 4);
        assert_eq!(view.chains[0].roots.len(), 1);

        let calls_only = CallFilter::new("", "call".parse().unwrap(), ThreadFilter::All);
        let view = build_inspector(&processed(), &calls_only);
        // two unclosed calls nest: 1 ⊃ 2
        assert_eq!(view.chains[0].roots.len(), 1);
        assert_eq!(view.chains[0].roots[0].children.len(), 1);
    }

    #[test]
    fn test_find_call() {
        let view = build_inspector(&processed(), &CallFilter::unconstrained());
        let record = view.find_call(0, 2).unwrap();
        assert_eq!(record.function_address, 2);
        assert!(record.is_return);
        assert!(view.find_call(1, 9).is_none());
        assert!(view.find_call(7, 0).is_none());
    }
}
