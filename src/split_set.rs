//! Split-branch priority set (spec.md §4.6): the pending-work queue the partition
//! driver pops from, always taking the highest-support candidate next.
//!
//! Ported from the `stSortedSet` of `stCaf_SplitBranch`s in
//! `original_source/caf/impl/phylogeny.c`, which orders by support and breaks ties by
//! comparing the branches' own pointers. Rust has no pointer identity to reuse for
//! that, and two candidates can genuinely tie on support — see the Design Note in
//! `DESIGN.md`: ties are instead broken by a monotonic insertion-order counter assigned
//! when a candidate is inserted, which gives a well-defined total order without
//! depending on memory layout.

use std::collections::BTreeSet;

use ordered_float::OrderedFloat;

use crate::pinch::BlockId;
use crate::split_branch::SplitBranchCandidate;

#[derive(Clone, Debug, PartialEq)]
struct SplitBranchEntry {
    candidate: SplitBranchCandidate,
    seq: u64,
}

impl Eq for SplitBranchEntry {}

impl PartialOrd for SplitBranchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitBranchEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        OrderedFloat(self.candidate.support)
            .cmp(&OrderedFloat(other.candidate.support))
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Default)]
pub struct SplitBranchSet {
    entries: BTreeSet<SplitBranchEntry>,
    next_seq: u64,
}

impl SplitBranchSet {
    pub fn new() -> Self {
        SplitBranchSet::default()
    }

    pub fn insert(&mut self, candidate: SplitBranchCandidate) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(SplitBranchEntry { candidate, seq });
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = SplitBranchCandidate>) {
        for candidate in candidates {
            self.insert(candidate);
        }
    }

    /// The highest-support candidate, without removing it.
    pub fn peek_last(&self) -> Option<&SplitBranchCandidate> {
        self.entries.last().map(|e| &e.candidate)
    }

    /// Discards every candidate belonging to `block` (used when a block's tree is
    /// about to be rebuilt or destroyed, invalidating its split branches).
    pub fn remove_block(&mut self, block: BlockId) {
        self.entries.retain(|e| e.candidate.block != block);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene_tree::GeneNodeId;

    fn candidate(block: usize, support: f64) -> SplitBranchCandidate {
        SplitBranchCandidate { block: BlockId(block), child: GeneNodeId(0), support }
    }

    #[test]
    fn peek_returns_highest_support() {
        let mut set = SplitBranchSet::new();
        set.insert(candidate(0, 0.3));
        set.insert(candidate(1, 0.9));
        set.insert(candidate(2, 0.5));
        assert_eq!(set.peek_last().unwrap().block, BlockId(1));
    }

    #[test]
    fn ties_break_by_insertion_order_not_value() {
        let mut set = SplitBranchSet::new();
        set.insert(candidate(0, 0.5));
        set.insert(candidate(1, 0.5));
        // The later-inserted entry with an equal score sorts after the earlier one.
        assert_eq!(set.peek_last().unwrap().block, BlockId(1));
    }

    #[test]
    fn remove_block_drops_only_that_blocks_candidates() {
        let mut set = SplitBranchSet::new();
        set.insert(candidate(0, 0.3));
        set.insert(candidate(1, 0.9));
        set.remove_block(BlockId(1));
        assert_eq!(set.len(), 1);
        assert_eq!(set.peek_last().unwrap().block, BlockId(0));
    }
}
