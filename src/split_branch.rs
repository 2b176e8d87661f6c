//! Split-branch enumeration (spec.md §4.5): candidate branches along which a block's
//! gene tree could be cut to remove an ancient homology.
//!
//! Ported from `findSplitBranches` in `original_source/caf/impl/phylogeny.c`: a
//! pre-order walk from the tree's root that, at each non-root node, only descends
//! further (and only emits a candidate) when the node's *parent* reconciles to one of
//! the species-tree split points. The root itself has no parent to check, so it always
//! recurses, but it is never itself emitted as a candidate (a root branch has nothing
//! above it to detach from).

use std::collections::HashSet;

use crate::gene_tree::{GeneNodeId, GeneTree};
use crate::pinch::BlockId;

#[derive(Clone, Debug)]
pub struct SplitBranchCandidate {
    pub block: BlockId,
    /// The node whose branch-above is the candidate split point.
    pub child: GeneNodeId,
    pub support: f64,
}

/// Every split-branch candidate in `tree`, given the species nodes `split_points`
/// allows cutting on.
pub fn enumerate_split_branches(
    tree: &GeneTree,
    block: BlockId,
    split_points: &HashSet<usize>,
) -> Vec<SplitBranchCandidate> {
    let mut out = Vec::new();
    if let Some(root) = tree.root() {
        visit(tree, root, block, split_points, &mut out);
    }
    out
}

fn visit(
    tree: &GeneTree,
    node: GeneNodeId,
    block: BlockId,
    split_points: &HashSet<usize>,
    out: &mut Vec<SplitBranchCandidate>,
) {
    let parent = tree.get(node).parent;
    let should_recurse = match parent {
        None => true,
        Some(p) => match tree.get(p).reconciled_species {
            Some(sp) => split_points.contains(&sp),
            None => false,
        },
    };
    if !should_recurse {
        return;
    }
    if parent.is_some() {
        out.push(SplitBranchCandidate { block, child: node, support: tree.get(node).bootstrap_support });
    }
    for &child in &tree.get(node).children.clone() {
        visit(tree, child, block, split_points, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quartet() -> GeneTree {
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        let c = tree.new_leaf(2);
        let ab = tree.join(a, 0.1, b, 0.1);
        tree.join(ab, 0.1, c, 0.1);
        tree
    }

    #[test]
    fn root_is_never_a_candidate() {
        let tree = quartet();
        let split_points = HashSet::new();
        let candidates = enumerate_split_branches(&tree, BlockId(0), &split_points);
        let root = tree.root().unwrap();
        assert!(!candidates.iter().any(|c| c.child == root));
    }

    #[test]
    fn pruning_stops_recursion_below_a_non_split_point() {
        let mut tree = quartet();
        let root = tree.root().unwrap();
        tree.get_mut(root).reconciled_species = Some(1);
        let split_points: HashSet<usize> = HashSet::new();
        let candidates = enumerate_split_branches(&tree, BlockId(0), &split_points);
        assert!(candidates.is_empty());
    }

    #[test]
    fn a_branch_below_a_split_point_parent_is_emitted() {
        let mut tree = quartet();
        let root = tree.root().unwrap();
        tree.get_mut(root).reconciled_species = Some(7);
        let mut split_points = HashSet::new();
        split_points.insert(7);
        let candidates = enumerate_split_branches(&tree, BlockId(0), &split_points);
        assert_eq!(candidates.len(), tree.get(root).children.len());
    }
}
