//! Bootstrap-support aggregation: reuses the canonicalized-bipartition machinery the
//! teacher built for tree-vs-tree Robinson-Foulds distance, repurposed here for
//! best-tree-vs-bootstrap-sample comparison. A branch's support is the fraction of
//! bootstrap replicate trees whose bipartition set contains that branch's bipartition.

use std::collections::HashSet;

use crate::bitset::Bitset;
use crate::gene_tree::{GeneNodeId, GeneTree};

/// All non-trivial bipartitions of `tree`, canonicalized so the side without matrix
/// index 0 is always the one stored (mirrors the teacher's canonicalization rule).
pub fn canonical_bipartitions(tree: &GeneTree, num_leaves: usize) -> HashSet<Bitset> {
    let words = num_leaves.div_ceil(64);
    let mut cache: std::collections::HashMap<GeneNodeId, Bitset> = std::collections::HashMap::new();
    let Some(root) = tree.root() else { return HashSet::new() };
    compute_bitsets(tree, root, words, &mut cache);

    let mut full = Bitset::zeros(words);
    for i in 0..num_leaves {
        full.set(i);
    }

    let mut out = HashSet::new();
    for (&node, bitset) in &cache {
        if node == root || bitset.count_ones() <= 1 || bitset.count_ones() >= num_leaves {
            continue;
        }
        out.insert(canonicalize(bitset, &full));
    }
    out
}

fn compute_bitsets(
    tree: &GeneTree,
    node: GeneNodeId,
    words: usize,
    cache: &mut std::collections::HashMap<GeneNodeId, Bitset>,
) -> Bitset {
    if let Some(b) = cache.get(&node) {
        return b.clone();
    }
    let bitset = if tree.is_leaf(node) {
        let idx = tree.get(node).matrix_index.expect("leaf has a matrix index");
        let mut b = Bitset::zeros(words);
        b.set(idx);
        b
    } else {
        let mut b = Bitset::zeros(words);
        for &child in &tree.get(node).children.clone() {
            let child_bits = compute_bitsets(tree, child, words, cache);
            b.or_assign(&child_bits);
        }
        b
    };
    cache.insert(node, bitset.clone());
    bitset
}

fn canonicalize(bitset: &Bitset, full: &Bitset) -> Bitset {
    if bitset.0[0] & 1 == 1 {
        let mut complement = Bitset::zeros(bitset.0.len());
        for (c, (b, f)) in complement.0.iter_mut().zip(bitset.0.iter().zip(&full.0)) {
            *c = f & !b;
        }
        complement
    } else {
        bitset.clone()
    }
}

/// matrix index -> fraction of `samples` that have a leaf with that matrix index,
/// i.e. the support on each pendant edge. Every replicate is built from the same
/// block over resampled columns, so every matrix index is present as a leaf in every
/// well-formed replicate, but this counts it rather than assuming it.
fn leaf_support(samples: &[GeneTree], num_leaves: usize) -> Vec<f64> {
    let mut present = vec![0usize; num_leaves];
    for sample in samples {
        for id in sample.ids() {
            if sample.is_leaf(id) {
                if let Some(idx) = sample.get(id).matrix_index {
                    if idx < num_leaves {
                        present[idx] += 1;
                    }
                }
            }
        }
    }
    let total = samples.len().max(1) as f64;
    present.into_iter().map(|count| count as f64 / total).collect()
}

/// For each branch's bipartition in `best_tree`, the fraction of `samples` that also
/// contain it. Internal branches are matched up by recomputing their own bipartition
/// and looking it up in each sample's bipartition set; pendant (leaf) branches are
/// matched by matrix index instead, since a singleton bipartition carries no
/// topological information beyond "this leaf is present".
pub fn branch_support(
    best_tree: &GeneTree,
    samples: &[GeneTree],
    num_leaves: usize,
) -> std::collections::HashMap<GeneNodeId, f64> {
    let sample_bipartitions: Vec<HashSet<Bitset>> =
        samples.iter().map(|t| canonical_bipartitions(t, num_leaves)).collect();
    let leaf_supports = leaf_support(samples, num_leaves);

    let words = num_leaves.div_ceil(64);
    let mut cache = std::collections::HashMap::new();
    let mut full = Bitset::zeros(words);
    for i in 0..num_leaves {
        full.set(i);
    }
    let Some(root) = best_tree.root() else { return std::collections::HashMap::new() };
    compute_bitsets(best_tree, root, words, &mut cache);

    let mut support = std::collections::HashMap::new();
    for node in best_tree.ids() {
        if node == root {
            continue;
        }
        if best_tree.is_leaf(node) {
            let idx = best_tree.get(node).matrix_index.expect("leaf has a matrix index");
            if let Some(&value) = leaf_supports.get(idx) {
                support.insert(node, value);
            }
            continue;
        }
        let bitset = &cache[&node];
        if bitset.count_ones() <= 1 {
            continue;
        }
        let canon = canonicalize(bitset, &full);
        let count = sample_bipartitions.iter().filter(|s| s.contains(&canon)).count();
        support.insert(node, count as f64 / samples.len().max(1) as f64);
    }
    support
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quartet(swap_last_two: bool) -> GeneTree {
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        let c = tree.new_leaf(2);
        let d = tree.new_leaf(3);
        if swap_last_two {
            let ac = tree.join(a, 0.1, c, 0.1);
            let bd = tree.join(b, 0.1, d, 0.1);
            tree.join(ac, 0.1, bd, 0.1);
        } else {
            let ab = tree.join(a, 0.1, b, 0.1);
            let cd = tree.join(c, 0.1, d, 0.1);
            tree.join(ab, 0.1, cd, 0.1);
        }
        tree
    }

    #[test]
    fn identical_topology_gets_full_support() {
        let best = quartet(false);
        let samples = vec![quartet(false), quartet(false)];
        let support = branch_support(&best, &samples, 4);
        assert!(support.values().any(|&v| v == 1.0));
    }

    #[test]
    fn pendant_branches_get_support_instead_of_the_zero_default() {
        let best = quartet(false);
        let samples = vec![quartet(false), quartet(true)];
        let support = branch_support(&best, &samples, 4);
        let leaves: Vec<GeneNodeId> = best.ids().filter(|&id| best.is_leaf(id)).collect();
        assert_eq!(leaves.len(), 4);
        for leaf in leaves {
            assert_eq!(support[&leaf], 1.0);
        }
    }

    #[test]
    fn conflicting_topology_gets_zero_support() {
        let best = quartet(false);
        let samples = vec![quartet(true), quartet(true)];
        let support = branch_support(&best, &samples, 4);
        assert!(support.values().all(|&v| v == 0.0));
    }
}
