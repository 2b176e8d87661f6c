//! Reconciliation likelihood (`RECON_LIKELIHOOD`) and the combined score
//! (`COMBINED_LIKELIHOOD`) that adds it to the nucleotide likelihood.
//!
//! Models each gene-tree edge's duplication/loss count as a Poisson process with rate
//! `dup_rate * branch_length`, per the Open Question decision in `DESIGN.md`. The
//! duplication-rate parameter is hard-coded to `1.0`, preserving the original's
//! `// FIXME: hardcoding dup-rate parameter for now` rather than exposing it as a
//! tunable the rest of this crate's configuration doesn't actually plumb through.

use crate::gene_tree::GeneTree;
use crate::phylo::likelihood::tree_log_likelihood;
use crate::phylo::reconcile::Reconciliation;

pub const HARDCODED_DUP_RATE: f64 = 1.0;

fn log_poisson_pmf(k: u32, rate: f64) -> f64 {
    let rate = rate.max(1e-6);
    k as f64 * rate.ln() - rate - ln_factorial(k)
}

fn ln_factorial(k: u32) -> f64 {
    (1..=k as u64).map(|i| (i as f64).ln()).sum()
}

/// Sums, over every gene-tree edge, the log-Poisson-likelihood of observing a
/// duplication (or not) on that edge at rate `HARDCODED_DUP_RATE * branch_length`.
pub fn reconciliation_log_likelihood(tree: &GeneTree, recon: &Reconciliation) -> f64 {
    let mut total = 0.0;
    for node in tree.ids() {
        let length = tree.get(node).branch_length;
        if length <= 0.0 && tree.get(node).parent.is_none() {
            continue;
        }
        let rate = HARDCODED_DUP_RATE * length;
        let observed = if recon.duplications.contains(&node) { 1 } else { 0 };
        total += log_poisson_pmf(observed, rate);
    }
    total
}

/// `NUCLEOTIDE_LIKELIHOOD + RECON_LIKELIHOOD`, the `COMBINED_LIKELIHOOD` scoring method.
pub fn combined_log_likelihood(tree: &GeneTree, columns: &[Vec<u8>], recon: &Reconciliation) -> f64 {
    tree_log_likelihood(tree, columns) + reconciliation_log_likelihood(tree, recon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn a_tree_with_no_duplications_has_finite_likelihood() {
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        tree.join(a, 0.1, b, 0.1);
        let recon = Reconciliation { duplications: Vec::new(), species_of: HashMap::new() };
        let ll = reconciliation_log_likelihood(&tree, &recon);
        assert!(ll.is_finite());
    }
}
