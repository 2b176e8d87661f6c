//! Tree scoring and bootstrap support (spec.md §4.4).
//!
//! Builds a canonical tree plus `config.num_trees - 1` bootstrap replicates, scores
//! every one of them by `config.scoring_method`, keeps the best, folds branch support
//! from the full ensemble onto it, and reconciles it one final time. Ported from
//! `buildTreeForBlock`/`scoreTree` in `original_source/caf/impl/phylogeny.c`: the
//! original scores every tree in its `trees` list (the canonical tree included) the
//! same way regardless of which list entry eventually wins, and folds bootstrap
//! support from that same full list — both behaviors are reproduced here rather than
//! special-casing the canonical tree out of either pass.

use std::collections::HashMap;

use rand::Rng;

use crate::config::{Config, ScoringMethod};
use crate::error::Result;
use crate::gene_tree::GeneTree;
use crate::matrix::Matrix;
use crate::phylo::join_cost::JoinCosts;
use crate::phylo::likelihood::tree_log_likelihood;
use crate::phylo::reconcile::{self, Reconciliation};
use crate::phylo::recon_likelihood::{combined_log_likelihood, reconciliation_log_likelihood};
use crate::pinch::{BlockId, PinchGraph};
use crate::species_tree::SpeciesTree;
use crate::tree_builder;

/// The winning tree for a block, plus the matrix it was built from (kept around for
/// `diagnostics`' debug record) and the score it was selected on.
pub struct BlockTree {
    pub tree: GeneTree,
    pub distance: Matrix,
    pub score: f64,
}

fn score_candidate(
    tree: &GeneTree,
    species_tree: &phylotree::tree::Tree,
    leaf_species: &HashMap<usize, usize>,
    columns: &[Vec<u8>],
    config: &Config,
) -> Result<(GeneTree, Reconciliation, f64)> {
    let mut tree = tree.clone();
    let recon = reconcile::reconcile(&mut tree, species_tree, leaf_species)?;
    let score = match config.scoring_method {
        ScoringMethod::ReconCost => {
            let cost = reconcile::reconciliation_cost(
                &tree,
                species_tree,
                &recon,
                config.cost_per_dup_per_base,
                config.cost_per_loss_per_base,
            )?;
            -cost
        }
        ScoringMethod::NucleotideLikelihood => tree_log_likelihood(&tree, columns),
        ScoringMethod::ReconLikelihood => reconciliation_log_likelihood(&tree, &recon),
        ScoringMethod::CombinedLikelihood => combined_log_likelihood(&tree, columns, &recon),
    };
    Ok((tree, recon, score))
}

/// Builds and scores the full tree ensemble for `block`, selecting and returning the
/// best one with bootstrap support and a final reconciliation applied.
#[allow(clippy::too_many_arguments)]
pub fn build_and_score_block(
    graph: &PinchGraph,
    species_tree: &SpeciesTree,
    join_costs: &JoinCosts,
    config: &Config,
    block: BlockId,
    context_blocks: &[BlockId],
    columns: &[Vec<u8>],
    leaf_species: &HashMap<usize, usize>,
    outgroups: &[usize],
    rng: &mut impl Rng,
) -> Result<BlockTree> {
    let degree = graph.block(block).degree();
    let num_trees = config.num_trees.max(1);

    let mut candidates = Vec::with_capacity(num_trees);
    let canonical = tree_builder::build_tree(
        graph, species_tree, join_costs, config, block, context_blocks, columns, leaf_species, outgroups, false, rng,
    )?;
    candidates.push(canonical);
    for _ in 1..num_trees {
        let bootstrap = tree_builder::build_tree(
            graph, species_tree, join_costs, config, block, context_blocks, columns, leaf_species, outgroups, true, rng,
        )?;
        candidates.push(bootstrap);
    }

    let mut scored = Vec::with_capacity(candidates.len());
    for tree in &candidates {
        scored.push(score_candidate(tree, &species_tree.tree, leaf_species, columns, config)?);
    }

    let mut best_index = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, (_, _, score)) in scored.iter().enumerate() {
        if *score > best_score {
            best_score = *score;
            best_index = i;
        }
    }
    // Every candidate scored -inf (e.g. an empty column set): fall back to the
    // canonical tree rather than an arbitrary bootstrap replicate.
    if !best_score.is_finite() {
        best_index = 0;
    }

    let ensemble: Vec<GeneTree> = scored.iter().map(|(t, _, _)| t.clone()).collect();
    let (mut best_tree, _, best_score) = scored.into_iter().nth(best_index).expect("num_trees >= 1");

    let support = crate::phylo::bootstrap::branch_support(&best_tree, &ensemble, degree);
    for (node, value) in support {
        best_tree.get_mut(node).bootstrap_support = value;
    }

    reconcile::reconcile(&mut best_tree, &species_tree.tree, leaf_species)?;

    let substitutions = crate::feature::substitution_matrix(degree, columns);
    let breakpoints = crate::feature::breakpoint_matrix(graph, block, context_blocks, config.break_point_scaling_factor);
    let mut distance = substitutions;
    distance.add_assign(&breakpoints);

    Ok(BlockTree { tree: best_tree, distance, score: best_score })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTree;
    use rand::rngs::mock::StepRng;

    fn quartet_graph() -> (PinchGraph, EventTree, BlockId) {
        let mut graph = PinchGraph::new();
        let mut events = EventTree::new();
        let root = events.add_event(0, "ROOT", 0.0, false, None);
        let anc = events.add_event(1, "anc", 0.0, false, Some(root));
        events.add_event(2, "a", 0.1, false, Some(anc));
        events.add_event(3, "b", 0.1, false, Some(anc));
        events.add_event(4, "c", 0.3, true, Some(root));

        let t1 = graph.add_thread(10, 2, 4);
        let t2 = graph.add_thread(11, 3, 4);
        let t3 = graph.add_thread(12, 4, 4);
        let s1 = graph.thread(t1).segments[0];
        let s2 = graph.thread(t2).segments[0];
        let s3 = graph.thread(t3).segments[0];
        let block = graph.construct_block(s1, s2);
        graph.pinch_into(block, s3);
        (graph, events, block)
    }

    #[test]
    fn selects_and_scores_a_tree_for_a_three_segment_block() {
        let (graph, events, block) = quartet_graph();
        let species_tree = SpeciesTree::from_event_tree(&events).unwrap();
        let leaf_species = tree_builder::leaf_species_map(&graph, &species_tree, block).unwrap();
        let outgroups = tree_builder::outgroup_indices(&graph, &events, block);
        let node_ids = species_tree.node_ids().unwrap();
        let join_costs = crate::phylo::join_cost::compute_join_costs(&species_tree.tree, &node_ids, 1.0, 1.0).unwrap();

        let mut config = Config::default();
        config.num_trees = 4;
        config.tree_building_method = crate::config::TreeBuildingMethod::NeighborJoining;
        config.rooting_method = crate::config::RootingMethod::BestRecon;

        let columns = vec![vec![b'A', b'A', b'C'], vec![b'A', b'C', b'C'], vec![b'G', b'G', b'T']];
        let mut rng = StepRng::new(0, 1);

        let result = build_and_score_block(
            &graph, &species_tree, &join_costs, &config, block, &[block], &columns, &leaf_species, &outgroups, &mut rng,
        )
        .unwrap();

        assert_eq!(result.tree.ids().filter(|&id| result.tree.is_leaf(id)).count(), 3);
        assert!(result.score.is_finite());
    }
}
