//! Block classifier (spec.md §4.2) and per-block tree construction (spec.md §4.3).
//!
//! Grounded on `hasSimplePhylogeny`, `isSingleCopyBlock`, `buildTree`, and
//! `fudgeZeroBranchLengths` in `original_source/caf/impl/phylogeny.c`.

use std::collections::HashMap;

use rand::Rng;

use crate::config::{Config, RootingMethod, TreeBuildingMethod};
use crate::error::{Error, Result};
use crate::event::EventTree;
use crate::feature;
use crate::gene_tree::{GeneNodeId, GeneTree};
use crate::phylo::guided_nj::guided_neighbor_join;
use crate::phylo::join_cost::JoinCosts;
use crate::phylo::neighbor_join::neighbor_join;
use crate::phylo::reconcile;
use crate::pinch::{BlockId, PinchGraph};
use crate::species_tree::SpeciesTree;

/// True if the block's phylogeny is simple enough to skip entirely: degree <= 2, or
/// every segment comes from the same event, or none of its segments are on an
/// outgroup thread. Ported from `hasSimplePhylogeny`.
pub fn has_simple_phylogeny(graph: &PinchGraph, events: &EventTree, block: BlockId) -> bool {
    let b = graph.block(block);
    if b.degree() <= 2 {
        return true;
    }
    let mut found_outgroup = false;
    let mut found_two_events = false;
    let mut current_event: Option<i64> = None;
    for &seg_id in &b.segments {
        let thread = graph.thread(graph.segment(seg_id).thread);
        if events.get_by_name(thread.event).map(|id| events.get(id).outgroup).unwrap_or(false) {
            found_outgroup = true;
        }
        match current_event {
            None => current_event = Some(thread.event),
            Some(e) if e != thread.event => found_two_events = true,
            _ => {}
        }
    }
    !(found_outgroup && found_two_events)
}

/// True iff every segment's event is unique within the block. Ported from
/// `isSingleCopyBlock`.
pub fn is_single_copy_block(graph: &PinchGraph, events: &EventTree, block: BlockId) -> bool {
    let _ = events;
    let b = graph.block(block);
    let mut seen = std::collections::HashSet::new();
    for &seg_id in &b.segments {
        let event = graph.thread(graph.segment(seg_id).thread).event;
        if !seen.insert(event) {
            return false;
        }
    }
    true
}

/// matrix index -> species-tree node id, for every segment of `block`. Ported from
/// `getLeafToSpecies`.
pub fn leaf_species_map(
    graph: &PinchGraph,
    species_tree: &SpeciesTree,
    block: BlockId,
) -> Result<HashMap<usize, usize>> {
    let mut map = HashMap::new();
    for (i, &seg_id) in graph.block(block).segments.iter().enumerate() {
        let event_name = graph.thread(graph.segment(seg_id).thread).event;
        let species = species_tree
            .node_for_event(event_name)
            .ok_or(Error::MissingSpeciesEvent(event_name))?;
        map.insert(i, species);
    }
    Ok(map)
}

/// Matrix indices of segments on outgroup threads. Ported from `getOutgroupThreads`.
pub fn outgroup_indices(graph: &PinchGraph, events: &EventTree, block: BlockId) -> Vec<usize> {
    graph
        .block(block)
        .segments
        .iter()
        .enumerate()
        .filter_map(|(i, &seg_id)| {
            let thread = graph.thread(graph.segment(seg_id).thread);
            let is_outgroup = events.get_by_name(thread.event).map(|id| events.get(id).outgroup).unwrap_or(false);
            is_outgroup.then_some(i)
        })
        .collect()
}

/// Builds one gene tree for `block` (spec.md §4.3 steps 1-4): substitution + scaled
/// breakpoint matrix -> symmetric distance -> construction per
/// `(config.rooting_method, config.tree_building_method)` -> zero-branch-length
/// fudging. `context_blocks` must include `block` itself.
#[allow(clippy::too_many_arguments)]
pub fn build_tree(
    graph: &PinchGraph,
    species_tree: &SpeciesTree,
    join_costs: &JoinCosts,
    config: &Config,
    block: BlockId,
    context_blocks: &[BlockId],
    columns: &[Vec<u8>],
    leaf_species: &HashMap<usize, usize>,
    outgroups: &[usize],
    bootstrap: bool,
    rng: &mut impl Rng,
) -> Result<GeneTree> {
    let degree = graph.block(block).degree();
    let working_columns = if bootstrap { feature::resample_columns(columns, rng) } else { columns.to_vec() };

    let substitutions = feature::substitution_matrix(degree, &working_columns);
    let breakpoints = feature::breakpoint_matrix(graph, block, context_blocks, config.break_point_scaling_factor);
    let mut combined = substitutions;
    combined.add_assign(&breakpoints);
    let distance = combined.to_symmetric_distance();

    let leaves: Vec<usize> = (0..degree).collect();
    let (cost_per_dup, cost_per_loss) = config.join_cost_scale();

    let mut tree = match (config.rooting_method, config.tree_building_method) {
        (RootingMethod::OutgroupBranch, TreeBuildingMethod::NeighborJoining) => {
            let mut t = neighbor_join(&distance, &leaves);
            if let Some(&first_outgroup) = outgroups.first() {
                if let Some(leaf) = find_leaf(&t, first_outgroup) {
                    t.reroot_above(leaf);
                }
            }
            t
        }
        (RootingMethod::LongestBranch, TreeBuildingMethod::NeighborJoining) => {
            let t = neighbor_join(&distance, &leaves);
            reroot_on_longest_branch(t)
        }
        (RootingMethod::BestRecon, TreeBuildingMethod::NeighborJoining) => {
            let t = neighbor_join(&distance, &leaves);
            let (rerooted, _) =
                reconcile::root_and_reconcile_binary(&t, &species_tree.tree, leaf_species, cost_per_dup, cost_per_loss)?;
            rerooted
        }
        (RootingMethod::BestRecon, TreeBuildingMethod::GuidedNeighborJoining) => {
            let t = guided_neighbor_join(&distance, &leaves, leaf_species, join_costs);
            let (rerooted, _) =
                reconcile::root_and_reconcile_binary(&t, &species_tree.tree, leaf_species, cost_per_dup, cost_per_loss)?;
            rerooted
        }
        (_, TreeBuildingMethod::GuidedNeighborJoining) => {
            return Err(Error::configuration(
                "guided neighbor-joining is only compatible with BEST_RECON rooting",
            ));
        }
    };

    if let Some(root) = tree.root() {
        fudge_zero_branch_lengths(&mut tree, root, 0.02, 1e-4);
    }
    Ok(tree)
}

fn find_leaf(tree: &GeneTree, matrix_index: usize) -> Option<GeneNodeId> {
    tree.ids().find(|&id| tree.get(id).matrix_index == Some(matrix_index))
}

/// Reroots on the branch with the greatest length, the "longest branch" rooting rule.
fn reroot_on_longest_branch(mut tree: GeneTree) -> GeneTree {
    let root = tree.root();
    let candidate = tree
        .ids()
        .filter(|&id| Some(id) != root)
        .max_by(|&a, &b| tree.get(a).branch_length.total_cmp(&tree.get(b).branch_length));
    if let Some(node) = candidate {
        tree.reroot_above(node);
    }
    tree
}

/// Zero-branch-length fudging (spec.md §4.3 step 4), ported from
/// `fudgeZeroBranchLengths`. Recurses first, then redistributes a zero-length sibling
/// branch so sibling-pair distance is preserved.
pub fn fudge_zero_branch_lengths(tree: &mut GeneTree, node: GeneNodeId, fudge_factor: f64, epsilon: f64) {
    let children = tree.get(node).children.clone();
    for &child in &children {
        fudge_zero_branch_lengths(tree, child, fudge_factor, epsilon);
    }
    if let [a, b] = children[..] {
        let la = tree.get(a).branch_length;
        let lb = tree.get(b).branch_length;
        if la == 0.0 && lb == 0.0 {
            tree.get_mut(a).branch_length = epsilon;
            tree.get_mut(b).branch_length = epsilon;
        } else if la == 0.0 {
            tree.get_mut(a).branch_length = fudge_factor * lb;
            tree.get_mut(b).branch_length = (1.0 - fudge_factor) * lb;
        } else if lb == 0.0 {
            tree.get_mut(b).branch_length = fudge_factor * la;
            tree.get_mut(a).branch_length = (1.0 - fudge_factor) * la;
        }
    }
}
