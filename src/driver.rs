//! Partition driver (spec.md §4.7): the outer loop that repeatedly pops the
//! highest-support split branch, splits its block, and rebuilds trees for the
//! resulting blocks and their contextual neighborhood.
//!
//! Ported from `stCaf_buildTreesToRemoveAncientHomologies` in
//! `original_source/caf/impl/phylogeny.c`. The initial per-block tree-building pass is
//! independent across blocks and is parallelized with `rayon`, matching the original's
//! OpenMP-parallel first pass; the main loop is inherently sequential (each split
//! depends on the last) and is not parallelized, matching the original.

use std::collections::{HashMap, HashSet};
use std::fs::File;

use rayon::prelude::*;

use crate::config::Config;
use crate::diagnostics::{self, Diagnostics};
use crate::error::Result;
use crate::event::EventTree;
use crate::feature;
use crate::gene_tree::{GeneNodeId, GeneTree};
use crate::phylo::join_cost::{self, JoinCosts};
use crate::pinch::{BlockId, PinchGraph, ThreadId};
use crate::scorer::{self, BlockTree};
use crate::species_tree::SpeciesTree;
use crate::split_branch::{self, SplitBranchCandidate};
use crate::split_set::SplitBranchSet;
use crate::tree_builder;

fn eligible(graph: &PinchGraph, events: &EventTree, config: &Config, block: BlockId) -> bool {
    if tree_builder::has_simple_phylogeny(graph, events, block) {
        return false;
    }
    if config.skip_single_copy_blocks && tree_builder::is_single_copy_block(graph, events, block) {
        return false;
    }
    true
}

fn build_block(
    graph: &PinchGraph,
    events: &EventTree,
    species_tree: &SpeciesTree,
    join_costs: &JoinCosts,
    thread_strings: &HashMap<ThreadId, String>,
    config: &Config,
    block: BlockId,
) -> Result<BlockTree> {
    let context_blocks = feature::contextual_feature_blocks(
        graph,
        block,
        config.max_base_distance,
        config.max_block_distance,
        config.ignore_unaligned_bases,
    );
    let columns = feature::feature_columns(graph, thread_strings, block, &context_blocks);
    let leaf_species = tree_builder::leaf_species_map(graph, species_tree, block)?;
    let outgroups = tree_builder::outgroup_indices(graph, events, block);
    let mut rng = rand::thread_rng();
    scorer::build_and_score_block(
        graph,
        species_tree,
        join_costs,
        config,
        block,
        &context_blocks,
        &columns,
        &leaf_species,
        &outgroups,
        &mut rng,
    )
}

fn collect_leaves_below(tree: &GeneTree, node: GeneNodeId, out: &mut Vec<usize>) {
    if tree.is_leaf(node) {
        if let Some(idx) = tree.get(node).matrix_index {
            out.push(idx);
        }
        return;
    }
    for &child in &tree.get(node).children.clone() {
        collect_leaves_below(tree, child, out);
    }
}

/// Runs the full partition process in place on `graph`, returning summary diagnostics.
pub fn run(
    graph: &mut PinchGraph,
    events: &EventTree,
    sequences: &HashMap<ThreadId, String>,
    config: &Config,
) -> Result<Diagnostics> {
    config.validate()?;

    let species_tree = SpeciesTree::from_event_tree(events)?;
    let split_points: HashSet<usize> = species_tree.split_points(events)?.into_iter().collect();
    let node_ids = species_tree.node_ids()?;
    let (cost_per_dup, cost_per_loss) = config.join_cost_scale();
    let join_costs = join_cost::compute_join_costs(&species_tree.tree, &node_ids, cost_per_dup, cost_per_loss)?;
    let thread_strings = feature::build_thread_strings(graph, sequences);

    let mut diagnostics = Diagnostics::new();
    diagnostics.bases_between_single_degree_before = diagnostics::bases_between_single_degree_blocks(graph);

    let mut debug_file: Option<File> = match &config.debug_file {
        Some(path) => Some(File::create(path)?),
        None => None,
    };

    let graph_ref: &PinchGraph = graph;
    let initial_blocks: Vec<BlockId> =
        graph_ref.blocks().filter(|&b| eligible(graph_ref, events, config, b)).collect();

    let built: Vec<Result<(BlockId, BlockTree)>> = initial_blocks
        .par_iter()
        .map(|&block| {
            build_block(graph_ref, events, &species_tree, &join_costs, &thread_strings, config, block)
                .map(|tree| (block, tree))
        })
        .collect();

    let mut block_to_tree: HashMap<BlockId, BlockTree> = HashMap::new();
    let mut split_set = SplitBranchSet::new();
    for result in built {
        let (block, block_tree) = result?;
        let candidates = split_branch::enumerate_split_branches(&block_tree.tree, block, &split_points);
        split_set.extend(candidates);
        block_to_tree.insert(block, block_tree);
    }
    diagnostics.initial_split_branch_count = split_set.len();

    while let Some(candidate) = split_set.peek_last().cloned() {
        rebuild_around_split(
            graph,
            events,
            &species_tree,
            &join_costs,
            &thread_strings,
            config,
            &split_points,
            &mut block_to_tree,
            &mut split_set,
            &candidate,
            debug_file.as_mut(),
        )?;
        diagnostics.splits_made += 1;
    }

    diagnostics.final_split_branch_count = split_set.len();
    diagnostics.bases_between_single_degree_after = diagnostics::bases_between_single_degree_blocks(graph);
    Ok(diagnostics)
}

#[allow(clippy::too_many_arguments)]
fn rebuild_around_split(
    graph: &mut PinchGraph,
    events: &EventTree,
    species_tree: &SpeciesTree,
    join_costs: &JoinCosts,
    thread_strings: &HashMap<ThreadId, String>,
    config: &Config,
    split_points: &HashSet<usize>,
    block_to_tree: &mut HashMap<BlockId, BlockTree>,
    split_set: &mut SplitBranchSet,
    candidate: &SplitBranchCandidate,
    mut debug_file: Option<&mut File>,
) -> Result<()> {
    let block = candidate.block;
    let Some(block_tree) = block_to_tree.get(&block) else {
        split_set.remove_block(block);
        return Ok(());
    };

    let mut leaves_below = Vec::new();
    collect_leaves_below(&block_tree.tree, candidate.child, &mut leaves_below);
    let below: HashSet<usize> = leaves_below.iter().copied().collect();
    let degree = graph.block(block).degree();
    let leaves_above: Vec<usize> = (0..degree).filter(|i| !below.contains(i)).collect();

    let anchor_below_segment = graph.block(block).segments[leaves_below[0]];
    let anchor_above_segment = leaves_above.first().map(|&i| graph.block(block).segments[i]);

    split_set.remove_block(block);
    block_to_tree.remove(&block);

    if leaves_above.is_empty() {
        return Ok(());
    }

    let partition = vec![leaves_below, leaves_above];
    graph.split_block(block, &partition, config.allow_single_degree_blocks);

    let block_below = graph.segment(anchor_below_segment).block;
    let block_above = anchor_above_segment.and_then(|s| graph.segment(s).block);

    let mut neighborhood: HashSet<BlockId> = HashSet::new();
    for maybe in [block_below, block_above].into_iter().flatten() {
        neighborhood.insert(maybe);
        crate::context::add_contextual_blocks(
            graph,
            maybe,
            config.max_base_distance,
            config.max_block_distance,
            config.ignore_unaligned_bases,
            &mut neighborhood,
        );
    }

    for &b in &neighborhood {
        split_set.remove_block(b);
        block_to_tree.remove(&b);
        if !eligible(graph, events, config, b) {
            continue;
        }
        let block_tree = build_block(graph, events, species_tree, join_costs, thread_strings, config, b)?;
        let candidates = split_branch::enumerate_split_branches(&block_tree.tree, b, split_points);
        split_set.extend(candidates);
        if let Some(file) = debug_file.as_deref_mut() {
            diagnostics::write_block_debug_record(
                file,
                graph,
                events,
                b,
                &block_tree.tree,
                &block_tree.distance,
                block_tree.score,
            )?;
        }
        block_to_tree.insert(b, block_tree);
    }

    Ok(())
}
