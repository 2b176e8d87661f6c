//! Contextual-neighborhood tracer: for a block, walks outward along each of its
//! segments' threads in both directions, collecting the blocks found within a base-
//! distance and block-distance budget. Used both to assemble the feature columns a
//! block's tree is built from and to find which other trees need rebuilding after a
//! split.
//!
//! Ported from `addContextualBlocksToSet` in the cactus original, including a quirk
//! that is preserved rather than fixed (see the Design Note on it in `DESIGN.md`): the
//! base-distance counter advances by the length of the *outer* segment we started the
//! walk from, not the length of the segment we just stepped into. Over many steps this
//! makes the effective radius proportional to the starting segment's own length rather
//! than to the bases actually traversed.

use std::collections::HashSet;

use crate::pinch::{BlockId, PinchGraph, SegmentId};

pub fn add_contextual_blocks(
    graph: &PinchGraph,
    block: BlockId,
    max_base_distance: u64,
    max_block_distance: u64,
    ignore_unaligned_bases: bool,
    contextual_blocks: &mut HashSet<BlockId>,
) {
    for &segment in &graph.block(block).segments {
        walk_direction(graph, segment, true, max_base_distance, max_block_distance, ignore_unaligned_bases, contextual_blocks);
        walk_direction(graph, segment, false, max_base_distance, max_block_distance, ignore_unaligned_bases, contextual_blocks);
    }
}

fn walk_direction(
    graph: &PinchGraph,
    segment: SegmentId,
    toward_five_prime: bool,
    max_base_distance: u64,
    max_block_distance: u64,
    ignore_unaligned_bases: bool,
    contextual_blocks: &mut HashSet<BlockId>,
) {
    let outer_length = graph.segment(segment).length;
    let mut cur = if toward_five_prime {
        graph.prev_segment(segment)
    } else {
        graph.next_segment(segment)
    };
    let mut base_distance = outer_length / 2;
    let mut block_distance = 0u64;

    while let Some(cur_segment) = cur {
        if block_distance >= max_block_distance || base_distance >= max_base_distance {
            break;
        }
        match graph.segment(cur_segment).block {
            Some(b) => {
                contextual_blocks.insert(b);
                base_distance += outer_length;
                block_distance += 1;
            }
            None if !ignore_unaligned_bases => {
                base_distance += outer_length;
                block_distance += 1;
            }
            None => {}
        }
        cur = if toward_five_prime {
            graph.prev_segment(cur_segment)
        } else {
            graph.next_segment(cur_segment)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_block_distance_budget() {
        let mut g = PinchGraph::new();
        let t = g.add_thread(1, 10, 1000);
        let seg0 = g.thread(t).segments[0];
        let mut cursor = seg0;
        let mut blocks = Vec::new();
        for at in [100u64, 200, 300, 400, 500] {
            let right = g.split_segment_at(t, at);
            let left = cursor;
            let block = g.construct_block(left, {
                let other_t = g.add_thread(100 + at as i64, 11, 10);
                g.thread(other_t).segments[0]
            });
            blocks.push(block);
            cursor = right;
        }

        let mut found = HashSet::new();
        add_contextual_blocks(&g, blocks[0], 10_000, 2, false, &mut found);
        assert!(found.len() <= 2);
    }

    #[test]
    fn stops_at_base_distance_budget() {
        let mut g = PinchGraph::new();
        let t = g.add_thread(1, 10, 1000);
        let seg0 = g.thread(t).segments[0];
        let right = g.split_segment_at(t, 500);
        let other_t = g.add_thread(2, 11, 10);
        let block = g.construct_block(seg0, g.thread(other_t).segments[0]);
        let other_t2 = g.add_thread(3, 12, 10);
        let far_block = g.construct_block(right, g.thread(other_t2).segments[0]);

        let mut found = HashSet::new();
        add_contextual_blocks(&g, block, 10, 100, false, &mut found);
        assert!(!found.contains(&far_block));
    }
}
