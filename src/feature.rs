//! Stand-in for the external feature-extraction library: turns a pinch graph plus raw
//! sequence into the thread-strings map, per-block feature columns, and the
//! substitution/breakpoint matrices tree building scores against.

use std::collections::HashMap;

use rand::Rng;

use crate::context::add_contextual_blocks;
use crate::matrix::Matrix;
use crate::pinch::{BlockId, PinchGraph, ThreadId};

/// Builds the thread-strings map once per run: each thread's sequence padded with a
/// leading and trailing `N`, mirroring `stCaf_getThreadStrings`.
pub fn build_thread_strings(
    graph: &PinchGraph,
    sequences: &HashMap<ThreadId, String>,
) -> HashMap<ThreadId, String> {
    graph
        .threads()
        .map(|id| {
            let raw = sequences.get(&id).cloned().unwrap_or_default();
            (id, format!("N{}N", raw))
        })
        .collect()
}

/// The columns of a block plus every block within context radius, keyed by matrix
/// index of the defining block. Each column is the nucleotide seen in each of the
/// block's own segments, aligned in segment order.
pub fn contextual_feature_blocks(
    graph: &PinchGraph,
    block: BlockId,
    max_base_distance: u64,
    max_block_distance: u64,
    ignore_unaligned_bases: bool,
) -> Vec<BlockId> {
    let mut blocks = std::collections::HashSet::new();
    blocks.insert(block);
    add_contextual_blocks(graph, block, max_base_distance, max_block_distance, ignore_unaligned_bases, &mut blocks);
    let mut out: Vec<BlockId> = blocks.into_iter().collect();
    out.sort_by_key(|b| b.0);
    out
}

/// The column contributed by `context_block` to `block`'s matrix: for each of
/// `block`'s segments (in matrix-index order), the base carried by whichever segment
/// of `context_block` shares that segment's thread, or `N` if `context_block` has no
/// segment on that thread. `context_block == block` yields the block's own column.
pub fn column_for_context_block(
    graph: &PinchGraph,
    thread_strings: &HashMap<ThreadId, String>,
    block: BlockId,
    context_block: BlockId,
) -> Vec<u8> {
    graph
        .block(block)
        .segments
        .iter()
        .map(|&seg_id| {
            let thread = graph.segment(seg_id).thread;
            graph
                .block(context_block)
                .segments
                .iter()
                .find(|&&s| graph.segment(s).thread == thread)
                .map(|&s| {
                    let seg = graph.segment(s);
                    let text = thread_strings.get(&thread).map(|s| s.as_str()).unwrap_or("");
                    let pos = (seg.start + 1) as usize;
                    text.as_bytes().get(pos).copied().unwrap_or(b'N')
                })
                .unwrap_or(b'N')
        })
        .collect()
}

/// One feature column per block in `context_blocks` (which should include `block`
/// itself), the input to substitution/breakpoint matrix construction and to
/// nucleotide-likelihood scoring.
pub fn feature_columns(
    graph: &PinchGraph,
    thread_strings: &HashMap<ThreadId, String>,
    block: BlockId,
    context_blocks: &[BlockId],
) -> Vec<Vec<u8>> {
    context_blocks
        .iter()
        .map(|&cb| column_for_context_block(graph, thread_strings, block, cb))
        .collect()
}

/// Draws `n` columns with replacement from `columns`, the bootstrap-resampling step of
/// §4.4 step 1.
pub fn resample_columns<R: Rng>(columns: &[Vec<u8>], rng: &mut R) -> Vec<Vec<u8>> {
    if columns.is_empty() {
        return Vec::new();
    }
    (0..columns.len()).map(|_| columns[rng.gen_range(0..columns.len())].clone()).collect()
}

/// Symmetric off-diagonal matrix of pairwise substitution counts across the supplied
/// columns, one row/column per segment of `block` in matrix-index order.
pub fn substitution_matrix(block_degree: usize, columns: &[Vec<u8>]) -> Matrix {
    let mut m = Matrix::zeros(block_degree, block_degree);
    for column in columns {
        for i in 0..block_degree {
            for j in (i + 1)..block_degree {
                if column.get(i) == column.get(j) && column.get(i).is_some() {
                    m.add_at(i, j, 1.0);
                    m.add_at(j, i, 1.0);
                }
            }
        }
    }
    m
}

/// Breakpoint-distance matrix: counts, per pair of segments, how many contextual
/// feature blocks have both segments' threads present but in different blocks
/// (a proxy for synteny-breakpoint disagreement), scaled by `scaling_factor`.
pub fn breakpoint_matrix(
    graph: &PinchGraph,
    block: BlockId,
    context_blocks: &[BlockId],
    scaling_factor: f64,
) -> Matrix {
    let degree = graph.block(block).degree();
    let mut m = Matrix::zeros(degree, degree);
    let segments = &graph.block(block).segments;
    for &ctx_block in context_blocks {
        if ctx_block == block {
            continue;
        }
        for i in 0..degree {
            let thread_i = graph.segment(segments[i]).thread;
            for j in (i + 1)..degree {
                let thread_j = graph.segment(segments[j]).thread;
                let has_i = graph.block(ctx_block).segments.iter().any(|&s| graph.segment(s).thread == thread_i);
                let has_j = graph.block(ctx_block).segments.iter().any(|&s| graph.segment(s).thread == thread_j);
                if has_i != has_j {
                    m.add_at(i, j, 1.0);
                    m.add_at(j, i, 1.0);
                }
            }
        }
    }
    m.scale(scaling_factor);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn thread_strings_are_padded_with_n() {
        let mut graph = PinchGraph::new();
        let t = graph.add_thread(1, 10, 4);
        let mut sequences = HashMap::new();
        sequences.insert(t, "ACGT".to_string());
        let strings = build_thread_strings(&graph, &sequences);
        assert_eq!(strings[&t], "NACGTN");
    }

    #[test]
    fn substitution_matrix_counts_agreements() {
        let columns = vec![vec![b'A', b'A'], vec![b'A', b'C']];
        let m = substitution_matrix(2, &columns);
        assert_eq!(m.get(0, 1), 1.0);
    }

    #[test]
    fn resampling_preserves_column_count() {
        let columns = vec![vec![b'A'], vec![b'C'], vec![b'G']];
        let mut rng = StepRng::new(0, 1);
        let resampled = resample_columns(&columns, &mut rng);
        assert_eq!(resampled.len(), columns.len());
    }

    #[test]
    fn column_for_block_reads_each_segments_thread() {
        let mut graph = PinchGraph::new();
        let t1 = graph.add_thread(1, 10, 4);
        let t2 = graph.add_thread(2, 11, 4);
        let s1 = graph.thread(t1).segments[0];
        let s2 = graph.thread(t2).segments[0];
        let block = graph.construct_block(s1, s2);
        let mut sequences = HashMap::new();
        sequences.insert(t1, "ACGT".to_string());
        sequences.insert(t2, "ACGT".to_string());
        let strings = build_thread_strings(&graph, &sequences);
        let col = column_for_context_block(&graph, &strings, block, block);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn feature_columns_returns_one_column_per_context_block() {
        let mut graph = PinchGraph::new();
        let t1 = graph.add_thread(1, 10, 4);
        let t2 = graph.add_thread(2, 11, 4);
        let s1 = graph.thread(t1).segments[0];
        let s2 = graph.thread(t2).segments[0];
        let block = graph.construct_block(s1, s2);
        let strings = HashMap::new();
        let columns = feature_columns(&graph, &strings, block, &[block]);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].len(), 2);
    }
}
