//! Minimal pinch graph: threads tiled by segments, segments grouped into blocks.
//!
//! The real pinch graph (flower/cactus's `stPinchThreadSet`) is an external collaborator
//! this crate doesn't have access to; this module is a small, functionally complete
//! stand-in so the partition engine has real data to operate on. Segments fully tile
//! each thread in position order — including "gap" segments belonging to no block, which
//! represent unaligned bases — and a segment's 5'/3' neighbours are simply the previous/
//! next segment on its thread.

use std::collections::HashMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

#[derive(Clone, Debug)]
pub struct Segment {
    pub thread: ThreadId,
    /// 0-based start position of this segment on its thread.
    pub start: u64,
    pub length: u64,
    pub block: Option<BlockId>,
    /// Segment is reverse-complemented relative to the block's other segments.
    pub reversed: bool,
}

#[derive(Clone, Debug)]
pub struct Thread {
    pub name: i64,
    pub event: i64,
    /// Segments in position order; together they tile the whole thread.
    pub segments: Vec<SegmentId>,
}

#[derive(Clone, Debug, Default)]
pub struct Block {
    /// Segments in stable construction order — this order is the matrix-index order
    /// used throughout tree building and scoring.
    pub segments: Vec<SegmentId>,
}

impl Block {
    pub fn degree(&self) -> usize {
        self.segments.len()
    }
}

#[derive(Clone, Debug, Default)]
pub struct PinchGraph {
    threads: Vec<Thread>,
    segments: Vec<Segment>,
    blocks: Vec<Block>,
    thread_index: HashMap<i64, ThreadId>,
}

impl PinchGraph {
    pub fn new() -> Self {
        PinchGraph::default()
    }

    pub fn add_thread(&mut self, name: i64, event: i64, length: u64) -> ThreadId {
        let id = ThreadId(self.threads.len());
        self.thread_index.insert(name, id);
        let segment = self.add_segment(id, 0, length, None, false);
        self.threads.push(Thread { name, event, segments: vec![segment] });
        id
    }

    fn add_segment(
        &mut self,
        thread: ThreadId,
        start: u64,
        length: u64,
        block: Option<BlockId>,
        reversed: bool,
    ) -> SegmentId {
        let id = SegmentId(self.segments.len());
        self.segments.push(Segment { thread, start, length, block, reversed });
        id
    }

    pub fn thread(&self, id: ThreadId) -> &Thread {
        &self.threads[id.0]
    }

    pub fn thread_by_name(&self, name: i64) -> Option<ThreadId> {
        self.thread_index.get(&name).copied()
    }

    pub fn threads(&self) -> impl Iterator<Item = ThreadId> {
        (0..self.threads.len()).map(ThreadId)
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    /// Every live block: ids whose segment list is non-empty. A block destructed by
    /// `split_block` keeps its slot in the arena (so earlier `BlockId`s stay valid) but
    /// is left with no segments, and is excluded here.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId).filter(move |&id| !self.blocks[id.0].segments.is_empty())
    }

    /// Splits the segment containing `thread[at..]` so that a new segment boundary
    /// starts exactly at `at`. No-op if a boundary already exists there. Returns the
    /// segment that now starts at `at`.
    pub fn split_segment_at(&mut self, thread: ThreadId, at: u64) -> SegmentId {
        let segs = self.threads[thread.0].segments.clone();
        let pos = segs
            .iter()
            .position(|&s| {
                let seg = &self.segments[s.0];
                seg.start <= at && at < seg.start + seg.length
            })
            .expect("position must fall within the thread");
        let seg_id = segs[pos];
        let seg = self.segments[seg_id.0].clone();
        if seg.start == at {
            return seg_id;
        }
        let left_len = at - seg.start;
        let right_len = seg.length - left_len;
        self.segments[seg_id.0].length = left_len;
        let right = self.add_segment(thread, at, right_len, seg.block, seg.reversed);
        self.threads[thread.0].segments.insert(pos + 1, right);
        right
    }

    /// Constructs a new block out of two segments not currently in any block — the
    /// two-argument "construct" half of the pinch contract.
    pub fn construct_block(&mut self, a: SegmentId, b: SegmentId) -> BlockId {
        let block_id = BlockId(self.blocks.len());
        self.blocks.push(Block { segments: vec![a, b] });
        self.segments[a.0].block = Some(block_id);
        self.segments[b.0].block = Some(block_id);
        block_id
    }

    /// Pinches a free segment into an existing block.
    pub fn pinch_into(&mut self, block: BlockId, segment: SegmentId) {
        self.blocks[block.0].segments.push(segment);
        self.segments[segment.0].block = Some(block);
    }

    /// Splits a block according to a partition of its segment indices. A partition with
    /// a single part is a no-op (nothing to split). Each remaining part with fewer than
    /// two segments is discarded rather than kept as a degenerate one-segment block,
    /// unless `keep_singletons` is set (used only by tests exercising the raw contract).
    pub fn split_block(
        &mut self,
        block: BlockId,
        partition: &[Vec<usize>],
        keep_singletons: bool,
    ) -> Vec<BlockId> {
        if partition.len() <= 1 {
            return vec![block];
        }
        let segments = self.blocks[block.0].segments.clone();
        // Destruct the old block first (mirrors `stPinchBlock_destruct` in the
        // original): every surviving partition below gets a brand new block id, none
        // of them reuse `block`'s slot, so there is no risk of a stale segment list
        // lingering on an id a caller might still be holding.
        self.blocks[block.0].segments.clear();
        let mut new_blocks = Vec::new();
        for part in partition.iter() {
            if part.len() < 2 && !keep_singletons {
                for &idx in part {
                    self.segments[segments[idx].0].block = None;
                }
                continue;
            }
            let part_segments: Vec<SegmentId> = part.iter().map(|&idx| segments[idx]).collect();
            let new_id = BlockId(self.blocks.len());
            self.blocks.push(Block { segments: part_segments.clone() });
            for &s in &part_segments {
                self.segments[s.0].block = Some(new_id);
            }
            new_blocks.push(new_id);
        }
        new_blocks
    }

    /// 3' neighbour of `segment` on its own thread, regardless of block membership.
    pub fn next_segment(&self, segment: SegmentId) -> Option<SegmentId> {
        let seg = &self.segments[segment.0];
        let segs = &self.threads[seg.thread.0].segments;
        let pos = segs.iter().position(|&s| s == segment)?;
        segs.get(pos + 1).copied()
    }

    pub fn prev_segment(&self, segment: SegmentId) -> Option<SegmentId> {
        let seg = &self.segments[segment.0];
        let segs = &self.threads[seg.thread.0].segments;
        let pos = segs.iter().position(|&s| s == segment)?;
        pos.checked_sub(1).map(|p| segs[p])
    }

    /// True if every segment of `block` has a free (blockless) neighbour on at least
    /// one side, i.e. the block does not abut another block on both sides for any of
    /// its segments. Used by diagnostics as the "single-degree" boundary check.
    pub fn is_single_degree(&self, block: BlockId) -> bool {
        self.blocks[block.0].segments.len() <= 1
    }

    /// Sum of unaligned bases strictly between two blocks that each have degree 1 on
    /// the thread carrying them, for every thread shared between the two blocks —
    /// ported from `countBasesBetweenSingleDegreeBlocks`.
    pub fn count_bases_between_single_degree_blocks(&self, a: BlockId, b: BlockId) -> u64 {
        let mut total = 0u64;
        for &seg_a in &self.blocks[a.0].segments {
            let thread = self.segments[seg_a.0].thread;
            for &seg_b in &self.blocks[b.0].segments {
                if self.segments[seg_b.0].thread != thread {
                    continue;
                }
                let (start, end) = if self.segments[seg_a.0].start <= self.segments[seg_b.0].start
                {
                    (seg_a, seg_b)
                } else {
                    (seg_b, seg_a)
                };
                let mut cursor = start;
                let mut bases = 0u64;
                while let Some(next) = self.next_segment(cursor) {
                    if next == end {
                        total += bases;
                        break;
                    }
                    if self.segments[next.0].block.is_some() {
                        break;
                    }
                    bases += self.segments[next.0].length;
                    cursor = next;
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_thread_graph() -> (PinchGraph, ThreadId, ThreadId) {
        let mut g = PinchGraph::new();
        let t1 = g.add_thread(1, 10, 100);
        let t2 = g.add_thread(2, 11, 100);
        (g, t1, t2)
    }

    #[test]
    fn splitting_at_existing_boundary_is_a_noop() {
        let (mut g, t1, _) = two_thread_graph();
        let first = g.thread(t1).segments[0];
        let again = g.split_segment_at(t1, 0);
        assert_eq!(first, again);
    }

    #[test]
    fn split_segment_creates_two_pieces() {
        let (mut g, t1, _) = two_thread_graph();
        let right = g.split_segment_at(t1, 40);
        assert_eq!(g.thread(t1).segments.len(), 2);
        let seg = g.segment(right);
        assert_eq!(seg.start, 40);
        assert_eq!(seg.length, 60);
    }

    #[test]
    fn construct_then_pinch_grows_block_degree() {
        let (mut g, t1, t2) = two_thread_graph();
        let s1 = g.thread(t1).segments[0];
        let s2 = g.thread(t2).segments[0];
        let block = g.construct_block(s1, s2);
        assert_eq!(g.block(block).degree(), 2);

        let t3 = g.add_thread(3, 12, 50);
        let s3 = g.thread(t3).segments[0];
        g.pinch_into(block, s3);
        assert_eq!(g.block(block).degree(), 3);
    }

    #[test]
    fn split_block_single_partition_is_noop() {
        let (mut g, t1, t2) = two_thread_graph();
        let s1 = g.thread(t1).segments[0];
        let s2 = g.thread(t2).segments[0];
        let block = g.construct_block(s1, s2);
        let result = g.split_block(block, &[vec![0, 1]], false);
        assert_eq!(result, vec![block]);
        assert_eq!(g.block(block).degree(), 2);
    }

    #[test]
    fn split_block_discards_singleton_parts() {
        let (mut g, t1, t2) = two_thread_graph();
        let s1 = g.thread(t1).segments[0];
        let s2 = g.thread(t2).segments[0];
        let t3 = g.add_thread(3, 12, 50);
        let s3 = g.thread(t3).segments[0];
        let block = g.construct_block(s1, s2);
        g.pinch_into(block, s3);

        let result = g.split_block(block, &[vec![0, 1], vec![2]], false);
        assert_eq!(result.len(), 1);
        assert_eq!(g.block(result[0]).degree(), 2);
        assert!(g.segment(s3).block.is_none());
    }
}
