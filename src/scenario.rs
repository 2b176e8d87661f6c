//! Scenario loader (spec.md §3): reads a JSON description of an event tree, a set of
//! pinch threads, and the blocks already pinched together on them, and builds the
//! in-memory structures the rest of the crate operates on.
//!
//! There is no real upstream pinch-graph/flower file format this crate has access to,
//! so this is a small JSON schema purpose-built for exercising the engine, following
//! the teacher's `serde`-derive style for its own NEXUS/Newick structures in `io.rs`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::event::{EventId, EventTree};
use crate::pinch::{PinchGraph, SegmentId, ThreadId};

#[derive(Deserialize)]
struct RawScenario {
    events: Vec<RawEvent>,
    threads: Vec<RawThread>,
    #[serde(default)]
    blocks: Vec<RawBlock>,
}

#[derive(Deserialize)]
struct RawEvent {
    name: i64,
    header: String,
    branch_length: f64,
    #[serde(default)]
    outgroup: bool,
    parent: Option<i64>,
}

#[derive(Deserialize)]
struct RawThread {
    name: i64,
    event: i64,
    length: u64,
    sequence: Option<String>,
}

#[derive(Deserialize)]
struct RawBlock {
    segments: Vec<RawSegment>,
}

#[derive(Deserialize)]
struct RawSegment {
    thread: i64,
    start: u64,
    length: u64,
}

pub struct LoadedScenario {
    pub graph: PinchGraph,
    pub events: EventTree,
    pub sequences: HashMap<ThreadId, String>,
}

pub fn load_scenario(path: &Path) -> Result<LoadedScenario> {
    let text = std::fs::read_to_string(path)?;
    let raw: RawScenario = serde_json::from_str(&text)?;
    let events = build_event_tree(&raw.events)?;

    let mut graph = PinchGraph::new();
    let mut thread_ids: HashMap<i64, ThreadId> = HashMap::new();
    let mut sequences = HashMap::new();
    for t in &raw.threads {
        let id = graph.add_thread(t.name, t.event, t.length);
        thread_ids.insert(t.name, id);
        if let Some(seq) = &t.sequence {
            sequences.insert(id, seq.clone());
        }
    }

    for block in &raw.blocks {
        let mut segment_ids = Vec::new();
        for seg in &block.segments {
            let thread_id = *thread_ids
                .get(&seg.thread)
                .ok_or_else(|| Error::configuration(format!("scenario block references unknown thread {}", seg.thread)))?;
            segment_ids.push(segment_for(&mut graph, thread_id, seg.start, seg.length));
        }
        if segment_ids.len() < 2 {
            continue;
        }
        let block_id = graph.construct_block(segment_ids[0], segment_ids[1]);
        for &s in &segment_ids[2..] {
            graph.pinch_into(block_id, s);
        }
    }

    Ok(LoadedScenario { graph, events, sequences })
}

fn segment_for(graph: &mut PinchGraph, thread: ThreadId, start: u64, length: u64) -> SegmentId {
    let seg = graph.split_segment_at(thread, start);
    let thread_len: u64 = graph.thread(thread).segments.iter().map(|&s| graph.segment(s).length).sum();
    if start + length < thread_len {
        graph.split_segment_at(thread, start + length);
    }
    seg
}

fn build_event_tree(raw: &[RawEvent]) -> Result<EventTree> {
    let mut children_of: HashMap<Option<i64>, Vec<&RawEvent>> = HashMap::new();
    for e in raw {
        children_of.entry(e.parent).or_default().push(e);
    }
    let root_raw = children_of
        .get(&None)
        .and_then(|v| v.first())
        .ok_or_else(|| Error::configuration("scenario has no root event (an event with no parent)"))?;

    let mut tree = EventTree::new();
    add_event_recursive(root_raw, None, &children_of, &mut tree);
    Ok(tree)
}

fn add_event_recursive(
    event: &RawEvent,
    parent_id: Option<EventId>,
    children_of: &HashMap<Option<i64>, Vec<&RawEvent>>,
    tree: &mut EventTree,
) {
    let id = tree.add_event(event.name, event.header.clone(), event.branch_length, event.outgroup, parent_id);
    if let Some(children) = children_of.get(&Some(event.name)) {
        for child in children {
            add_event_recursive(child, Some(id), children_of, tree);
        }
    }
}
