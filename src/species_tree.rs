//! Adapts the event tree into a `phylotree::tree::Tree` and picks the species nodes at
//! which gene trees get split.
//!
//! Construction goes through Newick rather than poking at `phylotree`'s internals: the
//! event tree is serialized to a Newick string rooted at the synthetic root's single
//! child (matching `eventTreeToStTree` in the cactus original, which skips the event
//! tree's own root) and parsed back with `Tree::from_newick`. Every species node is named
//! with its event's decimal name, so a node can always be recovered by label as well as
//! by `phylotree` node id — see the Design Note on split-point identity in `DESIGN.md`.

use std::collections::HashMap;

use phylotree::tree::Tree;

use crate::event::{EventId, EventTree};

/// A species tree plus the event-name -> phylotree-node-id mapping needed to look a
/// species node back up after round-tripping through Newick.
pub struct SpeciesTree {
    pub tree: Tree,
    name_to_node: HashMap<i64, usize>,
}

impl SpeciesTree {
    pub fn from_event_tree(events: &EventTree) -> Result<Self, phylotree::tree::TreeError> {
        let root = events.root();
        let species_root = events.get(root).children.first().copied().unwrap_or(root);
        let mut newick = String::new();
        write_newick(events, species_root, &mut newick);
        newick.push(';');

        let tree = Tree::from_newick(&newick)?;
        let mut name_to_node = HashMap::new();
        let root = tree.get_root()?;
        collect_names(&tree, root, &mut name_to_node)?;
        Ok(SpeciesTree { tree, name_to_node })
    }

    pub fn node_for_event(&self, event_name: i64) -> Option<usize> {
        self.name_to_node.get(&event_name).copied()
    }

    /// Every node id in the species tree (internal and leaf), the input
    /// `phylo::join_cost::compute_join_costs` needs to build its full cost matrix.
    pub fn node_ids(&self) -> Result<Vec<usize>, phylotree::tree::TreeError> {
        let mut ids = Vec::new();
        let root = self.tree.get_root()?;
        self.collect_ids(root, &mut ids)?;
        Ok(ids)
    }

    fn collect_ids(&self, node_id: usize, ids: &mut Vec<usize>) -> Result<(), phylotree::tree::TreeError> {
        ids.push(node_id);
        let children = self.tree.get(&node_id)?.children.clone();
        for child in children {
            self.collect_ids(child, ids)?;
        }
        Ok(())
    }

    /// Every species node below which both ingroup and outgroup leaves occur — the
    /// nodes `findSplitBranches` is allowed to cut a reconciliation on. Ported from
    /// `getSpeciesToSplitOn` in the cactus original, including its three-valued
    /// child status (0 = ingroups only, 1 = outgroups only, 2 = both).
    pub fn split_points(&self, events: &EventTree) -> Result<Vec<usize>, phylotree::tree::TreeError> {
        let mut split_points = Vec::new();
        let root = self.tree.get_root()?;
        self.classify(root, events, &mut split_points)?;
        Ok(split_points)
    }

    fn classify(
        &self,
        node_id: usize,
        events: &EventTree,
        split_points: &mut Vec<usize>,
    ) -> Result<u8, phylotree::tree::TreeError> {
        let node = self.tree.get(&node_id)?;
        let children = node.children.clone();

        let mut ingroups_below = false;
        let mut outgroups_below = false;
        for child in &children {
            match self.classify(*child, events, split_points)? {
                0 => ingroups_below = true,
                1 => outgroups_below = true,
                _ => {
                    ingroups_below = true;
                    outgroups_below = true;
                }
            }
        }

        if ingroups_below && outgroups_below {
            split_points.push(node_id);
        }

        let node = self.tree.get(&node_id)?;
        let name = node.name.clone().unwrap_or_default();
        let event_name: i64 = name.parse().unwrap_or(-1);
        let is_outgroup = events
            .get_by_name(event_name)
            .map(|id| events.get(id).outgroup)
            .unwrap_or(false);

        if is_outgroup {
            Ok(1)
        } else if ingroups_below && outgroups_below {
            Ok(2)
        } else if outgroups_below {
            Ok(1)
        } else {
            Ok(0)
        }
    }
}

fn collect_names(
    tree: &Tree,
    node_id: usize,
    name_to_node: &mut HashMap<i64, usize>,
) -> Result<(), phylotree::tree::TreeError> {
    let node = tree.get(&node_id)?;
    if let Some(name) = &node.name {
        if let Ok(event_name) = name.parse::<i64>() {
            name_to_node.insert(event_name, node_id);
        }
    }
    let children = node.children.clone();
    for child in children {
        collect_names(tree, child, name_to_node)?;
    }
    Ok(())
}

fn write_newick(events: &EventTree, id: EventId, out: &mut String) {
    let event = events.get(id);
    if !event.children.is_empty() {
        out.push('(');
        for (i, child) in event.children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_newick(events, *child, out);
        }
        out.push(')');
    }
    out.push_str(&event.name.to_string());
    out.push(':');
    out.push_str(&format!("{}", event.branch_length));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quartet_with_outgroup() -> EventTree {
        let mut events = EventTree::new();
        let root = events.add_event(0, "ROOT", 0.0, false, None);
        let anc = events.add_event(1, "anc", 0.0, false, Some(root));
        let ingroup_anc = events.add_event(2, "ingroup_anc", 0.05, false, Some(anc));
        events.add_event(3, "human", 0.1, false, Some(ingroup_anc));
        events.add_event(4, "mouse", 0.2, false, Some(ingroup_anc));
        events.add_event(5, "chicken", 0.3, true, Some(anc));
        events
    }

    #[test]
    fn round_trips_branch_lengths_and_names() {
        let events = quartet_with_outgroup();
        let species = SpeciesTree::from_event_tree(&events).unwrap();
        assert!(species.node_for_event(3).is_some());
        assert!(species.node_for_event(5).is_some());
    }

    #[test]
    fn split_point_is_the_node_separating_outgroup_from_ingroups() {
        let events = quartet_with_outgroup();
        let species = SpeciesTree::from_event_tree(&events).unwrap();
        let split_points = species.split_points(&events).unwrap();

        let anc_node = species.node_for_event(1).unwrap();
        assert!(split_points.contains(&anc_node));

        let ingroup_anc_node = species.node_for_event(2).unwrap();
        assert!(!split_points.contains(&ingroup_anc_node));
    }
}
