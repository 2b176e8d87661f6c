//! Gene-tree arena.
//!
//! `phylotree::tree::Tree` is reused for the species tree, but a gene tree carries
//! client data a generic phylogenetics tree type has no room for: which matrix index
//! (segment) a leaf corresponds to, the bootstrap support on the branch above a node,
//! and the species node a node's ancestral population reconciles to. This is the arena-
//! of-handles realization of the cyclic-graph Design Note: nodes are reached only by
//! `GeneNodeId`, never by reference.

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneNodeId(pub usize);

#[derive(Clone, Debug)]
pub struct GeneNode {
    pub branch_length: f64,
    pub parent: Option<GeneNodeId>,
    pub children: Vec<GeneNodeId>,
    /// Segment matrix index, `Some` only for leaves.
    pub matrix_index: Option<usize>,
    /// Fraction of bootstrap replicates supporting the branch above this node.
    pub bootstrap_support: f64,
    /// Species node (by `phylotree` node id in the run's `SpeciesTree`) this node's
    /// population reconciles to. Filled in by reconciliation, `None` until then.
    pub reconciled_species: Option<usize>,
    /// True if reconciliation inferred a gene duplication at this node.
    pub is_duplication: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GeneTree {
    nodes: Vec<GeneNode>,
}

impl GeneTree {
    pub fn new() -> Self {
        GeneTree::default()
    }

    pub fn new_leaf(&mut self, matrix_index: usize) -> GeneNodeId {
        let id = GeneNodeId(self.nodes.len());
        self.nodes.push(GeneNode {
            branch_length: 0.0,
            parent: None,
            children: Vec::new(),
            matrix_index: Some(matrix_index),
            bootstrap_support: 0.0,
            reconciled_species: None,
            is_duplication: false,
        });
        id
    }

    /// Joins two existing nodes under a new internal node with the given branch
    /// lengths on the two child edges, and returns the new node's id.
    pub fn join(&mut self, a: GeneNodeId, length_a: f64, b: GeneNodeId, length_b: f64) -> GeneNodeId {
        let id = GeneNodeId(self.nodes.len());
        self.nodes.push(GeneNode {
            branch_length: 0.0,
            parent: None,
            children: vec![a, b],
            matrix_index: None,
            bootstrap_support: 0.0,
            reconciled_species: None,
            is_duplication: false,
        });
        self.nodes[a.0].branch_length = length_a;
        self.nodes[a.0].parent = Some(id);
        self.nodes[b.0].branch_length = length_b;
        self.nodes[b.0].parent = Some(id);
        id
    }

    pub fn get(&self, id: GeneNodeId) -> &GeneNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: GeneNodeId) -> &mut GeneNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = GeneNodeId> {
        (0..self.nodes.len()).map(GeneNodeId)
    }

    /// The single node with no parent. Only meaningful once the tree is fully built
    /// (a partially-joined forest has more than one).
    pub fn root(&self) -> Option<GeneNodeId> {
        self.nodes.iter().position(|n| n.parent.is_none()).map(GeneNodeId)
    }

    pub fn is_leaf(&self, id: GeneNodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// Re-roots the tree on the branch above `new_child`, the way minimum-cost
    /// reconciliation picks a root among unrooted candidates: a fresh internal node is
    /// inserted on that branch, with `new_child` and the reversed remainder of the tree
    /// as its two children. `new_child` itself is left untouched apart from its parent
    /// pointer, so a leaf stays a leaf (its `matrix_index` keeps being found by every
    /// traversal) instead of picking up children of its own.
    pub fn reroot_above(&mut self, new_child: GeneNodeId) {
        let Some(old_parent) = self.nodes[new_child.0].parent else { return };
        let pendant_length = self.nodes[new_child.0].branch_length;

        // Ancestors from `old_parent` up to (and including) the tree's current root.
        let mut path = vec![old_parent];
        while let Some(p) = self.nodes[path.last().unwrap().0].parent {
            path.push(p);
        }
        // lengths[i] is the length of the original edge (path[i], path[i + 1]),
        // captured before any of the reversal below mutates those fields.
        let lengths: Vec<f64> =
            path[..path.len() - 1].iter().map(|&n| self.nodes[n.0].branch_length).collect();

        self.nodes[old_parent.0].children.retain(|&c| c != new_child);

        // Reverse every edge along the path: each path[i + 1] becomes a child of
        // path[i], carrying the edge length it had before reversal.
        for i in 0..path.len() - 1 {
            let node = path[i];
            let next = path[i + 1];
            self.nodes[next.0].children.retain(|&c| c != node);
            self.nodes[next.0].branch_length = lengths[i];
            self.nodes[next.0].parent = Some(node);
            if !self.nodes[node.0].children.contains(&next) {
                self.nodes[node.0].children.push(next);
            }
        }

        // The topmost node in the reversed chain is the tree's original root. Every
        // node here is binary (built only through `join`/`new_leaf`), so after losing
        // the child that led back down to `new_child` it has exactly one child left;
        // splice that child in directly rather than keep the root around as a
        // spurious unary node (it would otherwise be charged a bogus duplication by
        // reconciliation, which treats "same species on both sides" as ambiguous when
        // there's only one side).
        let top = *path.last().unwrap();
        let grafted = match self.nodes[top.0].children[..] {
            [only_child] => {
                self.nodes[only_child.0].branch_length += self.nodes[top.0].branch_length;
                only_child
            }
            _ => top,
        };
        if grafted != top && path.len() > 1 {
            let parent_of_top = path[path.len() - 2];
            self.nodes[parent_of_top.0].children.retain(|&c| c != top);
            if !self.nodes[parent_of_top.0].children.contains(&grafted) {
                self.nodes[parent_of_top.0].children.push(grafted);
            }
        }

        // `second_child` is whatever now hangs off the bottom of the reversed chain:
        // `old_parent` itself when there was anything above it to reverse, or
        // `grafted` directly when `old_parent` was already the root (and so is the
        // node being spliced away).
        let second_child = if path.len() == 1 { grafted } else { path[0] };
        if path.len() > 1 {
            // The other half of the edge `reroot_above` splits in two; the fudging
            // pass (`tree_builder::fudge_zero_branch_lengths`) redistributes this
            // zero against `new_child`'s pendant length.
            self.nodes[second_child.0].branch_length = 0.0;
        }

        let fresh_root = GeneNodeId(self.nodes.len());
        self.nodes.push(GeneNode {
            branch_length: 0.0,
            parent: None,
            children: vec![new_child, second_child],
            matrix_index: None,
            bootstrap_support: 0.0,
            reconciled_species: None,
            is_duplication: false,
        });
        self.nodes[new_child.0].branch_length = pendant_length;
        self.nodes[new_child.0].parent = Some(fresh_root);
        self.nodes[second_child.0].parent = Some(fresh_root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_sets_parent_and_branch_lengths() {
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        let root = tree.join(a, 0.1, b, 0.2);
        assert_eq!(tree.get(a).parent, Some(root));
        assert_eq!(tree.get(a).branch_length, 0.1);
        assert_eq!(tree.root(), Some(root));
    }

    #[test]
    fn quartet_forest_resolves_to_single_root() {
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        let c = tree.new_leaf(2);
        let d = tree.new_leaf(3);
        let ab = tree.join(a, 0.1, b, 0.1);
        let cd = tree.join(c, 0.1, d, 0.1);
        let root = tree.join(ab, 0.1, cd, 0.1);
        assert_eq!(tree.root(), Some(root));
        assert!(!tree.is_leaf(root));
        assert!(tree.is_leaf(a));
    }

    fn leaf_matrix_indices(tree: &GeneTree) -> Vec<usize> {
        let mut indices: Vec<usize> =
            tree.ids().filter(|&id| tree.is_leaf(id)).map(|id| tree.get(id).matrix_index.unwrap()).collect();
        indices.sort_unstable();
        indices
    }

    /// No node other than the root may have exactly one child: a survivor of
    /// `reroot_above` that was never suppressed would be a spurious unary node.
    fn assert_no_unary_nodes(tree: &GeneTree) {
        let root = tree.root();
        for id in tree.ids() {
            let children = &tree.get(id).children;
            if Some(id) == root {
                assert_ne!(children.len(), 1, "root {id:?} has a single child");
            } else {
                assert!(children.len() == 0 || children.len() == 2, "node {id:?} has {} children", children.len());
            }
        }
    }

    #[test]
    fn rerooting_above_a_leaf_keeps_it_a_leaf() {
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        let c = tree.new_leaf(2);
        let d = tree.new_leaf(3);
        let ab = tree.join(a, 0.1, b, 0.1);
        let cd = tree.join(c, 0.1, d, 0.1);
        tree.join(ab, 0.1, cd, 0.1);

        tree.reroot_above(a);

        assert!(tree.is_leaf(a), "new_child must remain a leaf after rerooting above it");
        assert_eq!(tree.get(a).matrix_index, Some(0));
        assert_eq!(leaf_matrix_indices(&tree), vec![0, 1, 2, 3]);
        assert_no_unary_nodes(&tree);
        assert_eq!(tree.root(), Some(tree.get(a).parent.unwrap()));
    }

    #[test]
    fn rerooting_above_a_leaf_whose_parent_is_the_root_suppresses_the_old_root() {
        // A 3-leaf tree: ((a,b),c) with (a,b) as the root's only internal child.
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        let c = tree.new_leaf(2);
        let ab = tree.join(a, 0.1, b, 0.2);
        tree.join(ab, 0.3, c, 0.4);

        // `c`'s parent is the tree's root directly (path length 1 in `reroot_above`).
        tree.reroot_above(c);

        assert!(tree.is_leaf(c));
        assert_eq!(leaf_matrix_indices(&tree), vec![0, 1, 2]);
        assert_no_unary_nodes(&tree);
        let root = tree.root().unwrap();
        assert_eq!(tree.get(root).children.len(), 2);
    }

    #[test]
    fn rerooting_above_a_deep_leaf_preserves_all_leaves_and_lengths() {
        // ((((a,b),c),d),e): reroot on `a`, several edges below the root.
        let mut tree = GeneTree::new();
        let a = tree.new_leaf(0);
        let b = tree.new_leaf(1);
        let c = tree.new_leaf(2);
        let d = tree.new_leaf(3);
        let e = tree.new_leaf(4);
        let ab = tree.join(a, 1.0, b, 2.0);
        let abc = tree.join(ab, 3.0, c, 4.0);
        let abcd = tree.join(abc, 5.0, d, 6.0);
        tree.join(abcd, 7.0, e, 8.0);

        tree.reroot_above(a);

        assert!(tree.is_leaf(a));
        assert_eq!(tree.get(a).branch_length, 1.0);
        assert_eq!(leaf_matrix_indices(&tree), vec![0, 1, 2, 3, 4]);
        assert_no_unary_nodes(&tree);
    }
}
