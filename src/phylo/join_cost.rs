//! Join-cost matrix: how much guided neighbor-joining should be discouraged from
//! joining two leaves whose assigned species are topologically far apart in the
//! species tree.
//!
//! The original `stPhylogeny_computeJoinCosts` is an external library routine whose
//! exact dynamic program isn't reproduced in the source this crate was built from
//! (see the Open Question decision in `DESIGN.md`). This is a documented, simpler
//! stand-in with the same intended effect: joining two leaves from species `i` and `j`
//! costs a flat per-duplication penalty when `i != j`, plus a per-loss penalty scaled
//! by the number of species-tree edges between `i` and `j`.

use std::collections::HashMap;

use phylotree::tree::Tree;

pub struct JoinCosts {
    pub costs: crate::matrix::Matrix,
    pub species_index: HashMap<usize, usize>,
}

impl JoinCosts {
    pub fn cost_between(&self, species_a: usize, species_b: usize) -> f64 {
        match (self.species_index.get(&species_a), self.species_index.get(&species_b)) {
            (Some(&i), Some(&j)) => self.costs.get(i, j),
            _ => 0.0,
        }
    }
}

pub fn compute_join_costs(
    species_tree: &Tree,
    species_nodes: &[usize],
    cost_per_dup: f64,
    cost_per_loss: f64,
) -> Result<JoinCosts, phylotree::tree::TreeError> {
    let n = species_nodes.len();
    let species_index: HashMap<usize, usize> =
        species_nodes.iter().enumerate().map(|(i, &node)| (node, i)).collect();

    let mut costs = crate::matrix::Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let distance = topological_distance(species_tree, species_nodes[i], species_nodes[j])?;
            costs.set(i, j, cost_per_dup + cost_per_loss * distance as f64);
        }
    }
    Ok(JoinCosts { costs, species_index })
}

fn topological_distance(
    tree: &Tree,
    a: usize,
    b: usize,
) -> Result<u64, phylotree::tree::TreeError> {
    let mut parent_of: HashMap<usize, usize> = HashMap::new();
    let root = tree.get_root()?;
    build_parent_map(tree, root, &mut parent_of)?;

    let ancestors_a = ancestor_chain(root, a, &parent_of);
    let ancestors_b = ancestor_chain(root, b, &parent_of);
    let set_a: std::collections::HashSet<usize> = ancestors_a.iter().copied().collect();
    let lca_depth = ancestors_b.iter().position(|n| set_a.contains(n));
    match lca_depth {
        Some(depth_b) => {
            let lca = ancestors_b[depth_b];
            let depth_a = ancestors_a.iter().position(|&n| n == lca).unwrap();
            Ok((depth_a + depth_b) as u64)
        }
        None => Ok(0),
    }
}

fn build_parent_map(
    tree: &Tree,
    node_id: usize,
    parent_of: &mut HashMap<usize, usize>,
) -> Result<(), phylotree::tree::TreeError> {
    let node = tree.get(&node_id)?;
    let children = node.children.clone();
    for child in children {
        parent_of.insert(child, node_id);
        build_parent_map(tree, child, parent_of)?;
    }
    Ok(())
}

fn ancestor_chain(root: usize, node: usize, parent_of: &HashMap<usize, usize>) -> Vec<usize> {
    let mut chain = vec![node];
    let mut cur = node;
    while cur != root {
        match parent_of.get(&cur) {
            Some(&p) => {
                chain.push(p);
                cur = p;
            }
            None => break,
        }
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_species_cost_zero() {
        let tree = Tree::from_newick("((a:1,b:1)anc:1,c:1)root;").unwrap();
        let leaves = tree.get_leaves();
        let costs = compute_join_costs(&tree, &leaves, 1.0, 1.0).unwrap();
        assert_eq!(costs.cost_between(leaves[0], leaves[0]), 0.0);
    }

    #[test]
    fn farther_species_cost_more() {
        let tree = Tree::from_newick("((a:1,b:1)anc:1,c:1)root;").unwrap();
        let leaves = tree.get_leaves();
        let costs = compute_join_costs(&tree, &leaves, 1.0, 1.0).unwrap();
        let a = leaves[0];
        let b = leaves[1];
        let c = leaves[2];
        assert!(costs.cost_between(a, c) >= costs.cost_between(a, b));
    }
}
