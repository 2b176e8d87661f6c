//! Guided neighbor-joining: the same Q-criterion join procedure as plain
//! neighbor-joining, but run over a distance matrix augmented with join costs so that
//! pairs of leaves whose species are far apart in the species tree are discouraged from
//! joining early. Per spec.md, this rooting method is only valid alongside
//! `scoringMethod = BEST_RECON`; `config.rs` rejects any other combination.

use crate::gene_tree::GeneTree;
use crate::matrix::Matrix;
use crate::phylo::join_cost::JoinCosts;
use crate::phylo::neighbor_join::neighbor_join;

/// Adds `join_costs.cost_between(species(i), species(j))` to every off-diagonal entry
/// before handing the matrix to the ordinary neighbor-joining loop.
pub fn guided_neighbor_join(
    distances: &Matrix,
    leaves: &[usize],
    leaf_species: &std::collections::HashMap<usize, usize>,
    join_costs: &JoinCosts,
) -> GeneTree {
    let n = leaves.len();
    let mut augmented = distances.clone();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let (Some(&si), Some(&sj)) =
                (leaf_species.get(&leaves[i]), leaf_species.get(&leaves[j]))
            else {
                continue;
            };
            augmented.add_at(i, j, join_costs.cost_between(si, sj));
        }
    }
    neighbor_join(&augmented, leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phylotree::tree::Tree;

    #[test]
    fn augmented_distances_never_decrease_the_originals() {
        let species_tree = Tree::from_newick("((a:1,b:1)anc:1,c:1)root;").unwrap();
        let leaves_sp = species_tree.get_leaves();
        let join_costs = crate::phylo::join_cost::compute_join_costs(&species_tree, &leaves_sp, 1.0, 1.0).unwrap();

        let mut leaf_species = std::collections::HashMap::new();
        leaf_species.insert(0, leaves_sp[0]);
        leaf_species.insert(1, leaves_sp[1]);
        leaf_species.insert(2, leaves_sp[2]);

        let mut m = Matrix::zeros(3, 3);
        m.set(0, 1, 2.0);
        m.set(1, 0, 2.0);
        m.set(0, 2, 2.0);
        m.set(2, 0, 2.0);
        m.set(1, 2, 2.0);
        m.set(2, 1, 2.0);

        let tree = guided_neighbor_join(&m, &[0, 1, 2], &leaf_species, &join_costs);
        assert_eq!(tree.ids().filter(|&id| tree.is_leaf(id)).count(), 3);
    }
}
