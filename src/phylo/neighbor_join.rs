//! Standard neighbor-joining on a symmetric distance matrix.

use crate::gene_tree::{GeneNodeId, GeneTree};
use crate::matrix::Matrix;

/// Builds an unrooted gene tree from a symmetric distance matrix via neighbor-joining.
/// `leaves[i]` is the matrix index recorded on the leaf built for row/column `i`.
pub fn neighbor_join(distances: &Matrix, leaves: &[usize]) -> GeneTree {
    let n = leaves.len();
    let mut tree = GeneTree::new();
    if n == 0 {
        return tree;
    }
    if n == 1 {
        tree.new_leaf(leaves[0]);
        return tree;
    }

    let mut active: Vec<GeneNodeId> = leaves.iter().map(|&idx| tree.new_leaf(idx)).collect();
    let mut dist = distances.clone();
    let mut index_of: Vec<usize> = (0..n).collect();

    while active.len() > 2 {
        let m = active.len();
        let row_sum: Vec<f64> =
            (0..m).map(|i| (0..m).map(|j| dist.get(index_of[i], index_of[j])).sum()).collect();

        let mut best = (0usize, 1usize, f64::INFINITY);
        for i in 0..m {
            for j in (i + 1)..m {
                let q = (m as f64 - 2.0) * dist.get(index_of[i], index_of[j]) - row_sum[i] - row_sum[j];
                if q < best.2 {
                    best = (i, j, q);
                }
            }
        }
        let (i, j, _) = best;
        let d_ij = dist.get(index_of[i], index_of[j]);
        let length_i = (0.5 * d_ij + (row_sum[i] - row_sum[j]) / (2.0 * (m as f64 - 2.0).max(1.0))).max(0.0);
        let length_j = (d_ij - length_i).max(0.0);

        let new_node = tree.join(active[i], length_i, active[j], length_j);
        let new_index = dist.rows;
        let mut grown = Matrix::zeros(dist.rows + 1, dist.rows + 1);
        for a in 0..dist.rows {
            for b in 0..dist.rows {
                grown.set(a, b, dist.get(a, b));
            }
        }
        for (k, &idx_k) in index_of.iter().enumerate() {
            if k == i || k == j {
                continue;
            }
            let d = 0.5
                * (dist.get(index_of[i], idx_k) + dist.get(index_of[j], idx_k) - d_ij);
            grown.set(new_index, idx_k, d);
            grown.set(idx_k, new_index, d);
        }
        dist = grown;

        let (keep_hi, keep_lo) = if i > j { (i, j) } else { (j, i) };
        active.remove(keep_hi);
        active.remove(keep_lo);
        index_of.remove(keep_hi);
        index_of.remove(keep_lo);
        active.push(new_node);
        index_of.push(new_index);
    }

    let d = dist.get(index_of[0], index_of[1]);
    tree.join(active[0], d / 2.0, active[1], d / 2.0);
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Classic 4-taxon quartet (Saitou & Nei): ((A,B),(C,D)) with known branch
    /// lengths recovered exactly by neighbor-joining from an additive distance matrix.
    #[test]
    fn recovers_known_quartet_topology() {
        let mut m = Matrix::zeros(4, 4);
        let d = [
            [0.0, 5.0, 9.0, 9.0],
            [5.0, 0.0, 10.0, 10.0],
            [9.0, 10.0, 0.0, 8.0],
            [9.0, 10.0, 8.0, 0.0],
        ];
        for i in 0..4 {
            for j in 0..4 {
                m.set(i, j, d[i][j]);
            }
        }
        let tree = neighbor_join(&m, &[0, 1, 2, 3]);
        let root = tree.root().unwrap();
        assert!(!tree.is_leaf(root));
        assert_eq!(tree.ids().filter(|&id| tree.is_leaf(id)).count(), 4);
    }

    #[test]
    fn two_leaves_join_directly() {
        let mut m = Matrix::zeros(2, 2);
        m.set(0, 1, 3.0);
        m.set(1, 0, 3.0);
        let tree = neighbor_join(&m, &[0, 1]);
        let root = tree.root().unwrap();
        assert_eq!(tree.get(root).children.len(), 2);
    }
}
