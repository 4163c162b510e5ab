//! 2D k-d tree over attractors
//!
//! Nearest-attractor lookup for the distance transform. Construction is
//! O(n log n), queries O(log n) on average.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use crate::attractor::Attractor;

/// A 2D k-d tree for nearest-neighbour queries.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<Attractor>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbour query
#[derive(Debug, Clone, Copy)]
pub struct Nearest {
    pub attractor: Attractor,
    pub distance_sq: f64,
}

impl KdTree {
    /// Build a tree by median splitting on alternating axes.
    pub fn build(points: &[Attractor]) -> Self {
        let points = points.to_vec();
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(&points, &mut indices, 0, &mut nodes);
        }
        Self { nodes, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nearest attractor to (qx, qy), or `None` for an empty tree.
    ///
    /// Ties resolve to the attractor reached first in tree order.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<Nearest> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best_dist_sq = f64::MAX;
        let mut best_idx = 0;
        self.nearest_recursive(0, qx, qy, &mut best_dist_sq, &mut best_idx);
        Some(Nearest {
            attractor: self.points[best_idx],
            distance_sq: best_dist_sq,
        })
    }

    fn nearest_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        best_dist_sq: &mut f64,
        best_idx: &mut usize,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = qx - p.x;
        let dy = qy - p.y;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq < *best_dist_sq {
            *best_dist_sq = dist_sq;
            *best_idx = node.point_idx;
        }

        let diff = if node.split_dim == 0 { dx } else { dy };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.nearest_recursive(child, qx, qy, best_dist_sq, best_idx);
        }
        if diff * diff < *best_dist_sq {
            if let Some(child) = second {
                self.nearest_recursive(child, qx, qy, best_dist_sq, best_idx);
            }
        }
    }
}

fn build_recursive(
    points: &[Attractor],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let split_dim = (depth % 2) as u8;
    let key = |i: usize| if split_dim == 0 { points[i].x } else { points[i].y };
    indices.sort_by(|&a, &b| key(a).total_cmp(&key(b)));

    let median = indices.len() / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (lower, upper) = indices.split_at_mut(median);
    let upper = &mut upper[1..];
    if !lower.is_empty() {
        let child = build_recursive(points, lower, depth + 1, nodes);
        nodes[node_idx].left = Some(child);
    }
    if !upper.is_empty() {
        let child = build_recursive(points, upper, depth + 1, nodes);
        nodes[node_idx].right = Some(child);
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[Attractor], qx: f64, qy: f64) -> f64 {
        points
            .iter()
            .map(|p| p.dist_sq(qx, qy))
            .fold(f64::MAX, f64::min)
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(0.0, 0.0).is_none());
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points: Vec<Attractor> = (0..50)
            .map(|i| {
                let f = i as f64;
                Attractor::new((f * 7.3) % 23.0, (f * 3.1) % 17.0, f)
            })
            .collect();
        let tree = KdTree::build(&points);
        assert_eq!(tree.len(), 50);

        for qi in 0..40 {
            let qx = (qi as f64 * 1.7) % 25.0;
            let qy = (qi as f64 * 2.9) % 19.0;
            let found = tree.nearest(qx, qy).unwrap();
            assert!((found.distance_sq - brute_force(&points, qx, qy)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_nearest_carries_value() {
        let points = vec![Attractor::new(0.0, 0.0, 1.0), Attractor::new(10.0, 10.0, 2.0)];
        let tree = KdTree::build(&points);
        assert_eq!(tree.nearest(9.0, 9.0).unwrap().attractor.target_z, 2.0);
        assert_eq!(tree.nearest(1.0, 1.0).unwrap().attractor.target_z, 1.0);
    }
}
