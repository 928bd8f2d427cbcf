//! 2D k-d tree for spatial indexing
//!
//! Provides O(log n) nearest, k-nearest, radius and box queries over a
//! static point set: raster cell centres for the interpolation engine and
//! mesh nodes for nearest-node lookups. There is no insert or delete; a
//! changed point set means building a new tree.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use super::SamplePoint;
use crate::error::{Error, Result};
use crate::raster::Extent;
use std::cmp::Ordering;

/// A 2D k-d tree for efficient spatial queries on sample points.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    /// Points in the order they were supplied
    points: Vec<SamplePoint>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbor query
#[derive(Debug, Clone, Copy)]
pub struct NearestResult {
    pub point: SamplePoint,
    pub distance_sq: f64,
    /// Position of the point in the slice the tree was built from
    pub index: usize,
}

#[inline]
fn coord(p: &SamplePoint, dim: u8) -> f64 {
    if dim == 0 { p.x } else { p.y }
}

impl KdTree {
    /// Build a k-d tree from sample points.
    ///
    /// Construction is O(n log n) using median-of-coordinate splitting.
    ///
    /// # Errors
    /// [`Error::EmptyPointSet`] when `points` is empty.
    pub fn build(points: Vec<SamplePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::EmptyPointSet);
        }

        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        build_recursive(&points, &mut indices, 0, &mut nodes);

        Ok(Self { nodes, points })
    }

    /// Number of points in the tree.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; an empty tree cannot be built.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in build order
    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    /// Find the single nearest point to (qx, qy).
    pub fn nearest(&self, qx: f64, qy: f64) -> NearestResult {
        let mut best_dist_sq = f64::INFINITY;
        let mut best_idx = self.nodes[0].point_idx;

        self.nearest_recursive(0, qx, qy, &mut best_dist_sq, &mut best_idx);

        NearestResult {
            point: self.points[best_idx],
            distance_sq: best_dist_sq,
            index: best_idx,
        }
    }

    /// Find the k nearest points to (qx, qy).
    ///
    /// Returns up to k results sorted by ascending distance.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<NearestResult> {
        if k == 0 {
            return Vec::new();
        }

        // Ascending by distance; the last entry is the current k-th best
        let mut best: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.knn_recursive(0, qx, qy, k, &mut best);

        best.into_iter()
            .map(|(distance_sq, index)| NearestResult {
                point: self.points[index],
                distance_sq,
                index,
            })
            .collect()
    }

    /// Find all points with distance `<= radius` of (qx, qy).
    ///
    /// A zero radius returns only coincident points; a negative radius
    /// returns nothing. Results are in no particular order.
    pub fn within_radius(&self, qx: f64, qy: f64, radius: f64) -> Vec<NearestResult> {
        let mut results = Vec::new();
        if radius < 0.0 || radius.is_nan() {
            return results;
        }
        self.radius_recursive(0, qx, qy, radius * radius, &mut results);
        results
    }

    /// Append every point inside `area` (edges inclusive) to `out`
    pub fn within_box(&self, area: &Extent, out: &mut Vec<SamplePoint>) {
        if area.is_valid() {
            self.box_recursive(0, area, out);
        }
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

        if diff * diff < *best_dist_sq
            && let Some(child) = second
        {
            self.nearest_recursive(child, qx, qy, best_dist_sq, best_idx);
        }
    }

    fn knn_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        k: usize,
        best: &mut Vec<(f64, usize)>,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = qx - p.x;
        let dy = qy - p.y;
        let dist_sq = dx * dx + dy * dy;

        let worst = |best: &Vec<(f64, usize)>| {
            if best.len() >= k {
                best[best.len() - 1].0
            } else {
                f64::INFINITY
            }
        };

        if dist_sq < worst(best) {
            let pos = best.partition_point(|&(d, _)| d <= dist_sq);
            best.insert(pos, (dist_sq, node.point_idx));
            best.truncate(k);
        }

        let diff = if node.split_dim == 0 { dx } else { dy };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, qx, qy, k, best);
        }

        if diff * diff < worst(best)
            && let Some(child) = second
        {
            self.knn_recursive(child, qx, qy, k, best);
        }
    }

    fn radius_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        radius_sq: f64,
        results: &mut Vec<NearestResult>,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = qx - p.x;
        let dy = qy - p.y;
        let dist_sq = dx * dx + dy * dy;

        if dist_sq <= radius_sq {
            results.push(NearestResult {
                point: *p,
                distance_sq: dist_sq,
                index: node.point_idx,
            });
        }

        let diff = if node.split_dim == 0 { dx } else { dy };

        if let Some(left) = node.left
            && (diff <= 0.0 || diff * diff <= radius_sq)
        {
            self.radius_recursive(left, qx, qy, radius_sq, results);
        }

        if let Some(right) = node.right
            && (diff >= 0.0 || diff * diff <= radius_sq)
        {
            self.radius_recursive(right, qx, qy, radius_sq, results);
        }
    }

    fn box_recursive(&self, node_idx: usize, area: &Extent, out: &mut Vec<SamplePoint>) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        if area.contains(p.x, p.y) {
            out.push(*p);
        }

        let split = coord(p, node.split_dim);
        let (lo, hi) = if node.split_dim == 0 {
            (area.xmin, area.xmax)
        } else {
            (area.ymin, area.ymax)
        };

        if let Some(left) = node.left
            && lo <= split
        {
            self.box_recursive(left, area, out);
        }
        if let Some(right) = node.right
            && hi >= split
        {
            self.box_recursive(right, area, out);
        }
    }
}

/// Recursively build the tree over `indices`, partitioning in place.
fn build_recursive(
    points: &[SamplePoint],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let split_dim = (depth % 2) as u8;
    let median = indices.len() / 2;

    indices.select_nth_unstable_by(median, |&a, &b| {
        coord(&points[a], split_dim)
            .partial_cmp(&coord(&points[b], split_dim))
            .unwrap_or(Ordering::Equal)
    });

    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        let child = build_recursive(points, left, depth + 1, nodes);
        nodes[node_idx].left = Some(child);
    }
    if !right.is_empty() {
        let child = build_recursive(points, right, depth + 1, nodes);
        nodes[node_idx].right = Some(child);
    }

    node_idx
}
