//! KdTree over a geometry's triangles
//!
//! Median split along the longest axis of each node's bounds, stopping at the
//! leaf target or the level limit. Used for picking against meshes.

use serde::{Deserialize, Serialize};

use super::{BoundingBox, Ray, Triangle};
use crate::foundation::math::Vec3;

/// Build parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdTreeBuildOptions {
    /// Stop splitting once a node holds this many triangles or fewer
    pub target_num_triangles_per_leaf: usize,
    /// Maximum depth of the tree
    pub max_num_levels: usize,
}

impl Default for KdTreeBuildOptions {
    fn default() -> Self {
        Self {
            target_num_triangles_per_leaf: 50,
            max_num_levels: 20,
        }
    }
}

#[derive(Debug, Clone)]
enum KdNode {
    Leaf {
        bounds: BoundingBox,
        first: usize,
        count: usize,
    },
    Branch {
        bounds: BoundingBox,
        left: usize,
        right: usize,
    },
}

impl KdNode {
    fn bounds(&self) -> &BoundingBox {
        match self {
            KdNode::Leaf { bounds, .. } | KdNode::Branch { bounds, .. } => bounds,
        }
    }
}

/// Nearest intersection found by [`KdTree::intersect_ray`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdHit {
    /// Distance along the ray
    pub distance: f32,
    /// Hit position
    pub point: Vec3,
    /// Index of the triangle in the tree's (reordered) triangle list
    pub triangle: usize,
}

/// Spatial index over triangles
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    triangles: Vec<Triangle>,
    nodes: Vec<KdNode>,
}

impl KdTree {
    /// Create an unbuilt tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Build over `triangles`. Returns false, leaving the tree empty, when
    /// there is nothing usable: no triangles, non-finite coordinates or only
    /// zero-area triangles.
    pub fn build(&mut self, options: &KdTreeBuildOptions, triangles: Vec<Triangle>) -> bool {
        self.triangles.clear();
        self.nodes.clear();

        let finite = |v: &Vec3| v.iter().all(|c| c.is_finite());
        if triangles.is_empty()
            || !triangles.iter().all(|t| finite(&t.v0) && finite(&t.v1) && finite(&t.v2))
            || triangles.iter().all(|t| t.double_area() == 0.0)
        {
            return false;
        }

        self.triangles = triangles;
        let mut order: Vec<usize> = (0..self.triangles.len()).collect();
        let centroids: Vec<Vec3> = self.triangles.iter().map(Triangle::centroid).collect();
        self.build_node(&mut order, 0, &centroids, options, 0);

        // Store triangles in leaf order so leaves address contiguous ranges
        let reordered = order.iter().map(|&i| self.triangles[i]).collect();
        self.triangles = reordered;
        true
    }

    fn build_node(
        &mut self,
        order: &mut [usize],
        offset: usize,
        centroids: &[Vec3],
        options: &KdTreeBuildOptions,
        level: usize,
    ) -> usize {
        let mut bounds = BoundingBox::empty();
        for &i in order.iter() {
            let tri = &self.triangles[i];
            bounds.expand_by_point(&tri.v0);
            bounds.expand_by_point(&tri.v1);
            bounds.expand_by_point(&tri.v2);
        }

        let axis = bounds.longest_axis();
        let stop = order.len() <= options.target_num_triangles_per_leaf.max(1)
            || level + 1 >= options.max_num_levels
            || bounds.size()[axis] <= 0.0;

        let index = self.nodes.len();
        if stop {
            self.nodes.push(KdNode::Leaf {
                bounds,
                first: offset,
                count: order.len(),
            });
            return index;
        }

        let mid = order.len() / 2;
        order.select_nth_unstable_by(mid, |&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));

        // Placeholder until both children exist
        self.nodes.push(KdNode::Leaf { bounds, first: offset, count: 0 });
        let (lower, upper) = order.split_at_mut(mid);
        let left = self.build_node(lower, offset, centroids, options, level + 1);
        let right = self.build_node(upper, offset + mid, centroids, options, level + 1);
        self.nodes[index] = KdNode::Branch { bounds, left, right };
        index
    }

    /// True once a build succeeded
    pub fn is_built(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Bounds of the whole tree
    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.nodes.first().map(KdNode::bounds)
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, KdNode::Leaf { .. })).count()
    }

    /// Depth of the deepest leaf (root = 1)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[KdNode], index: usize) -> usize {
            match nodes[index] {
                KdNode::Leaf { .. } => 1,
                KdNode::Branch { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Number of indexed triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Nearest triangle hit by `ray`
    pub fn intersect_ray(&self, ray: &Ray) -> Option<KdHit> {
        let mut best: Option<KdHit> = None;
        let mut pending = vec![0usize];
        if self.nodes.is_empty() {
            return None;
        }

        while let Some(index) = pending.pop() {
            let node = &self.nodes[index];
            let Some(entry) = node.bounds().intersect_ray(&ray.origin, &ray.direction) else {
                continue;
            };
            if best.is_some_and(|hit| entry > hit.distance) {
                continue;
            }
            match *node {
                KdNode::Branch { left, right, .. } => {
                    pending.push(right);
                    pending.push(left);
                }
                KdNode::Leaf { first, count, .. } => {
                    for (offset, tri) in self.triangles[first..first + count].iter().enumerate() {
                        if let Some((t, _, _)) = tri.intersect_ray(ray) {
                            if best.map_or(true, |hit| t < hit.distance) {
                                best = Some(KdHit {
                                    distance: t,
                                    point: ray.point_at(t),
                                    triangle: first + offset,
                                });
                            }
                        }
                    }
                }
            }
        }
        best
    }
}
