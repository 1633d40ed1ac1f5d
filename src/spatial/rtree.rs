//! R-tree based spatial index using the rstar crate.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::graph::{NodeKey, NodeList};

/// A point in the spatial index with associated node handle.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NodePoint {
    key: NodeKey,
    x: f64,
    y: f64,
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for NodePoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        (self.x - point[0]).abs() < f64::EPSILON && (self.y - point[1]).abs() < f64::EPSILON
    }
}

/// Spatial index over mirrored node positions.
///
/// The index is a snapshot; rebuild it after the simulation moved nodes.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<NodePoint>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load the index from every positioned node.
    pub fn rebuild(&mut self, nodes: &NodeList) {
        let points = nodes
            .iter()
            .filter(|(_, node)| node.is_positioned())
            .map(|(key, node)| NodePoint {
                key,
                x: node.x,
                y: node.y,
            })
            .collect();
        self.tree = RTree::bulk_load(points);
    }

    /// Find the nearest node within a maximum distance.
    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<NodeKey> {
        let max_distance_sq = max_distance * max_distance;
        self.tree
            .nearest_neighbor(&[x, y])
            .filter(|point| point.distance_2(&[x, y]) <= max_distance_sq)
            .map(|point| point.key)
    }

    /// Find all nodes within a radius of a point.
    pub fn in_radius(&self, x: f64, y: f64, radius: f64) -> Vec<NodeKey> {
        self.tree
            .locate_within_distance([x, y], radius * radius)
            .map(|point| point.key)
            .collect()
    }

    /// Clear all nodes from the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Get the number of nodes in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
