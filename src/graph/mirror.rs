//! The node and edge arenas shared between the adapter and the layout engine.
//!
//! Both arenas are slot maps: handles stay valid for as long as their entry
//! lives and never alias a later entry, so removing a node cannot leave an
//! edge pointing at some other node. Each arena keeps a side map from the
//! stable remote identifier to its handle, which makes inserts
//! deduplicating and id lookups O(1).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use slotmap::SlotMap;

use super::edge::{Edge, EdgeKey};
use super::node::{Node, NodeKey};

/// Single-threaded shared ownership used for the mirror arenas.
pub type Shared<T> = Rc<RefCell<T>>;

/// Node arena shared by the adapter, the layout engine and the renderer.
pub type SharedNodes = Shared<NodeList>;

/// Edge arena shared by the adapter, the layout engine and the renderer.
pub type SharedEdges = Shared<EdgeList>;

/// Wrap a value for joint ownership.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// The mirrored nodes.
#[derive(Debug, Default)]
pub struct NodeList {
    arena: SlotMap<NodeKey, Node>,
    by_id: HashMap<String, NodeKey>,
}

impl NodeList {
    /// Create an empty node list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node list with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotMap::with_capacity_and_key(capacity),
            by_id: HashMap::with_capacity(capacity),
        }
    }

    /// Insert `node` unless a node with the same id is already present.
    ///
    /// Returns the handle of the stored node and whether it was inserted.
    pub fn insert_or_get(&mut self, node: Node) -> (NodeKey, bool) {
        if let Some(&key) = self.by_id.get(&node.id) {
            return (key, false);
        }
        let id = node.id.clone();
        let key = self.arena.insert(node);
        self.by_id.insert(id, key);
        (key, true)
    }

    /// Remove a node without touching edges. Use [`remove_node_cascade`] for
    /// anything reachable from an [`EdgeList`].
    fn remove(&mut self, key: NodeKey) -> Option<Node> {
        let node = self.arena.remove(key)?;
        self.by_id.remove(&node.id);
        Some(node)
    }

    /// Handle of the node with this remote id.
    pub fn key_of(&self, id: &str) -> Option<NodeKey> {
        self.by_id.get(id).copied()
    }

    /// Whether a node with this remote id is mirrored.
    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.arena.get(key)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.arena.get_mut(key)
    }

    /// Node with this remote id.
    pub fn by_id(&self, id: &str) -> Option<&Node> {
        self.key_of(id).and_then(|key| self.arena.get(key))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.arena.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeKey, &mut Node)> {
        self.arena.iter_mut()
    }

    /// Remote ids of all mirrored nodes.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.arena.values().map(|node| node.id.as_str())
    }

    /// Get the bounding box of all positioned nodes as (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for node in self.arena.values().filter(|n| n.is_positioned()) {
            min_x = min_x.min(node.x);
            max_x = max_x.max(node.x);
            min_y = min_y.min(node.y);
            max_y = max_y.max(node.y);
        }

        if min_x == f64::INFINITY {
            return None;
        }
        Some((min_x, min_y, max_x, max_y))
    }
}

/// The mirrored edges.
#[derive(Debug, Default)]
pub struct EdgeList {
    arena: SlotMap<EdgeKey, Edge>,
    by_id: HashMap<String, EdgeKey>,
}

impl EdgeList {
    /// Create an empty edge list.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_or_get(&mut self, edge: Edge) -> (EdgeKey, bool) {
        if let Some(&key) = self.by_id.get(&edge.id) {
            return (key, false);
        }
        let id = edge.id.clone();
        let key = self.arena.insert(edge);
        self.by_id.insert(id, key);
        (key, true)
    }

    fn remove(&mut self, key: EdgeKey) -> Option<Edge> {
        let edge = self.arena.remove(key)?;
        self.by_id.remove(&edge.id);
        Some(edge)
    }

    /// Handle of the edge with this remote id.
    pub fn key_of(&self, id: &str) -> Option<EdgeKey> {
        self.by_id.get(id).copied()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, key: EdgeKey) -> Option<&Edge> {
        self.arena.get(key)
    }

    pub fn get_mut(&mut self, key: EdgeKey) -> Option<&mut Edge> {
        self.arena.get_mut(key)
    }

    /// Edge with this remote id.
    pub fn by_id(&self, id: &str) -> Option<&Edge> {
        self.key_of(id).and_then(|key| self.arena.get(key))
    }

    /// Edges where `node` is the source or the target.
    pub fn incident(&self, node: NodeKey) -> Vec<EdgeKey> {
        self.arena
            .iter()
            .filter(|(_, e)| e.touches(node))
            .map(|(key, _)| key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, &Edge)> {
        self.arena.iter()
    }

    /// Remote ids of all mirrored edges.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.arena.values().map(|edge| edge.id.as_str())
    }
}

/// Insert an edge between two mirrored nodes, keeping degree counters in step.
///
/// Returns `None` if either endpoint is not in `nodes`. An edge whose id is
/// already mirrored is left untouched and reported as not inserted.
pub fn link(nodes: &mut NodeList, edges: &mut EdgeList, edge: Edge) -> Option<(EdgeKey, bool)> {
    if nodes.get(edge.source).is_none() || nodes.get(edge.target).is_none() {
        return None;
    }
    let (source, target) = (edge.source, edge.target);
    let (key, inserted) = edges.insert_or_get(edge);
    if inserted {
        if let Some(node) = nodes.get_mut(source) {
            node.outbound += 1;
        }
        if let Some(node) = nodes.get_mut(target) {
            node.inbound += 1;
        }
    }
    Some((key, inserted))
}

/// Remove one edge, keeping degree counters in step.
pub fn unlink(nodes: &mut NodeList, edges: &mut EdgeList, key: EdgeKey) -> Option<Edge> {
    let edge = edges.remove(key)?;
    if let Some(node) = nodes.get_mut(edge.source) {
        node.outbound = node.outbound.saturating_sub(1);
    }
    if let Some(node) = nodes.get_mut(edge.target) {
        node.inbound = node.inbound.saturating_sub(1);
    }
    Some(edge)
}

/// Remove a node and every edge where it is the source or the target.
pub fn remove_node_cascade(
    nodes: &mut NodeList,
    edges: &mut EdgeList,
    key: NodeKey,
) -> Option<(Node, Vec<Edge>)> {
    nodes.get(key)?;
    let removed_edges = edges
        .incident(key)
        .into_iter()
        .filter_map(|edge_key| unlink(nodes, edges, edge_key))
        .collect();
    let node = nodes.remove(key)?;
    Some((node, removed_edges))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> (NodeList, EdgeList, [NodeKey; 3]) {
        let mut nodes = NodeList::new();
        let mut edges = EdgeList::new();
        let (a, _) = nodes.insert_or_get(Node::at("v/a", 0.0, 0.0));
        let (b, _) = nodes.insert_or_get(Node::at("v/b", 1.0, 0.0));
        let (c, _) = nodes.insert_or_get(Node::at("v/c", 0.0, 1.0));
        link(&mut nodes, &mut edges, Edge::new("e/ab", a, b));
        link(&mut nodes, &mut edges, Edge::new("e/bc", b, c));
        link(&mut nodes, &mut edges, Edge::new("e/ca", c, a));
        (nodes, edges, [a, b, c])
    }

    #[test]
    fn test_insert_deduplicates_by_id() {
        let mut nodes = NodeList::new();
        let (first, inserted) = nodes.insert_or_get(Node::at("v/1", 0.0, 0.0));
        assert!(inserted);
        let (again, inserted) = nodes.insert_or_get(Node::at("v/1", 9.0, 9.0));
        assert!(!inserted);
        assert_eq!(first, again);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes.get(first).map(|n| n.x), Some(0.0));
    }

    #[test]
    fn test_link_deduplicates_and_counts() {
        let (mut nodes, mut edges, [a, b, _]) = triangle();
        let again = link(&mut nodes, &mut edges, Edge::new("e/ab", a, b));
        assert_eq!(again.map(|(_, inserted)| inserted), Some(false));
        assert_eq!(edges.len(), 3);
        assert_eq!(nodes.get(a).map(|n| (n.outbound, n.inbound)), Some((1, 1)));
    }

    #[test]
    fn test_link_requires_endpoints() {
        let (mut nodes, mut edges, [a, b, _]) = triangle();
        let (_, removed) = remove_node_cascade(&mut nodes, &mut edges, b).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(link(&mut nodes, &mut edges, Edge::new("e/ab2", a, b)).is_none());
    }

    #[test]
    fn test_remove_node_cascades_both_directions() {
        let (mut nodes, mut edges, [a, b, c]) = triangle();
        let (node, removed) = remove_node_cascade(&mut nodes, &mut edges, a).unwrap();
        assert_eq!(node.id, "v/a");

        let mut ids: Vec<_> = removed.iter().map(|e| e.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["e/ab", "e/ca"]);
        assert_eq!(edges.len(), 1);
        assert!(!nodes.contains_id("v/a"));
        assert_eq!(nodes.get(b).map(|n| (n.outbound, n.inbound)), Some((1, 0)));
        assert_eq!(nodes.get(c).map(|n| (n.outbound, n.inbound)), Some((0, 1)));
    }

    #[test]
    fn test_removed_handle_stays_dead() {
        let (mut nodes, mut edges, [a, ..]) = triangle();
        remove_node_cascade(&mut nodes, &mut edges, a);
        let (fresh, _) = nodes.insert_or_get(Node::at("v/a", 0.0, 0.0));
        assert_ne!(fresh, a);
        assert!(nodes.get(a).is_none());
    }

    #[test]
    fn test_bounds_skip_unpositioned() {
        let mut nodes = NodeList::new();
        nodes.insert_or_get(Node::at("v/1", -10.0, -5.0));
        nodes.insert_or_get(Node::at("v/2", 10.0, 5.0));
        nodes.insert_or_get(Node::new("v/3"));
        assert_eq!(nodes.bounds(), Some((-10.0, -5.0, 10.0, 5.0)));
    }
}
