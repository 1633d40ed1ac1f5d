//! Node type and related structures.
//!
//! Nodes are the vertices of the mirrored graph. Each node has:
//! - An arena handle (`NodeKey`) that never dangles after removals
//! - The stable remote identifier (`_id` of the document)
//! - Position (x, y) and previous-tick position (px, py) for the simulation
//! - The remote document attributes
//! - State flags (pinned, expanded, community)

use serde_json::{Map, Value};

slotmap::new_key_type! {
    /// Arena handle of a node inside a [`NodeList`](super::NodeList).
    ///
    /// Handles of removed nodes are never reused for a different node.
    pub struct NodeKey;
}

/// Node state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeState {
    flags: u8,
}

impl NodeState {
    const PINNED: u8 = 0b0000_0001;
    const EXPANDED: u8 = 0b0000_0010;
    const COMMUNITY: u8 = 0b0000_0100;

    /// Create a new default node state.
    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    /// Check if the node is pinned (excluded from integration).
    #[inline]
    pub fn is_pinned(self) -> bool {
        self.flags & Self::PINNED != 0
    }

    /// Set the pinned state.
    #[inline]
    pub fn set_pinned(&mut self, pinned: bool) {
        self.set(Self::PINNED, pinned);
    }

    /// Check if the node's out-neighbourhood has been loaded.
    #[inline]
    pub fn is_expanded(self) -> bool {
        self.flags & Self::EXPANDED != 0
    }

    /// Set the expanded state.
    #[inline]
    pub fn set_expanded(&mut self, expanded: bool) {
        self.set(Self::EXPANDED, expanded);
    }

    /// Check if the node stands for a collapsed group of documents.
    #[inline]
    pub fn is_community(self) -> bool {
        self.flags & Self::COMMUNITY != 0
    }

    /// Set the community state.
    #[inline]
    pub fn set_community(&mut self, community: bool) {
        self.set(Self::COMMUNITY, community);
    }

    #[inline]
    fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.flags |= mask;
        } else {
            self.flags &= !mask;
        }
    }
}

/// One vertex of the displayed graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Remote document identifier, unique within the mirror.
    pub id: String,
    /// Current position. `NaN` until seeded.
    pub x: f64,
    pub y: f64,
    /// Position at the previous tick.
    pub px: f64,
    pub py: f64,
    /// Full remote document, system attributes included.
    pub data: Map<String, Value>,
    /// Packed flags.
    pub state: NodeState,
    /// Number of mirrored edges leaving this node.
    pub outbound: u32,
    /// Number of mirrored edges entering this node.
    pub inbound: u32,
}

impl Node {
    /// Create an unpositioned node.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: f64::NAN,
            y: f64::NAN,
            px: f64::NAN,
            py: f64::NAN,
            data: Map::new(),
            state: NodeState::new(),
            outbound: 0,
            inbound: 0,
        }
    }

    /// Create a node at a fixed position with zero initial velocity.
    pub fn at(id: impl Into<String>, x: f64, y: f64) -> Self {
        let mut node = Self::new(id);
        node.place(x, y);
        node
    }

    /// Attach the remote document.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Whether both coordinates are finite.
    #[inline]
    pub fn is_positioned(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Move the node and reset its velocity.
    #[inline]
    pub fn place(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.px = x;
        self.py = y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_state_default() {
        let state = NodeState::new();
        assert!(!state.is_pinned());
        assert!(!state.is_expanded());
        assert!(!state.is_community());
    }

    #[test]
    fn test_node_state_all_flags() {
        let mut state = NodeState::new();
        state.set_pinned(true);
        state.set_expanded(true);
        state.set_community(true);

        assert!(state.is_pinned());
        assert!(state.is_expanded());
        assert!(state.is_community());

        state.set_expanded(false);
        assert!(state.is_pinned());
        assert!(!state.is_expanded());
        assert!(state.is_community());
    }

    #[test]
    fn test_new_node_is_unpositioned() {
        let node = Node::new("v/1");
        assert!(!node.is_positioned());

        let placed = Node::at("v/2", 3.0, 4.0);
        assert!(placed.is_positioned());
        assert_eq!((placed.px, placed.py), (3.0, 4.0));
    }
}
