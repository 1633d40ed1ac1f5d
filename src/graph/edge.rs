//! Edge type and related structures.
//!
//! Edges are directed connections between mirrored nodes. Endpoints are
//! arena handles, not copies, so an edge always points at the node entry
//! the layout engine moves.

use serde_json::{Map, Value};

use super::node::NodeKey;

slotmap::new_key_type! {
    /// Arena handle of an edge inside an [`EdgeList`](super::EdgeList).
    pub struct EdgeKey;
}

/// One directed connection of the displayed graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Remote edge identifier, unique within the mirror.
    pub id: String,
    pub source: NodeKey,
    pub target: NodeKey,
    /// Full remote edge document.
    pub data: Map<String, Value>,
}

impl Edge {
    /// Create an edge without attributes.
    pub fn new(id: impl Into<String>, source: NodeKey, target: NodeKey) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            data: Map::new(),
        }
    }

    /// Attach the remote document.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// Whether `key` is one of the two endpoints.
    #[inline]
    pub fn touches(&self, key: NodeKey) -> bool {
        self.source == key || self.target == key
    }
}
