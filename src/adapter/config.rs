//! Adapter configuration.

use crate::error::AdapterError;
use crate::store::Direction;

/// Configuration for [`GraphDataAdapter`](super::GraphDataAdapter).
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Remote collection holding the vertex documents. Mandatory.
    pub node_collection: String,
    /// Remote collection holding the edges. Mandatory.
    pub edge_collection: String,
    /// Maximum number of nodes a single expansion adds (default: unlimited).
    /// New children beyond it are grouped into community nodes.
    pub child_limit: Option<usize>,
    /// Maximum number of mirrored nodes (default: unlimited). Past it,
    /// older nodes are collapsed into a community.
    pub node_limit: Option<usize>,
    /// Canvas width used to place new nodes (default: 940).
    pub width: f64,
    /// Canvas height used to place new nodes (default: 640).
    pub height: f64,
    /// Which edges an expansion follows (default: outbound).
    pub direction: Direction,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            node_collection: String::new(),
            edge_collection: String::new(),
            child_limit: None,
            node_limit: None,
            width: 940.0,
            height: 640.0,
            direction: Direction::Outbound,
        }
    }
}

impl AdapterConfig {
    /// Default configuration over the given collections.
    pub fn new(node_collection: impl Into<String>, edge_collection: impl Into<String>) -> Self {
        Self {
            node_collection: node_collection.into(),
            edge_collection: edge_collection.into(),
            ..Self::default()
        }
    }

    pub fn with_child_limit(mut self, limit: usize) -> Self {
        self.child_limit = Some(limit);
        self
    }

    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.node_limit = Some(limit);
        self
    }

    /// Set the canvas size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Follow edges in both directions.
    pub fn undirected(mut self) -> Self {
        self.direction = Direction::Any;
        self
    }

    pub(crate) fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub(crate) fn validate(&self) -> Result<(), AdapterError> {
        if self.node_collection.is_empty() {
            return Err(AdapterError::MissingCollection("nodeCollection"));
        }
        if self.edge_collection.is_empty() {
            return Err(AdapterError::MissingCollection("edgeCollection"));
        }
        Ok(())
    }
}
