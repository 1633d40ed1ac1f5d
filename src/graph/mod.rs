//! Mirror data structures.
//!
//! The mirror is the client-side copy of the part of the remote graph that
//! has been loaded so far. Nodes and edges live in two slot-map arenas that
//! are shared (not copied) between the adapter, which adds and removes
//! entries, and the layout engine, which moves existing nodes.

mod edge;
mod mirror;
mod node;

pub use edge::{Edge, EdgeKey};
pub use mirror::{
    link, remove_node_cascade, shared, unlink, EdgeList, NodeList, Shared, SharedEdges,
    SharedNodes,
};
pub use node::{Node, NodeKey, NodeState};
