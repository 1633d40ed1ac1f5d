//! Per-tick collaborators of the layout engine.
//!
//! The rendering layer implements these to redraw after every tick. The
//! engine never depends on anything else from the renderer.

use crate::graph::{EdgeList, NodeList};

/// Receives the nodes after every tick.
pub trait NodeShaper {
    /// Redraw or measure the nodes.
    ///
    /// `displacement` is the total distance the nodes moved during the tick.
    /// The returned change distance decides convergence; return
    /// `displacement` unchanged to let the engine's own measure decide.
    fn update_nodes(&mut self, nodes: &NodeList, displacement: f64) -> f64;
}

/// Receives the edges after every tick.
pub trait EdgeShaper {
    /// Redraw the edges.
    fn update_edges(&mut self, nodes: &NodeList, edges: &EdgeList);
}
