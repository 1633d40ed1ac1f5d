//! Layout engine configuration.

use std::time::Duration;

use crate::error::LayoutError;
use crate::graph::{SharedEdges, SharedNodes};

/// Configuration for the force layout.
///
/// `nodes` and `links` are mandatory; everything else has a default.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// The shared node arena the engine moves.
    pub nodes: Option<SharedNodes>,
    /// The shared edge arena whose entries act as springs.
    pub links: Option<SharedEdges>,
    /// Canvas width (default: 940).
    pub width: f64,
    /// Canvas height (default: 640).
    pub height: f64,
    /// Strength of the pull towards the canvas centre (default: 0.08).
    pub gravity: f64,
    /// Rest length of a link (default: 100).
    pub distance: f64,
    /// Repulsion between unconnected nodes; negative pushes apart (default: -60).
    pub charge: f64,
    /// Velocity retained per tick (default: 0.9).
    pub friction: f64,
    /// Border no node may cross (default: 10).
    pub offset: f64,
    /// Initial simulation temperature (default: 0.1).
    pub alpha: f64,
    /// Per-tick cooling factor (default: 0.99).
    pub alpha_decay: f64,
    /// Temperature below which the simulation stops (default: 0.005).
    pub alpha_min: f64,
    /// Total per-tick displacement under which the layout counts as settled (default: 0.01).
    pub convergence_epsilon: f64,
    /// Hard cap on ticks per run (default: 1000).
    pub max_ticks: u32,
    /// Hard cap on wall-clock time per run (default: 5s).
    pub max_duration: Duration,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            nodes: None,
            links: None,
            width: 940.0,
            height: 640.0,
            gravity: 0.08,
            distance: 100.0,
            charge: -60.0,
            friction: 0.9,
            offset: 10.0,
            alpha: 0.1,
            alpha_decay: 0.99,
            alpha_min: 0.005,
            convergence_epsilon: 0.01,
            max_ticks: 1000,
            max_duration: Duration::from_secs(5),
        }
    }
}

impl LayoutConfig {
    /// Default configuration over the given arenas.
    pub fn new(nodes: SharedNodes, links: SharedEdges) -> Self {
        Self {
            nodes: Some(nodes),
            links: Some(links),
            ..Self::default()
        }
    }

    /// Set the canvas size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Check the mandatory fields and canvas, handing back the two arenas.
    pub(crate) fn validate(&self) -> Result<(SharedNodes, SharedEdges), LayoutError> {
        let nodes = self.nodes.clone().ok_or(LayoutError::NoNodes)?;
        let links = self.links.clone().ok_or(LayoutError::NoLinks)?;
        let min_extent = 2.0 * self.offset;
        if !(self.width > min_extent && self.height > min_extent) {
            return Err(LayoutError::InvalidCanvas {
                width: self.width,
                height: self.height,
                offset: self.offset,
            });
        }
        Ok((nodes, links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{shared, EdgeList, NodeList};

    #[test]
    fn test_missing_nodes() {
        let config = LayoutConfig {
            links: Some(shared(EdgeList::new())),
            ..LayoutConfig::default()
        };
        assert_eq!(config.validate().err(), Some(LayoutError::NoNodes));
    }

    #[test]
    fn test_missing_links() {
        let config = LayoutConfig {
            nodes: Some(shared(NodeList::new())),
            ..LayoutConfig::default()
        };
        assert_eq!(config.validate().err(), Some(LayoutError::NoLinks));
    }

    #[test]
    fn test_empty_lists_are_valid() {
        let config = LayoutConfig::new(shared(NodeList::new()), shared(EdgeList::new()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_canvas_must_fit_offset() {
        let config = LayoutConfig::new(shared(NodeList::new()), shared(EdgeList::new()))
            .with_size(15.0, 400.0);
        assert!(matches!(
            config.validate(),
            Err(LayoutError::InvalidCanvas { .. })
        ));
    }
}
