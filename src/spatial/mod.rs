//! Spatial indexing for O(log n) hit testing.
//!
//! This module provides an R-tree based spatial index used to find the node
//! under the pointer when a drag starts.

mod rtree;

pub use rtree::SpatialIndex;
