//! Graph Viewer - WASM Module
//!
//! Core of an interactive viewer for graphs held in a remote document
//! store. Compiled to WebAssembly, it exposes the force layout to
//! JavaScript via wasm-bindgen; the adapter and the store contract are
//! plain Rust and are driven by the embedding application.
//!
//! # Architecture
//!
//! - `graph`: The shared node/edge mirror (slotmap arenas)
//! - `spatial`: R-tree spatial indexing for hit testing
//! - `layout`: Force-directed simulation over the mirror
//! - `store`: Remote graph store contract and an in-memory store
//! - `adapter`: Keeps the mirror in step with the remote store
//! - `error`: Error types

use std::time::Duration;

use js_sys::Float32Array;
use serde::Deserialize;
use tracing::warn;
use wasm_bindgen::prelude::*;

pub mod adapter;
pub mod error;
pub mod graph;
pub mod layout;
pub mod spatial;
pub mod store;

use error::LayoutError;
use graph::{link, shared, Edge, EdgeList, Node, NodeKey, NodeList, SharedEdges, SharedNodes};
use layout::{LayoutConfig, LayoutEngine, TickOutcome};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// A node as handed over from JavaScript.
#[derive(Debug, Clone, Deserialize)]
struct JsNode {
    id: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
}

/// A link as handed over from JavaScript. Endpoints are node ids.
#[derive(Debug, Clone, Deserialize)]
struct JsLink {
    #[serde(default)]
    id: Option<String>,
    source: String,
    target: String,
}

/// Layout configuration object accepted by [`ForceLayoutWasm::new`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsLayoutConfig {
    nodes: Option<Vec<JsNode>>,
    links: Option<Vec<JsLink>>,
    width: Option<f64>,
    height: Option<f64>,
    gravity: Option<f64>,
    distance: Option<f64>,
    charge: Option<f64>,
    friction: Option<f64>,
    max_ticks: Option<u32>,
    max_duration_ms: Option<f64>,
}

impl JsLayoutConfig {
    /// Override the defaults in `layout` with the options that were given.
    fn apply(&self, layout: &mut LayoutConfig) {
        layout.width = self.width.unwrap_or(layout.width);
        layout.height = self.height.unwrap_or(layout.height);
        layout.gravity = self.gravity.unwrap_or(layout.gravity);
        layout.distance = self.distance.unwrap_or(layout.distance);
        layout.charge = self.charge.unwrap_or(layout.charge);
        layout.friction = self.friction.unwrap_or(layout.friction);
        layout.max_ticks = self.max_ticks.unwrap_or(layout.max_ticks);
        // Budgets too large for a Duration mean no time limit.
        if let Some(ms) = self.max_duration_ms.filter(|ms| *ms >= 0.0) {
            layout.max_duration = Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX);
        }
    }
}

/// Force layout exposed to JavaScript.
///
/// Nodes are addressed by their index in the `nodes` array of the
/// configuration. A repeated id shares the node of its first occurrence,
/// so every index stays valid. Drive the simulation with `tick()` once per animation
/// frame; `start()` runs it to completion in one call.
#[wasm_bindgen]
pub struct ForceLayoutWasm {
    engine: LayoutEngine,
    nodes: SharedNodes,
    edges: SharedEdges,
    /// Node handles in configuration order, one per configured node.
    order: Vec<NodeKey>,
}

impl ForceLayoutWasm {
    fn from_config(mut config: JsLayoutConfig) -> Result<Self, LayoutError> {
        let js_nodes = config.nodes.take().ok_or(LayoutError::NoNodes)?;
        let js_links = config.links.take().ok_or(LayoutError::NoLinks)?;

        let mut node_list = NodeList::with_capacity(js_nodes.len());
        let mut order = Vec::with_capacity(js_nodes.len());
        for js in js_nodes {
            let node = match (js.x, js.y) {
                (Some(x), Some(y)) => Node::at(js.id, x, y),
                _ => Node::new(js.id),
            };
            let (key, inserted) = node_list.insert_or_get(node);
            if !inserted {
                warn!(id = %node_list.get(key).map_or("", |n| n.id.as_str()), "duplicate node id");
            }
            order.push(key);
        }

        let mut edge_list = EdgeList::new();
        for (i, js) in js_links.into_iter().enumerate() {
            let (Some(source), Some(target)) =
                (node_list.key_of(&js.source), node_list.key_of(&js.target))
            else {
                warn!(source = %js.source, target = %js.target, "link to unknown node skipped");
                continue;
            };
            let id = js
                .id
                .unwrap_or_else(|| format!("{}->{}#{i}", js.source, js.target));
            link(&mut node_list, &mut edge_list, Edge::new(id, source, target));
        }

        let nodes = shared(node_list);
        let edges = shared(edge_list);
        let mut layout = LayoutConfig::new(nodes.clone(), edges.clone());
        config.apply(&mut layout);

        Ok(Self {
            engine: LayoutEngine::new(layout)?,
            nodes,
            edges,
            order,
        })
    }

    /// Positions as `[x0, y0, x1, y1, ...]` in configuration order.
    fn interleaved_positions(&self) -> Vec<f32> {
        let nodes = self.nodes.borrow();
        let mut positions = Vec::with_capacity(self.order.len() * 2);
        for key in &self.order {
            let (x, y) = nodes.get(*key).map_or((f64::NAN, f64::NAN), |n| (n.x, n.y));
            positions.push(x as f32);
            positions.push(y as f32);
        }
        positions
    }

    fn key(&self, index: u32) -> Option<NodeKey> {
        self.order.get(index as usize).copied()
    }

    fn index(&self, key: NodeKey) -> Option<u32> {
        self.order.iter().position(|k| *k == key).map(|i| i as u32)
    }
}

#[wasm_bindgen]
impl ForceLayoutWasm {
    /// Create a layout from a configuration object.
    ///
    /// `nodes` (`[{id, x?, y?}]`) and `links` (`[{source, target, id?}]`)
    /// are mandatory; the numeric options fall back to their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ForceLayoutWasm, JsError> {
        let config: JsLayoutConfig = serde_wasm_bindgen::from_value(config)?;
        Ok(Self::from_config(config)?)
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Arm a new run; then call `tick()` per frame.
    pub fn resume(&mut self) {
        self.engine.resume();
    }

    /// Advance one step. Returns false once the run is over.
    pub fn tick(&mut self) -> bool {
        self.engine.tick() == TickOutcome::Continue
    }

    /// Run to completion. Returns why the run ended.
    pub fn start(&mut self) -> String {
        self.engine.start().as_str().to_string()
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    #[wasm_bindgen(js_name = stopCount)]
    pub fn stop_count(&self) -> u32 {
        self.engine.stop_count()
    }

    pub fn ticks(&self) -> u32 {
        self.engine.ticks()
    }

    // =========================================================================
    // Positions
    // =========================================================================

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.order.len() as u32
    }

    #[wasm_bindgen(js_name = edgeCount)]
    pub fn edge_count(&self) -> u32 {
        self.edges.borrow().len() as u32
    }

    /// Node positions as a Float32Array `[x0, y0, x1, y1, ...]`.
    pub fn positions(&self) -> Float32Array {
        Float32Array::from(&self.interleaved_positions()[..])
    }

    /// Bounding box `[min_x, min_y, max_x, max_y]`, or None before seeding.
    #[wasm_bindgen(js_name = getBounds)]
    pub fn get_bounds(&self) -> Option<Vec<f32>> {
        self.nodes
            .borrow()
            .bounds()
            .map(|(min_x, min_y, max_x, max_y)| {
                vec![min_x as f32, min_y as f32, max_x as f32, max_y as f32]
            })
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Node index within `radius` of a point.
    #[wasm_bindgen(js_name = findNodeAt)]
    pub fn find_node_at(&mut self, x: f64, y: f64, radius: f64) -> Option<u32> {
        let key = self.engine.node_at(x, y, radius)?;
        self.index(key)
    }

    /// Indices of every node within `radius` of a point.
    #[wasm_bindgen(js_name = findNodesInRadius)]
    pub fn find_nodes_in_radius(&mut self, x: f64, y: f64, radius: f64) -> Vec<u32> {
        let keys = self.engine.nodes_within(x, y, radius);
        keys.into_iter().filter_map(|key| self.index(key)).collect()
    }

    #[wasm_bindgen(js_name = dragStart)]
    pub fn drag_start(&mut self, index: u32) -> bool {
        self.key(index).is_some_and(|key| self.engine.drag_start(key))
    }

    #[wasm_bindgen(js_name = dragTo)]
    pub fn drag_to(&mut self, index: u32, x: f64, y: f64) {
        if let Some(key) = self.key(index) {
            self.engine.drag_to(key, x, y);
        }
    }

    #[wasm_bindgen(js_name = dragEnd)]
    pub fn drag_end(&mut self, index: u32) {
        if let Some(key) = self.key(index) {
            self.engine.drag_end(key);
        }
    }
}
