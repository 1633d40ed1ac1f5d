//! Force-directed layout simulation.
//!
//! Position-Verlet integration over the shared node arena. Every tick:
//!
//! 1. **Springs:** each link pulls its endpoints towards the rest `distance`.
//! 2. **Gravity:** every node is pulled linearly towards the canvas centre.
//! 3. **Charge:** every pair of nodes *not* joined by a link repels with a
//!    force falling off with distance.
//! 4. **Integration:** `x -= (px - x) * friction`, previous position kept
//!    in `px`/`py`.
//! 5. **Containment:** positions are clamped strictly inside the border
//!    `offset`.
//!
//! All forces are scaled by the temperature `alpha`, which cools
//! geometrically. A run ends when the nodes stop moving, the temperature
//! drops below `alpha_min`, or the tick/time budget is spent, whichever
//! comes first. Pacing (one tick per animation frame, or as fast as
//! possible) belongs to whoever drives [`LayoutEngine::tick`].

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::{debug, info, trace};

use super::clock::Stamp;
use super::config::LayoutConfig;
use super::seed::seed_unpositioned;
use super::shaper::{EdgeShaper, NodeShaper};
use crate::error::LayoutError;
use crate::graph::{NodeKey, SharedEdges, SharedNodes};
use crate::spatial::SpatialIndex;

/// Squared distance under which two nodes count as coincident.
const COINCIDENT_EPSILON: f64 = 1e-9;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Per-tick displacement fell below the convergence threshold.
    Converged,
    /// The temperature dropped below `alpha_min`.
    Cooled,
    /// `max_ticks` reached.
    TickLimit,
    /// `max_duration` elapsed.
    TimeLimit,
    /// `stop()` was called, directly or through a [`StopHandle`].
    Requested,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Converged => "converged",
            StopReason::Cooled => "cooled",
            StopReason::TickLimit => "tickLimit",
            StopReason::TimeLimit => "timeLimit",
            StopReason::Requested => "requested",
        }
    }
}

/// Result of a single scheduler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Schedule another tick.
    Continue,
    /// The run is over.
    Stopped(StopReason),
}

/// Cloneable request to stop the simulation, usable from inside a shaper.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Rc<Cell<bool>>,
}

impl StopHandle {
    /// Ask the engine to stop before the next tick.
    pub fn stop(&self) {
        self.requested.set(true);
    }

    fn take(&self) -> bool {
        self.requested.replace(false)
    }
}

/// Immutable simulation parameters extracted from [`LayoutConfig`].
#[derive(Debug, Clone, Copy)]
struct Params {
    width: f64,
    height: f64,
    gravity: f64,
    distance: f64,
    charge: f64,
    friction: f64,
    offset: f64,
    alpha: f64,
    alpha_decay: f64,
    alpha_min: f64,
    convergence_epsilon: f64,
    max_ticks: u32,
    max_duration: std::time::Duration,
}

/// The force layout engine.
pub struct LayoutEngine {
    nodes: SharedNodes,
    edges: SharedEdges,
    params: Params,

    /// Current temperature.
    alpha: f64,
    running: bool,
    ticks: u32,
    started_at: Option<Stamp>,
    last_stop: Option<StopReason>,
    stop_count: u32,
    stop_handle: StopHandle,

    node_shaper: Option<Box<dyn NodeShaper>>,
    edge_shaper: Option<Box<dyn EdgeShaper>>,

    /// Node currently held by the pointer.
    dragged: Option<NodeKey>,

    spatial: SpatialIndex,
    spatial_dirty: bool,
}

impl LayoutEngine {
    /// Create an engine over the arenas named in `config`.
    ///
    /// Fails if `nodes` or `links` is missing or the canvas cannot hold the
    /// border offset.
    pub fn new(config: LayoutConfig) -> Result<Self, LayoutError> {
        let (nodes, edges) = config.validate()?;
        let params = Params {
            width: config.width,
            height: config.height,
            gravity: config.gravity,
            distance: config.distance,
            charge: config.charge,
            friction: config.friction,
            offset: config.offset,
            alpha: config.alpha,
            alpha_decay: config.alpha_decay,
            alpha_min: config.alpha_min,
            convergence_epsilon: config.convergence_epsilon,
            max_ticks: config.max_ticks,
            max_duration: config.max_duration,
        };
        Ok(Self {
            nodes,
            edges,
            params,
            alpha: 0.0,
            running: false,
            ticks: 0,
            started_at: None,
            last_stop: None,
            stop_count: 0,
            stop_handle: StopHandle::default(),
            node_shaper: None,
            edge_shaper: None,
            dragged: None,
            spatial: SpatialIndex::new(),
            spatial_dirty: true,
        })
    }

    /// Register the per-tick collaborators.
    pub fn set_combined_update_function(
        &mut self,
        node_shaper: Box<dyn NodeShaper>,
        edge_shaper: Box<dyn EdgeShaper>,
    ) {
        self.node_shaper = Some(node_shaper);
        self.edge_shaper = Some(edge_shaper);
    }

    /// Handle that stops the engine from outside (or inside) a tick.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of times a running simulation has been stopped.
    pub fn stop_count(&self) -> u32 {
        self.stop_count
    }

    /// Reason the last run ended.
    pub fn last_stop(&self) -> Option<StopReason> {
        self.last_stop
    }

    /// Ticks executed in the current (or last) run.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Current temperature.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Canvas centre.
    pub fn center(&self) -> (f64, f64) {
        (self.params.width / 2.0, self.params.height / 2.0)
    }

    /// Arm a new run without driving it: re-heat, reset the budgets and seed
    /// nodes that have no position yet. The caller then calls
    /// [`tick`](Self::tick) at its own pace.
    pub fn resume(&mut self) {
        let (cx, cy) = self.center();
        let seeded = seed_unpositioned(&mut self.nodes.borrow_mut(), cx, cy);
        if seeded > 0 {
            debug!(seeded, "seeded unpositioned nodes");
        }
        self.stop_handle.take();
        self.alpha = self.params.alpha;
        self.ticks = 0;
        self.started_at = Some(Stamp::now());
        self.last_stop = None;
        self.running = true;
        self.spatial_dirty = true;
    }

    /// Run the simulation until it stops on its own or is stopped.
    pub fn start(&mut self) -> StopReason {
        self.resume();
        loop {
            if let TickOutcome::Stopped(reason) = self.tick() {
                return reason;
            }
        }
    }

    /// Halt the simulation. Calling it on a stopped engine does nothing.
    pub fn stop(&mut self) {
        self.halt(StopReason::Requested);
    }

    fn halt(&mut self, reason: StopReason) {
        if !self.running {
            return;
        }
        self.running = false;
        self.last_stop = Some(reason);
        self.stop_count += 1;
        info!(?reason, ticks = self.ticks, "layout stopped");
    }

    /// Advance the simulation by one step.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Stopped(self.last_stop.unwrap_or(StopReason::Requested));
        }
        if let Some(reason) = self.budget_exhausted() {
            self.halt(reason);
            return TickOutcome::Stopped(reason);
        }

        self.alpha *= self.params.alpha_decay;
        if self.alpha < self.params.alpha_min {
            self.halt(StopReason::Cooled);
            return TickOutcome::Stopped(StopReason::Cooled);
        }
        self.ticks += 1;

        let displacement = self.step();
        self.spatial_dirty = true;
        let change = self.notify_shapers(displacement);
        trace!(tick = self.ticks, alpha = self.alpha, displacement, change, "layout tick");

        if self.stop_handle.take() {
            self.halt(StopReason::Requested);
            return TickOutcome::Stopped(StopReason::Requested);
        }
        if change < self.params.convergence_epsilon {
            self.halt(StopReason::Converged);
            return TickOutcome::Stopped(StopReason::Converged);
        }
        TickOutcome::Continue
    }

    fn budget_exhausted(&self) -> Option<StopReason> {
        if self.stop_handle.take() {
            return Some(StopReason::Requested);
        }
        if self.ticks >= self.params.max_ticks {
            return Some(StopReason::TickLimit);
        }
        let elapsed = self.started_at.map(Stamp::elapsed).unwrap_or_default();
        if elapsed >= self.params.max_duration {
            return Some(StopReason::TimeLimit);
        }
        None
    }

    fn notify_shapers(&mut self, displacement: f64) -> f64 {
        let nodes = self.nodes.borrow();
        let change = match self.node_shaper.as_mut() {
            Some(shaper) => shaper.update_nodes(&nodes, displacement),
            None => displacement,
        };
        if let Some(shaper) = self.edge_shaper.as_mut() {
            shaper.update_edges(&nodes, &self.edges.borrow());
        }
        change
    }

    /// One integration step. Returns the total distance moved.
    fn step(&mut self) -> f64 {
        let p = self.params;
        let alpha = self.alpha;
        let mut nodes = self.nodes.borrow_mut();
        let edges = self.edges.borrow();
        let (cx, cy) = (p.width / 2.0, p.height / 2.0);

        // Dense SoA snapshot of the arena.
        let n = nodes.len();
        if n == 0 {
            return 0.0;
        }
        let mut keys = Vec::with_capacity(n);
        let mut slot: HashMap<NodeKey, usize> = HashMap::with_capacity(n);
        let mut pos_x = Vec::with_capacity(n);
        let mut pos_y = Vec::with_capacity(n);
        let mut prev_x = Vec::with_capacity(n);
        let mut prev_y = Vec::with_capacity(n);
        let mut pinned = Vec::with_capacity(n);
        for (key, node) in nodes.iter() {
            slot.insert(key, keys.len());
            keys.push(key);
            let (x, y) = if node.is_positioned() { (node.x, node.y) } else { (cx, cy) };
            pos_x.push(x);
            pos_y.push(y);
            prev_x.push(if node.px.is_finite() { node.px } else { x });
            prev_y.push(if node.py.is_finite() { node.py } else { y });
            pinned.push(node.state.is_pinned());
        }

        // Springs.
        let mut connected: HashSet<(usize, usize)> = HashSet::with_capacity(edges.len());
        for (_, edge) in edges.iter() {
            let (Some(&s), Some(&t)) = (slot.get(&edge.source), slot.get(&edge.target)) else {
                continue;
            };
            if s == t {
                continue;
            }
            connected.insert((s.min(t), s.max(t)));
            let mut dx = pos_x[t] - pos_x[s];
            let mut dy = pos_y[t] - pos_y[s];
            let len = (dx * dx + dy * dy).sqrt();
            if len <= f64::EPSILON {
                continue;
            }
            let k = alpha * (len - p.distance) / len;
            dx *= k;
            dy *= k;
            pos_x[t] -= dx * 0.5;
            pos_y[t] -= dy * 0.5;
            pos_x[s] += dx * 0.5;
            pos_y[s] += dy * 0.5;
        }

        // Gravity.
        let k = alpha * p.gravity;
        for i in 0..n {
            pos_x[i] += (cx - pos_x[i]) * k;
            pos_y[i] += (cy - pos_y[i]) * k;
        }

        // Charge between unconnected pairs.
        for i in 0..n {
            for j in (i + 1)..n {
                if !connected.is_empty() && connected.contains(&(i, j)) {
                    continue;
                }
                let mut dx = pos_x[j] - pos_x[i];
                let mut dy = pos_y[j] - pos_y[i];
                let mut l2 = dx * dx + dy * dy;
                if l2 < COINCIDENT_EPSILON {
                    // Deterministic nudge so coincident nodes separate.
                    dx = 0.1 * (j - i) as f64;
                    dy = 0.1;
                    l2 = dx * dx + dy * dy;
                }
                let f = alpha * p.charge / l2;
                pos_x[j] -= dx * f;
                pos_y[j] -= dy * f;
                pos_x[i] += dx * f;
                pos_y[i] += dy * f;
            }
        }

        // Integrate, contain, write back.
        let (min_x, max_x) = (p.offset + 1.0, p.width - p.offset - 1.0);
        let (min_y, max_y) = (p.offset + 1.0, p.height - p.offset - 1.0);
        let mut displacement = 0.0;
        for (i, &key) in keys.iter().enumerate() {
            let Some(node) = nodes.get_mut(key) else {
                continue;
            };
            if pinned[i] {
                node.px = node.x;
                node.py = node.y;
                continue;
            }
            let (fx, fy) = (pos_x[i], pos_y[i]);
            let mut x = fx - (prev_x[i] - fx) * p.friction;
            let mut y = fy - (prev_y[i] - fy) * p.friction;
            if !x.is_finite() || !y.is_finite() {
                x = cx;
                y = cy;
            }
            x = x.clamp(min_x.min(max_x), max_x.max(min_x));
            y = y.clamp(min_y.min(max_y), max_y.max(min_y));
            displacement += ((x - fx).powi(2) + (y - fy).powi(2)).sqrt();
            node.px = fx;
            node.py = fy;
            node.x = x;
            node.y = y;
        }
        displacement
    }

    // =========================================================================
    // Dragging
    // =========================================================================

    /// Pin a node under the pointer and re-heat the simulation.
    pub fn drag_start(&mut self, key: NodeKey) -> bool {
        let mut nodes = self.nodes.borrow_mut();
        let Some(node) = nodes.get_mut(key) else {
            return false;
        };
        node.state.set_pinned(true);
        drop(nodes);
        self.dragged = Some(key);
        self.reheat();
        true
    }

    /// Move the dragged node. Positions are kept inside the canvas border.
    pub fn drag_to(&mut self, key: NodeKey, x: f64, y: f64) {
        let p = self.params;
        let x = x.clamp(p.offset + 1.0, (p.width - p.offset - 1.0).max(p.offset + 1.0));
        let y = y.clamp(p.offset + 1.0, (p.height - p.offset - 1.0).max(p.offset + 1.0));
        if let Some(node) = self.nodes.borrow_mut().get_mut(key) {
            node.place(x, y);
            self.spatial_dirty = true;
        }
        self.reheat();
    }

    /// Release the dragged node back to the simulation.
    pub fn drag_end(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(key) {
            node.state.set_pinned(false);
        }
        if self.dragged == Some(key) {
            self.dragged = None;
        }
    }

    /// Node currently being dragged.
    pub fn dragged(&self) -> Option<NodeKey> {
        self.dragged
    }

    fn reheat(&mut self) {
        if !self.running {
            self.resume();
        } else {
            self.alpha = self.alpha.max(self.params.alpha);
            self.ticks = 0;
            self.started_at = Some(Stamp::now());
        }
    }

    /// Node within `radius` of `(x, y)`, for picking a drag target.
    pub fn node_at(&mut self, x: f64, y: f64, radius: f64) -> Option<NodeKey> {
        self.refresh_spatial();
        self.spatial.nearest_within(x, y, radius)
    }

    /// Every node within `radius` of `(x, y)`.
    pub fn nodes_within(&mut self, x: f64, y: f64, radius: f64) -> Vec<NodeKey> {
        self.refresh_spatial();
        self.spatial.in_radius(x, y, radius)
    }

    fn refresh_spatial(&mut self) {
        if self.spatial_dirty {
            self.spatial.rebuild(&self.nodes.borrow());
            self.spatial_dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::graph::{link, shared, Edge, EdgeList, Node, NodeList};

    const WIDTH: f64 = 940.0;
    const HEIGHT: f64 = 640.0;
    const OFFSET: f64 = 10.0;

    /// Deterministic pseudo-random positions spread over the canvas.
    fn scattered(n: usize) -> NodeList {
        let mut nodes = NodeList::with_capacity(n);
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f64 / 10_000.0
        };
        for i in 0..n {
            let x = OFFSET + 1.0 + next() * (WIDTH - 2.0 * OFFSET - 2.0);
            let y = OFFSET + 1.0 + next() * (HEIGHT - 2.0 * OFFSET - 2.0);
            nodes.insert_or_get(Node::at(format!("v/{i}"), x, y));
        }
        nodes
    }

    fn engine(nodes: NodeList, edges: EdgeList) -> (LayoutEngine, SharedNodes) {
        let nodes = shared(nodes);
        let config = LayoutConfig::new(nodes.clone(), shared(edges));
        (LayoutEngine::new(config).unwrap(), nodes)
    }

    fn distance(nodes: &NodeList, a: &str, b: &str) -> f64 {
        let a = nodes.by_id(a).unwrap();
        let b = nodes.by_id(b).unwrap();
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    fn assert_contained(nodes: &NodeList) {
        for (_, node) in nodes.iter() {
            assert!(node.x > OFFSET && node.x < WIDTH - OFFSET, "x out of bounds: {node:?}");
            assert!(node.y > OFFSET && node.y < HEIGHT - OFFSET, "y out of bounds: {node:?}");
        }
    }

    #[test]
    fn test_missing_nodes_or_links_fail() {
        let config = LayoutConfig {
            links: Some(shared(EdgeList::new())),
            ..LayoutConfig::default()
        };
        assert_eq!(LayoutEngine::new(config).err(), Some(LayoutError::NoNodes));

        let config = LayoutConfig {
            nodes: Some(shared(NodeList::new())),
            ..LayoutConfig::default()
        };
        assert_eq!(LayoutEngine::new(config).err(), Some(LayoutError::NoLinks));
    }

    #[test]
    fn test_single_node_is_centered() {
        let mut nodes = NodeList::new();
        nodes.insert_or_get(Node::at("v/0", 40.0, 600.0));
        let (mut engine, nodes) = engine(nodes, EdgeList::new());

        engine.start();

        let nodes = nodes.borrow();
        let node = nodes.by_id("v/0").unwrap();
        assert!((node.x - WIDTH / 2.0).abs() < 1.0, "x = {}", node.x);
        assert!((node.y - HEIGHT / 2.0).abs() < 1.0, "y = {}", node.y);
    }

    #[test]
    fn test_unconnected_nodes_stay_close() {
        let (mut engine, nodes) = engine(scattered(4), EdgeList::new());
        engine.start();

        let nodes = nodes.borrow();
        for a in 0..4 {
            for b in (a + 1)..4 {
                let d = distance(&nodes, &format!("v/{a}"), &format!("v/{b}"));
                assert!(d < 100.0, "v/{a} and v/{b} are {d} apart");
            }
        }
    }

    #[test]
    fn test_linked_nodes_keep_distance() {
        for rest in [50.0, 100.0, 200.0] {
            let mut nodes = NodeList::new();
            let (a, _) = nodes.insert_or_get(Node::at("v/a", 100.0, 100.0));
            let (b, _) = nodes.insert_or_get(Node::at("v/b", 700.0, 500.0));
            let mut edges = EdgeList::new();
            link(&mut nodes, &mut edges, Edge::new("e/ab", a, b));

            let nodes = shared(nodes);
            let config =
                LayoutConfig::new(nodes.clone(), shared(edges)).with_distance(rest);
            let mut engine = LayoutEngine::new(config).unwrap();
            engine.start();

            let d = distance(&nodes.borrow(), "v/a", "v/b");
            assert!((d - rest).abs() < 100.0, "rest {rest}: distance {d}");
        }
    }

    #[test]
    fn test_containment_for_many_nodes() {
        for n in [1, 4, 50, 500] {
            let (mut engine, nodes) = engine(scattered(n), EdgeList::new());
            let started = Instant::now();
            engine.start();
            assert!(started.elapsed() < Duration::from_secs(10), "{n} nodes too slow");
            assert!(!engine.is_running());
            assert_eq!(engine.stop_count(), 1);
            assert_contained(&nodes.borrow());
        }
    }

    #[test]
    fn test_unpositioned_nodes_are_seeded() {
        let mut nodes = NodeList::new();
        for i in 0..10 {
            nodes.insert_or_get(Node::new(format!("v/{i}")));
        }
        let (mut engine, nodes) = engine(nodes, EdgeList::new());
        engine.start();
        let nodes = nodes.borrow();
        assert!(nodes.iter().all(|(_, n)| n.is_positioned()));
        assert_contained(&nodes);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut engine, _) = engine(scattered(3), EdgeList::new());
        engine.stop();
        assert_eq!(engine.stop_count(), 0);

        engine.resume();
        assert!(engine.is_running());
        engine.stop();
        engine.stop();
        assert_eq!(engine.stop_count(), 1);
        assert_eq!(engine.last_stop(), Some(StopReason::Requested));
        assert_eq!(engine.tick(), TickOutcome::Stopped(StopReason::Requested));
    }

    #[test]
    fn test_tick_limit_bounds_the_run() {
        let nodes = shared(scattered(20));
        let config = LayoutConfig {
            max_ticks: 5,
            ..LayoutConfig::new(nodes, shared(EdgeList::new()))
        };
        let mut engine = LayoutEngine::new(config).unwrap();
        assert_eq!(engine.start(), StopReason::TickLimit);
        assert_eq!(engine.ticks(), 5);
    }

    #[test]
    fn test_time_limit_bounds_the_run() {
        let nodes = shared(scattered(20));
        let config = LayoutConfig {
            max_duration: Duration::ZERO,
            ..LayoutConfig::new(nodes, shared(EdgeList::new()))
        };
        let mut engine = LayoutEngine::new(config).unwrap();
        assert_eq!(engine.start(), StopReason::TimeLimit);
    }

    struct CountingShaper {
        calls: Rc<Cell<u32>>,
        stop_after: u32,
        handle: StopHandle,
    }

    impl NodeShaper for CountingShaper {
        fn update_nodes(&mut self, _nodes: &NodeList, displacement: f64) -> f64 {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == self.stop_after {
                self.handle.stop();
            }
            displacement
        }
    }

    struct EdgeCounter(Rc<Cell<u32>>);

    impl EdgeShaper for EdgeCounter {
        fn update_edges(&mut self, _nodes: &NodeList, _edges: &EdgeList) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_shaper_can_stop_from_inside_a_tick() {
        let (mut engine, _) = engine(scattered(10), EdgeList::new());
        let node_calls = Rc::new(Cell::new(0));
        let edge_calls = Rc::new(Cell::new(0));
        engine.set_combined_update_function(
            Box::new(CountingShaper {
                calls: node_calls.clone(),
                stop_after: 3,
                handle: engine.stop_handle(),
            }),
            Box::new(EdgeCounter(edge_calls.clone())),
        );

        assert_eq!(engine.start(), StopReason::Requested);
        assert_eq!(node_calls.get(), 3);
        assert_eq!(edge_calls.get(), 3);
        assert_eq!(engine.stop_count(), 1);
    }

    struct Settled;

    impl NodeShaper for Settled {
        fn update_nodes(&mut self, _nodes: &NodeList, _displacement: f64) -> f64 {
            0.0
        }
    }

    struct NoEdges;

    impl EdgeShaper for NoEdges {
        fn update_edges(&mut self, _nodes: &NodeList, _edges: &EdgeList) {}
    }

    #[test]
    fn test_shaper_change_distance_drives_convergence() {
        let (mut engine, _) = engine(scattered(10), EdgeList::new());
        engine.set_combined_update_function(Box::new(Settled), Box::new(NoEdges));
        assert_eq!(engine.start(), StopReason::Converged);
        assert_eq!(engine.ticks(), 1);
    }

    #[test]
    fn test_dragged_node_is_not_moved() {
        let (mut engine, nodes) = engine(scattered(5), EdgeList::new());
        let key = nodes.borrow().key_of("v/0").unwrap();

        assert!(engine.drag_start(key));
        assert!(engine.is_running());
        engine.drag_to(key, 123.0, 234.0);
        for _ in 0..20 {
            engine.tick();
        }
        {
            let nodes = nodes.borrow();
            let node = nodes.get(key).unwrap();
            assert_eq!((node.x, node.y), (123.0, 234.0));
        }

        engine.drag_end(key);
        assert_eq!(engine.dragged(), None);
        engine.start();
        assert!(!nodes.borrow().get(key).unwrap().state.is_pinned());
    }

    #[test]
    fn test_drag_is_contained() {
        let (mut engine, nodes) = engine(scattered(2), EdgeList::new());
        let key = nodes.borrow().key_of("v/1").unwrap();
        engine.drag_start(key);
        engine.drag_to(key, -50.0, 5_000.0);
        let nodes = nodes.borrow();
        let node = nodes.get(key).unwrap();
        assert!(node.x > OFFSET && node.y < HEIGHT - OFFSET);
    }

    #[test]
    fn test_node_at_finds_drag_target() {
        let mut nodes = NodeList::new();
        let (a, _) = nodes.insert_or_get(Node::at("v/a", 100.0, 100.0));
        nodes.insert_or_get(Node::at("v/b", 400.0, 400.0));
        let (mut engine, _) = engine(nodes, EdgeList::new());

        assert_eq!(engine.node_at(102.0, 99.0, 5.0), Some(a));
        assert_eq!(engine.node_at(250.0, 250.0, 5.0), None);
    }

    #[test]
    fn test_restart_after_new_nodes() {
        let (mut engine, nodes) = engine(scattered(3), EdgeList::new());
        engine.start();
        nodes.borrow_mut().insert_or_get(Node::new("v/late"));
        engine.start();
        assert_eq!(engine.stop_count(), 2);
        let nodes = nodes.borrow();
        assert!(nodes.by_id("v/late").unwrap().is_positioned());
        assert_contained(&nodes);
    }
}
