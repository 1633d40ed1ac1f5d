//! Initial placement for nodes that have no position yet.
//!
//! Nodes are laid on a golden-angle (phyllotaxis) spiral so that no two
//! seeds coincide and the simulation starts from an even spread.

use crate::graph::NodeList;

/// Radius of the innermost spiral ring.
const INITIAL_RADIUS: f64 = 10.0;

/// The `i`-th point of a golden-angle spiral around `(cx, cy)`.
pub fn spiral_point(cx: f64, cy: f64, i: usize) -> (f64, f64) {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    let r = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
    let theta = i as f64 * golden_angle;
    (cx + r * theta.cos(), cy + r * theta.sin())
}

/// Place every unpositioned node on a spiral around `(cx, cy)`.
///
/// Returns the number of nodes placed.
pub fn seed_unpositioned(nodes: &mut NodeList, cx: f64, cy: f64) -> usize {
    let mut placed = 0;
    for (_, node) in nodes.iter_mut().filter(|(_, n)| !n.is_positioned()) {
        let (x, y) = spiral_point(cx, cy, placed);
        node.place(x, y);
        placed += 1;
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    #[test]
    fn test_spiral_points_are_distinct() {
        let points: Vec<_> = (0..50).map(|i| spiral_point(0.0, 0.0, i)).collect();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                let d = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
                assert!(d > 1.0, "spiral points too close: {a:?} {b:?}");
            }
        }
    }

    #[test]
    fn test_seed_only_touches_unpositioned() {
        let mut nodes = NodeList::new();
        let (fixed, _) = nodes.insert_or_get(Node::at("v/fixed", 1.0, 2.0));
        let (loose, _) = nodes.insert_or_get(Node::new("v/loose"));

        assert_eq!(seed_unpositioned(&mut nodes, 100.0, 100.0), 1);
        assert_eq!(nodes.get(fixed).map(|n| (n.x, n.y)), Some((1.0, 2.0)));
        let loose = nodes.get(loose).unwrap();
        assert!(loose.is_positioned());
        assert!((loose.x - 100.0).abs() < 20.0 && (loose.y - 100.0).abs() < 20.0);
    }
}
