use glam::Vec2;
use rand::Rng;

use super::graph::{Graph, NodeId};
use super::node::NodeRole;

/// Radius of the singular center node.
pub const CENTER_RADIUS: f32 = 8.0;
/// Radius of the initial ring of core nodes.
pub const RING_RADIUS: f32 = 5.0;
/// Radius of nodes spawned during the animation.
pub const SPAWN_RADIUS: f32 = 4.0;
/// Number of core nodes arranged around the center.
pub const RING_COUNT: usize = 5;
/// Distance of the ring nodes from the center.
pub const RING_DISTANCE: f32 = 100.0;
/// Spawned nodes are clamped to stay this far inside every surface edge.
pub const EDGE_MARGIN: f32 = 20.0;

const SPAWN_DISTANCE_MIN: f32 = 50.0;
const SPAWN_DISTANCE_MAX: f32 = 100.0;
/// Chance that a freshly spawned node gains a second edge right away.
const SECOND_LINK_CHANCE: f64 = 0.3;
/// Bound on random re-picks when searching for an unlinked complex pair.
/// The pick degrades to a no-op for that frame once exhausted, so a densely
/// connected subgraph cannot stall the tick.
const CROSS_LINK_ATTEMPTS: u32 = 16;

/// Per-frame growth probabilities. Kept separate from the animator so
/// scenario tests can pin the gates open or shut.
#[derive(Debug, Clone, Copy)]
pub struct GrowthConfig {
    /// Chance per frame of spawning a new complex node.
    pub spawn_chance: f64,
    /// Chance per frame of wiring two existing complex nodes together.
    pub cross_link_chance: f64,
    /// Spawning stops once this many complex nodes exist.
    pub max_complex: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            spawn_chance: 0.02,
            cross_link_chance: 0.01,
            max_complex: 50,
        }
    }
}

/// Owns the node graph and advances it one frame at a time. Host-agnostic:
/// the caller drives `tick` from whatever redraw scheduler it has and reads
/// the graph back out for drawing.
#[derive(Debug)]
pub struct Animator {
    graph: Graph,
    core_count: usize,
    bounds: Vec2,
    config: GrowthConfig,
}

impl Animator {
    /// Seeds the core cluster: one center node in the middle of the surface
    /// and `RING_COUNT` nodes on a circle around it, each linked only to the
    /// center.
    pub fn new(width: f32, height: f32, config: GrowthConfig) -> Self {
        let mut graph = Graph::new();
        let center_pos = Vec2::new(width / 2.0, height / 2.0);
        let center = graph.add(center_pos, CENTER_RADIUS, NodeRole::Core);

        for i in 0..RING_COUNT {
            let angle = (i as f32 / RING_COUNT as f32) * std::f32::consts::TAU;
            let position = center_pos + Vec2::from_angle(angle) * RING_DISTANCE;
            let ring = graph.add(position, RING_RADIUS, NodeRole::Core);
            graph.connect(ring, center);
        }

        let core_count = graph.len();
        Self {
            graph,
            core_count,
            bounds: Vec2::new(width, height),
            config,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    pub fn complex_len(&self) -> usize {
        self.graph.len() - self.core_count
    }

    /// New surface extent. Node coordinates are absolute and stay put; only
    /// the clamp bounds for future spawns change.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.bounds = Vec2::new(width, height);
    }

    /// Advance one frame: retire pulses, then roll the two growth gates.
    pub fn tick(&mut self, rng: &mut impl Rng) {
        for id in 0..self.graph.len() {
            self.graph.node_mut(id).decay_pulse();
        }
        self.maybe_spawn(rng);
        self.maybe_cross_link(rng);
    }

    fn maybe_spawn(&mut self, rng: &mut impl Rng) {
        if self.complex_len() >= self.config.max_complex || !rng.gen_bool(self.config.spawn_chance)
        {
            return;
        }

        let existing = self.graph.len();
        let source = rng.gen_range(0..existing);

        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = rng.gen_range(SPAWN_DISTANCE_MIN..SPAWN_DISTANCE_MAX);
        let position = spawn_position(self.graph.node(source).position, angle, distance, self.bounds);

        let spawned = self.graph.add(position, SPAWN_RADIUS, NodeRole::Complex);
        self.graph.connect(spawned, source);

        // Occasionally wire in a second anchor for extra tangle.
        if existing > 2 && rng.gen_bool(SECOND_LINK_CHANCE) {
            let other = loop {
                let candidate = rng.gen_range(0..existing);
                if candidate != source {
                    break candidate;
                }
            };
            self.graph.connect(spawned, other);
        }

        self.graph.node_mut(spawned).trigger_pulse();
    }

    fn maybe_cross_link(&mut self, rng: &mut impl Rng) {
        if self.complex_len() <= 5 || !rng.gen_bool(self.config.cross_link_chance) {
            return;
        }

        let first = self.random_complex(rng);
        for _ in 0..CROSS_LINK_ATTEMPTS {
            let second = self.random_complex(rng);
            if second != first && !self.graph.are_connected(first, second) {
                self.graph.connect(first, second);
                self.graph.node_mut(first).trigger_pulse();
                self.graph.node_mut(second).trigger_pulse();
                return;
            }
        }
    }

    fn random_complex(&self, rng: &mut impl Rng) -> NodeId {
        rng.gen_range(self.core_count..self.graph.len())
    }
}

/// Where a node spawned off `source` at the given angle and distance lands,
/// after clamping to keep `EDGE_MARGIN` units inside the surface. The clamp
/// pins to the near margin when the surface is narrower than two margins.
pub fn spawn_position(source: Vec2, angle: f32, distance: f32, bounds: Vec2) -> Vec2 {
    let raw = source + Vec2::from_angle(angle) * distance;
    Vec2::new(
        raw.x.min(bounds.x - EDGE_MARGIN).max(EDGE_MARGIN),
        raw.y.min(bounds.y - EDGE_MARGIN).max(EDGE_MARGIN),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn frozen() -> GrowthConfig {
        GrowthConfig {
            spawn_chance: 0.0,
            cross_link_chance: 0.0,
            ..GrowthConfig::default()
        }
    }

    fn edge_count(animator: &Animator) -> usize {
        animator
            .graph()
            .iter()
            .map(|(_, node)| node.links.len())
            .sum()
    }

    #[test]
    fn init_seeds_center_plus_ring() {
        let animator = Animator::new(800.0, 600.0, GrowthConfig::default());
        let graph = animator.graph();

        assert_eq!(graph.len(), 1 + RING_COUNT);
        assert_eq!(animator.complex_len(), 0);

        let center = graph.node(0);
        assert_eq!(center.role, NodeRole::Core);
        assert_eq!(center.radius, CENTER_RADIUS);
        assert_eq!(center.position, Vec2::new(400.0, 300.0));
        assert_eq!(center.links.len(), RING_COUNT);

        for id in 1..=RING_COUNT {
            let ring = graph.node(id);
            assert_eq!(ring.role, NodeRole::Core);
            assert_eq!(ring.radius, RING_RADIUS);
            assert_eq!(ring.links.len(), 1, "ring node {id} links only the center");
            assert!(ring.links.contains(&0));
            let offset = ring.position - center.position;
            assert!((offset.length() - RING_DISTANCE).abs() < 1e-3);
        }
    }

    #[test]
    fn closed_gates_leave_the_graph_untouched() {
        let mut animator = Animator::new(800.0, 600.0, frozen());
        let mut rng = StdRng::seed_from_u64(7);

        let edges_before = edge_count(&animator);
        for _ in 0..1000 {
            animator.tick(&mut rng);
        }

        assert_eq!(animator.graph().len(), 1 + RING_COUNT);
        assert_eq!(edge_count(&animator), edges_before);
        assert_eq!(animator.complex_len(), 0);
    }

    #[test]
    fn complex_count_never_exceeds_the_cap() {
        let config = GrowthConfig {
            spawn_chance: 1.0,
            cross_link_chance: 1.0,
            max_complex: 50,
        };
        let mut animator = Animator::new(800.0, 600.0, config);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..500 {
            animator.tick(&mut rng);
            assert!(animator.complex_len() <= 50);
        }
        assert_eq!(animator.complex_len(), 50);
    }

    #[test]
    fn spawned_nodes_respect_the_margin() {
        let config = GrowthConfig {
            spawn_chance: 1.0,
            ..GrowthConfig::default()
        };
        let mut animator = Animator::new(300.0, 200.0, config);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..200 {
            animator.tick(&mut rng);
        }

        for (_, node) in animator.graph().iter() {
            if node.role == NodeRole::Complex {
                assert!(node.position.x >= EDGE_MARGIN);
                assert!(node.position.x <= 300.0 - EDGE_MARGIN);
                assert!(node.position.y >= EDGE_MARGIN);
                assert!(node.position.y <= 200.0 - EDGE_MARGIN);
            }
        }
    }

    #[test]
    fn every_edge_is_symmetric_after_a_long_run() {
        let config = GrowthConfig {
            spawn_chance: 0.5,
            cross_link_chance: 0.5,
            max_complex: 50,
        };
        let mut animator = Animator::new(800.0, 600.0, config);
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..2000 {
            animator.tick(&mut rng);
        }

        let graph = animator.graph();
        for (id, node) in graph.iter() {
            assert!(!node.links.contains(&id), "node {id} links itself");
            for &peer in &node.links {
                assert!(
                    graph.node(peer).links.contains(&id),
                    "edge {id}->{peer} missing its mirror"
                );
            }
        }
    }

    #[test]
    fn center_node_survives_forever() {
        let config = GrowthConfig {
            spawn_chance: 1.0,
            cross_link_chance: 1.0,
            max_complex: 50,
        };
        let mut animator = Animator::new(640.0, 480.0, config);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..1000 {
            animator.tick(&mut rng);
            let center = animator.graph().node(0);
            assert_eq!(center.role, NodeRole::Core);
            assert_eq!(center.radius, CENTER_RADIUS);
        }
    }

    #[test]
    fn spawn_position_is_source_plus_polar_offset() {
        let bounds = Vec2::new(800.0, 600.0);
        let position = spawn_position(Vec2::new(100.0, 200.0), 0.0, 75.0, bounds);
        assert!((position - Vec2::new(175.0, 200.0)).length() < 1e-4);
    }

    #[test]
    fn spawn_position_clamps_to_the_margin() {
        let bounds = Vec2::new(800.0, 600.0);

        let near_right = spawn_position(Vec2::new(790.0, 300.0), 0.0, 75.0, bounds);
        assert_eq!(near_right, Vec2::new(780.0, 300.0));

        let near_origin = spawn_position(
            Vec2::new(30.0, 30.0),
            std::f32::consts::PI * 1.25,
            75.0,
            bounds,
        );
        assert_eq!(near_origin, Vec2::new(EDGE_MARGIN, EDGE_MARGIN));
    }

    #[test]
    fn saturated_complex_subgraph_makes_cross_link_a_noop() {
        let mut animator = Animator::new(800.0, 600.0, frozen());
        // Hand-build seven complex nodes and wire every pair.
        let first = animator.graph.len();
        for i in 0..7 {
            let pos = Vec2::new(100.0 + 40.0 * i as f32, 100.0);
            animator.graph.add(pos, SPAWN_RADIUS, NodeRole::Complex);
        }
        for a in first..first + 7 {
            for b in (a + 1)..first + 7 {
                animator.graph.connect(a, b);
            }
        }

        animator.config.cross_link_chance = 1.0;
        let edges_before = edge_count(&animator);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            animator.tick(&mut rng);
        }
        assert_eq!(edge_count(&animator), edges_before);
    }

    #[test]
    fn resize_keeps_absolute_coordinates() {
        let mut animator = Animator::new(800.0, 600.0, frozen());
        let before: Vec<Vec2> = animator.graph().iter().map(|(_, n)| n.position).collect();

        animator.resize(400.0, 300.0);

        let after: Vec<Vec2> = animator.graph().iter().map(|(_, n)| n.position).collect();
        assert_eq!(before, after);
        assert_eq!(animator.bounds(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn new_nodes_arrive_pulsing() {
        let config = GrowthConfig {
            spawn_chance: 1.0,
            ..GrowthConfig::default()
        };
        let mut animator = Animator::new(800.0, 600.0, config);
        let mut rng = StdRng::seed_from_u64(11);

        animator.tick(&mut rng);
        assert_eq!(animator.complex_len(), 1);
        let spawned = animator.graph().node(1 + RING_COUNT);
        assert_eq!(spawned.pulse, super::super::node::PULSE_MAX);
        assert!(!spawned.links.is_empty());
    }
}
