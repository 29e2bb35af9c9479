use std::collections::BTreeSet;

use glam::Vec2;

use super::graph::NodeId;

/// Magnitude a pulse starts at when a node is created or gains an edge.
pub const PULSE_MAX: f32 = 5.0;
/// Amount the pulse shrinks per frame.
pub const PULSE_DECAY: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Seeded at startup, never removed, primary color scheme.
    Core,
    /// Spawned during the animation, secondary color scheme, pulse-capable.
    Complex,
}

/// A point in the graph. Radius and role are fixed at creation; only the
/// link set and the pulse magnitude change afterwards.
#[derive(Debug, Clone)]
pub struct Node {
    pub position: Vec2,
    pub radius: f32,
    pub role: NodeRole,
    /// Indices of linked nodes. Edges are undirected and stored on both
    /// endpoints, so `a.links` containing `b` implies the reverse.
    pub links: BTreeSet<NodeId>,
    /// Transient glow magnitude, zero when idle.
    pub pulse: f32,
}

impl Node {
    pub fn new(position: Vec2, radius: f32, role: NodeRole) -> Self {
        Self {
            position,
            radius,
            role,
            links: BTreeSet::new(),
            pulse: 0.0,
        }
    }

    /// Restart the glow at full magnitude.
    pub fn trigger_pulse(&mut self) {
        self.pulse = PULSE_MAX;
    }

    /// Shrink the glow by one frame step. A sub-half-step residue snaps to
    /// exactly zero, so a full pulse retires in PULSE_MAX / PULSE_DECAY frames
    /// despite f32 rounding.
    pub fn decay_pulse(&mut self) {
        if self.pulse > 0.0 {
            self.pulse -= PULSE_DECAY;
            if self.pulse < PULSE_DECAY * 0.5 {
                self.pulse = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_retires_in_exactly_25_idle_frames() {
        let mut node = Node::new(Vec2::ZERO, 4.0, NodeRole::Complex);
        node.trigger_pulse();
        assert_eq!(node.pulse, PULSE_MAX);

        let mut previous = node.pulse;
        for frame in 1..=25 {
            node.decay_pulse();
            assert!(node.pulse <= previous, "pulse rose at frame {frame}");
            previous = node.pulse;
        }
        assert_eq!(node.pulse, 0.0);
    }

    #[test]
    fn idle_pulse_stays_at_zero() {
        let mut node = Node::new(Vec2::ZERO, 4.0, NodeRole::Complex);
        for _ in 0..10 {
            node.decay_pulse();
        }
        assert_eq!(node.pulse, 0.0);
    }

    #[test]
    fn pulse_is_nonincreasing_until_retriggered() {
        let mut node = Node::new(Vec2::ZERO, 4.0, NodeRole::Complex);
        node.trigger_pulse();
        for _ in 0..7 {
            node.decay_pulse();
        }
        let mid = node.pulse;
        assert!(mid > 0.0 && mid < PULSE_MAX);

        node.trigger_pulse();
        assert_eq!(node.pulse, PULSE_MAX);
    }
}
