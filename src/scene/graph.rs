use glam::Vec2;

use super::node::{Node, NodeRole};

/// Stable index into the graph arena. Nodes are never removed, so an id
/// stays valid for the lifetime of the graph.
pub type NodeId = usize;

/// Append-only arena of nodes. Links are stored as index sets on both
/// endpoints, which keeps the cyclic node-to-node references out of the
/// ownership picture and makes "already connected" a set lookup.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Vec2, radius: f32, role: NodeRole) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(position, radius, role));
        id
    }

    /// Link two nodes. The edge is undirected and recorded on both
    /// endpoints; linking an already-linked pair or a node to itself is a
    /// no-op.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        self.nodes[a].links.insert(b);
        self.nodes[b].links.insert(a);
    }

    pub fn are_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes[a].links.contains(&b)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order, which is also draw order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_records_edge_on_both_endpoints() {
        let mut graph = Graph::new();
        let a = graph.add(Vec2::ZERO, 5.0, NodeRole::Core);
        let b = graph.add(Vec2::new(10.0, 0.0), 4.0, NodeRole::Complex);

        graph.connect(a, b);

        assert!(graph.are_connected(a, b));
        assert!(graph.are_connected(b, a));
        assert!(graph.node(a).links.contains(&b));
        assert!(graph.node(b).links.contains(&a));
    }

    #[test]
    fn self_and_duplicate_links_are_noops() {
        let mut graph = Graph::new();
        let a = graph.add(Vec2::ZERO, 5.0, NodeRole::Core);
        let b = graph.add(Vec2::new(10.0, 0.0), 4.0, NodeRole::Complex);

        graph.connect(a, a);
        assert!(graph.node(a).links.is_empty());

        graph.connect(a, b);
        graph.connect(b, a);
        assert_eq!(graph.node(a).links.len(), 1);
        assert_eq!(graph.node(b).links.len(), 1);
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut graph = Graph::new();
        for i in 0..4 {
            let id = graph.add(Vec2::splat(i as f32), 4.0, NodeRole::Complex);
            assert_eq!(id, i);
        }
        let ids: Vec<NodeId> = graph.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
