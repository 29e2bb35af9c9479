pub mod animator;
pub mod graph;
pub mod node;

pub use animator::{Animator, GrowthConfig};
pub use graph::{Graph, NodeId};
pub use node::{Node, NodeRole};
