//! Arena-based MCTS tree.
//!
//! Uses a flat `Vec<MCTSNode>` with index-based references for efficiency,
//! cache-friendliness, and serializability. The game state of every node is
//! kept in a parallel vector, so a node and its state share a `NodeId`.

use serde::{Deserialize, Serialize};

use super::node::{MCTSNode, NodeId};

/// Arena-based MCTS tree over game states `S`.
///
/// Nodes are stored in a flat vector and referenced by `NodeId` indices.
/// Node 0 is the root once [`MCTSTree::set_root`] has been called.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MCTSTree<S> {
    nodes: Vec<MCTSNode>,

    /// `states[i]` is the game state of `nodes[i]`.
    states: Vec<S>,

    player_count: usize,
}

impl<S> MCTSTree<S> {
    /// Create an empty tree.
    pub fn new(player_count: usize) -> Self {
        Self::with_capacity(player_count, 1024)
    }

    pub fn with_capacity(player_count: usize, capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
            player_count,
        }
    }

    /// Discard every node and install a new root.
    pub fn set_root(&mut self, node: MCTSNode, state: S) -> NodeId {
        self.nodes.clear();
        self.states.clear();
        self.alloc(node, state)
    }

    /// Get the root node ID.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::new(0)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> &MCTSNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MCTSNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Game state stored for a node.
    #[inline]
    #[must_use]
    pub fn state(&self, id: NodeId) -> &S {
        &self.states[id.0 as usize]
    }

    /// Allocate a new node, returning its ID.
    pub fn alloc(&mut self, node: MCTSNode, state: S) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        self.states.push(state);
        id
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    /// Get statistics about the tree.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let max_depth = self.nodes.iter().map(|n| n.depth).max().unwrap_or(0);
        let terminal_count = self.nodes.iter().filter(|n| n.is_terminal()).count();
        let chance_count = self.nodes.iter().filter(|n| n.is_chance()).count();
        let total_edges: usize = self.nodes.iter().map(|n| n.edges.len()).sum();
        let expanded_edges: usize = self
            .nodes
            .iter()
            .flat_map(|n| n.edges.iter())
            .filter(|e| e.is_expanded())
            .count();

        TreeStats {
            node_count: self.nodes.len(),
            max_depth,
            terminal_count,
            chance_count,
            total_edges,
            expanded_edges,
        }
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.states.clear();
    }

    /// Get the root node.
    ///
    /// # Panics
    ///
    /// Panics if no root has been set.
    #[must_use]
    pub fn root_node(&self) -> &MCTSNode {
        self.get(self.root())
    }

    pub fn root_node_mut(&mut self) -> &mut MCTSNode {
        let root = self.root();
        self.get_mut(root)
    }

    /// Iterate over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MCTSNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::new(i as u32), n))
    }
}

/// Statistics about the MCTS tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    pub node_count: usize,

    /// Maximum depth reached.
    pub max_depth: u16,

    pub terminal_count: usize,

    pub chance_count: usize,

    /// Total number of edges (actions and chance outcomes).
    pub total_edges: usize,

    /// Number of edges with a child node.
    pub expanded_edges: usize,
}

impl TreeStats {
    /// Average edges per node.
    #[must_use]
    pub fn branching_factor(&self) -> f64 {
        if self.node_count == 0 {
            0.0
        } else {
            self.total_edges as f64 / self.node_count as f64
        }
    }

    /// Expanded edges / total edges.
    #[must_use]
    pub fn expansion_ratio(&self) -> f64 {
        if self.total_edges == 0 {
            0.0
        } else {
            self.expanded_edges as f64 / self.total_edges as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionMask, PlayerId};
    use crate::game::GameOutcome;
    use crate::mcts::node::{Edge, NodeKind};

    fn decision() -> NodeKind {
        NodeKind::Decision {
            legal: ActionMask::all(2),
        }
    }

    fn tree_with_root() -> MCTSTree<u32> {
        let mut tree = MCTSTree::new(2);
        tree.set_root(MCTSNode::root(PlayerId::new(0), decision()), 7);
        tree
    }

    #[test]
    fn test_tree_new() {
        let tree: MCTSTree<u32> = MCTSTree::new(2);
        assert!(tree.is_empty());

        let tree = tree_with_root();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.player_count(), 2);
        assert_eq!(tree.root(), NodeId::new(0));
        assert_eq!(*tree.state(tree.root()), 7);
    }

    #[test]
    fn test_tree_alloc() {
        let mut tree = tree_with_root();

        let child = MCTSNode::new(NodeId::new(0), 0, PlayerId::new(1), 1, decision());
        let child_id = tree.alloc(child, 8);

        assert_eq!(child_id, NodeId::new(1));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(child_id).to_move, PlayerId::new(1));
        assert_eq!(*tree.state(child_id), 8);
    }

    #[test]
    fn test_set_root_discards_old_nodes() {
        let mut tree = tree_with_root();
        tree.alloc(MCTSNode::new(NodeId::new(0), 0, PlayerId::new(1), 1, decision()), 1);
        tree.alloc(MCTSNode::new(NodeId::new(1), 0, PlayerId::new(0), 2, decision()), 2);
        assert_eq!(tree.len(), 3);

        tree.set_root(MCTSNode::root(PlayerId::new(1), decision()), 9);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root_node().to_move, PlayerId::new(1));
        assert_eq!(*tree.state(tree.root()), 9);

        tree.clear();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_tree_stats() {
        let mut tree = tree_with_root();
        let root = tree.root();
        tree.root_node_mut().edges.push(Edge::new(0, 2, 0.5));
        tree.root_node_mut().edges.push(Edge::new(1, 2, 0.5));

        let terminal = MCTSNode::new(
            root,
            0,
            PlayerId::new(1),
            1,
            NodeKind::Terminal {
                outcome: GameOutcome::uniform(2, 0.0),
            },
        );
        let child_id = tree.alloc(terminal, 0);
        tree.get_mut(root).edges[0].child = child_id;

        let stats = tree.stats();

        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.max_depth, 1);
        assert_eq!(stats.terminal_count, 1);
        assert_eq!(stats.chance_count, 0);
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.expanded_edges, 1);
        assert_eq!(stats.expansion_ratio(), 0.5);
        assert_eq!(stats.branching_factor(), 1.0);
    }

    #[test]
    fn test_tree_iter() {
        let mut tree = tree_with_root();
        tree.alloc(MCTSNode::new(NodeId::new(0), 0, PlayerId::new(1), 1, decision()), 3);

        let nodes: Vec<_> = tree.iter().collect();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].0, NodeId::new(0));
        assert_eq!(nodes[1].0, NodeId::new(1));
    }

    #[test]
    fn test_tree_serialization() {
        let mut tree = tree_with_root();
        tree.root_node_mut().visits = 50;
        tree.alloc(MCTSNode::new(NodeId::new(0), 0, PlayerId::new(1), 1, decision()), 4);

        let json = serde_json::to_string(&tree).unwrap();
        let deserialized: MCTSTree<u32> = serde_json::from_str(&json).unwrap();

        assert_eq!(tree.len(), deserialized.len());
        assert_eq!(tree.player_count(), deserialized.player_count());
        assert_eq!(tree.root_node().visits, deserialized.root_node().visits);
        assert_eq!(*deserialized.state(NodeId::new(1)), 4);
    }
}
