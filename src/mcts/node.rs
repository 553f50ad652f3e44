//! MCTS node and edge structures.
//!
//! Uses arena-based allocation with index references (NodeId) for efficiency
//! and serializability.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{ActionMask, PlayerId, PlayerMap};
use crate::game::GameOutcome;

/// Index into the MCTSTree node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value representing no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "NodeId(NONE)")
        } else {
            write!(f, "NodeId({})", self.0)
        }
    }
}

/// What kind of state a node holds. Fixed when the node is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The player to move picks one of `legal`.
    Decision { legal: ActionMask },

    /// The game draws from `outcomes` (`(outcome, probability)` pairs).
    Chance { outcomes: Vec<(usize, f64)> },

    /// The game is over.
    Terminal { outcome: GameOutcome },
}

/// Edge from a parent node to a child.
///
/// For decision nodes `action` is the action index; for chance nodes it is
/// the first outcome index that produced the child.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub action: usize,

    /// Child node (NONE if not yet created).
    pub child: NodeId,

    pub visits: u32,

    /// Sum of backed-up values, absolute seat order.
    pub total_value: PlayerMap<f64>,

    /// Sum of backed-up scores.
    pub total_score: f64,

    /// Prior probability (chance edges: outcome probability).
    pub prior: f32,

    /// Visits this edge received through forced playouts.
    pub forced_visits: u32,
}

impl Edge {
    pub fn new(action: usize, player_count: usize, prior: f32) -> Self {
        Self {
            action,
            child: NodeId::NONE,
            visits: 0,
            total_value: PlayerMap::with_value(player_count, 0.0),
            total_score: 0.0,
            prior,
            forced_visits: 0,
        }
    }

    /// Mean backed-up value for a player (0 when unvisited).
    #[must_use]
    pub fn mean_value(&self, player: PlayerId) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_value[player] / self.visits as f64
        }
    }

    /// Mean value, or `fpu` for an edge that was never visited.
    #[inline]
    #[must_use]
    pub fn q_value(&self, player: PlayerId, fpu: f64) -> f64 {
        if self.visits == 0 {
            fpu
        } else {
            self.total_value[player] / self.visits as f64
        }
    }

    #[must_use]
    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_score / self.visits as f64
        }
    }

    /// Check if this edge has been expanded (child exists).
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        !self.child.is_none()
    }
}

/// A node in the MCTS tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MCTSNode {
    /// Parent node (NONE for root).
    pub parent: NodeId,

    /// Index of the edge from parent that led to this node.
    pub parent_edge_idx: u32,

    /// Player to move at this node.
    pub to_move: PlayerId,

    /// Depth in tree (root = 0).
    pub depth: u16,

    /// Total visits through this node. Always the sum of its edge visits.
    pub visits: u32,

    pub kind: NodeKind,

    /// Decision nodes: evaluated and given edges. Other kinds are created
    /// expanded.
    pub is_expanded: bool,

    /// Outgoing edges. Decision nodes get one per legal action on
    /// expansion; chance nodes grow one per distinct sampled child.
    pub edges: SmallVec<[Edge; 8]>,
}

impl MCTSNode {
    pub fn new(parent: NodeId, parent_edge_idx: u32, to_move: PlayerId, depth: u16, kind: NodeKind) -> Self {
        let is_expanded = !matches!(kind, NodeKind::Decision { .. });
        Self {
            parent,
            parent_edge_idx,
            to_move,
            depth,
            visits: 0,
            kind,
            is_expanded,
            edges: SmallVec::new(),
        }
    }

    /// Create a root node.
    pub fn root(to_move: PlayerId, kind: NodeKind) -> Self {
        Self::new(NodeId::NONE, 0, to_move, 0, kind)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal { .. })
    }

    #[must_use]
    pub fn is_chance(&self) -> bool {
        matches!(self.kind, NodeKind::Chance { .. })
    }

    /// Legal-action mask of a decision node.
    #[must_use]
    pub fn legal(&self) -> Option<&ActionMask> {
        match &self.kind {
            NodeKind::Decision { legal } => Some(legal),
            _ => None,
        }
    }

    /// Index of the most-visited edge; ties go to the lowest index.
    #[must_use]
    pub fn best_edge_by_visits(&self) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (i, edge) in self.edges.iter().enumerate() {
            if best.map_or(true, |(_, v)| edge.visits > v) {
                best = Some((i, edge.visits));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Sum of edge visit counts.
    #[must_use]
    pub fn edge_visits(&self) -> u32 {
        self.edges.iter().map(|e| e.visits).sum()
    }
}
