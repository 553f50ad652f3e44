//! MCTS configuration parameters.

use serde::{Deserialize, Serialize};

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MCTSConfig {
    /// PUCT exploration constant.
    /// Higher values lean harder on the prior.
    pub c_puct: f64,

    /// Value assumed for an edge that has never been visited.
    pub fpu_value: f64,

    /// Maximum nodes to allocate in the tree.
    /// Simulations stop once the arena reaches this size.
    pub max_nodes: usize,
}

impl Default for MCTSConfig {
    fn default() -> Self {
        Self {
            c_puct: 1.25,
            fpu_value: 0.0,
            max_nodes: 100_000,
        }
    }
}

impl MCTSConfig {
    pub fn with_c_puct(mut self, c: f64) -> Self {
        self.c_puct = c;
        self
    }

    pub fn with_fpu_value(mut self, value: f64) -> Self {
        self.fpu_value = value;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}
