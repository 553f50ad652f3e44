//! MCTS search statistics for diagnostics and tuning.

use serde::{Deserialize, Serialize};

/// Statistics collected during one search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Simulations completed.
    pub simulations: u32,

    /// Leaf evaluations requested from the evaluator (root included).
    pub evaluations: u32,

    /// Nodes added to the tree.
    pub nodes_created: u32,

    /// Simulations that ended on a terminal node.
    pub terminal_hits: u32,

    /// Root selections made by the forced-playout rule.
    pub forced_playouts: u32,

    /// Priors that fell back to uniform after masking.
    pub prior_fallbacks: u32,

    /// Maximum depth reached during search.
    pub max_depth: u16,

    /// Total time spent searching (microseconds).
    pub time_us: u64,
}

impl SearchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn simulations_per_second(&self) -> f64 {
        if self.time_us == 0 {
            0.0
        } else {
            self.simulations as f64 / (self.time_us as f64 / 1_000_000.0)
        }
    }

    /// Average nodes created per simulation.
    #[must_use]
    pub fn avg_nodes_per_simulation(&self) -> f64 {
        if self.simulations == 0 {
            0.0
        } else {
            self.nodes_created as f64 / self.simulations as f64
        }
    }
}
