//! Exploration shaping for self-play searches.
//!
//! Wraps [`MCTSSearch`] with the techniques that make self-play data cheap
//! and clean without changing how moves are played:
//!
//! - **Playout-cap randomization**: each move is searched either in `Full`
//!   mode (large budget, kept for training) or `Fast` mode (small budget,
//!   only used to pick the move).
//! - **Root noise**: Dirichlet noise mixed into the root priors, full mode
//!   only.
//! - **Forced playouts**: at the root, every edge with prior `p` gets at
//!   least `floor(k * sqrt(p * N))` visits.
//! - **Policy-target pruning**: forced visits that PUCT would not have
//!   spent are removed from the training target.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{GameRng, PlayerId};
use crate::error::SearchError;
use crate::game::Game;
use crate::nn::Evaluator;

use super::config::MCTSConfig;
use super::node::MCTSNode;
use super::policy::{parent_sqrt, puct_score};
use super::search::{MCTSSearch, SearchBudget, SearchResult};

/// Exploration parameters.
///
/// These are training hyperparameters. The defaults follow common practice
/// for AlphaZero-style self-play and should be tuned per game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Simulations for a full-mode search.
    pub full_simulations: u32,

    /// Simulations for a fast-mode search.
    pub fast_simulations: u32,

    /// Probability that a move is searched in full mode.
    pub full_search_probability: f64,

    /// Dirichlet concentration for root noise. 0 disables noise.
    pub dirichlet_alpha: f64,

    /// Weight of the noise in the mixed root prior. 0 disables noise.
    pub dirichlet_epsilon: f64,

    /// Forced-playout coefficient `k`. 0 disables forced playouts.
    pub forced_playout_k: f64,

    /// Remove forced visits from the policy target.
    pub prune_policy: bool,

    /// Edges left with fewer visits than this after pruning are zeroed.
    pub prune_min_visits: u32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            full_simulations: 600,
            fast_simulations: 100,
            full_search_probability: 0.25,
            dirichlet_alpha: 0.3,
            dirichlet_epsilon: 0.25,
            forced_playout_k: 2.0,
            prune_policy: true,
            prune_min_visits: 2,
        }
    }
}

impl ExplorationConfig {
    /// Every move is a full search with no noise, forcing or pruning.
    #[must_use]
    pub fn plain(simulations: u32) -> Self {
        Self {
            full_simulations: simulations,
            fast_simulations: simulations,
            full_search_probability: 1.0,
            dirichlet_alpha: 0.0,
            dirichlet_epsilon: 0.0,
            forced_playout_k: 0.0,
            prune_policy: false,
            prune_min_visits: 2,
        }
    }

    pub fn with_simulations(mut self, full: u32, fast: u32) -> Self {
        self.full_simulations = full;
        self.fast_simulations = fast;
        self
    }

    pub fn with_full_search_probability(mut self, probability: f64) -> Self {
        self.full_search_probability = probability;
        self
    }

    pub fn with_dirichlet(mut self, alpha: f64, epsilon: f64) -> Self {
        self.dirichlet_alpha = alpha;
        self.dirichlet_epsilon = epsilon;
        self
    }

    pub fn with_forced_playouts(mut self, k: f64) -> Self {
        self.forced_playout_k = k;
        self
    }

    pub fn with_pruning(mut self, prune: bool, min_visits: u32) -> Self {
        self.prune_policy = prune;
        self.prune_min_visits = min_visits;
        self
    }

    fn noise_enabled(&self) -> bool {
        self.dirichlet_alpha > 0.0 && self.dirichlet_epsilon > 0.0
    }
}

/// How a move was searched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMode {
    /// Small budget, no noise, no training target.
    Fast,

    /// Full budget with noise and forced playouts; produces a target.
    Full,
}

/// Result of searching one move.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveSearch {
    pub mode: SearchMode,

    /// Raw search result. Its distribution is used to pick the move.
    pub result: SearchResult,

    /// Training target over the full action space (full mode only).
    pub policy_target: Option<Vec<f32>>,
}

/// Decides how each move is searched and applies the exploration
/// techniques around the search.
#[derive(Clone, Debug, Default)]
pub struct ExplorationController {
    config: ExplorationConfig,
}

impl ExplorationController {
    pub fn new(config: ExplorationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Draw the search mode for one move.
    pub fn choose_mode(&self, rng: &mut GameRng) -> SearchMode {
        if rng.gen_bool(self.config.full_search_probability) {
            SearchMode::Full
        } else {
            SearchMode::Fast
        }
    }

    /// Search one move from `state`, drawing the mode first.
    pub fn search_move<G: Game, E: Evaluator + ?Sized>(
        &self,
        search: &mut MCTSSearch<'_, G, E>,
        state: &G::State,
        player: PlayerId,
        deadline: Option<Instant>,
        rng: &mut GameRng,
    ) -> Result<MoveSearch, SearchError> {
        let mode = self.choose_mode(rng);
        self.search_with_mode(search, state, player, mode, deadline, rng)
    }

    /// Search one move in the given mode.
    pub fn search_with_mode<G: Game, E: Evaluator + ?Sized>(
        &self,
        search: &mut MCTSSearch<'_, G, E>,
        state: &G::State,
        player: PlayerId,
        mode: SearchMode,
        deadline: Option<Instant>,
        rng: &mut GameRng,
    ) -> Result<MoveSearch, SearchError> {
        search.prepare_root(state, player)?;

        match mode {
            SearchMode::Fast => {
                let budget = SearchBudget::simulations(self.config.fast_simulations).with_deadline(deadline);
                let result = search.run(&budget, None, rng)?;
                Ok(MoveSearch {
                    mode,
                    result,
                    policy_target: None,
                })
            }
            SearchMode::Full => {
                if self.config.noise_enabled() {
                    search.apply_root_noise(self.config.dirichlet_alpha, self.config.dirichlet_epsilon, rng);
                }
                let budget = SearchBudget::simulations(self.config.full_simulations).with_deadline(deadline);
                let forced_k = Some(self.config.forced_playout_k).filter(|k| *k > 0.0);
                let result = search.run(&budget, forced_k, rng)?;

                let policy_target = if self.config.prune_policy && forced_k.is_some() {
                    prune_policy_target(
                        search.tree().root_node(),
                        search.config(),
                        self.config.prune_min_visits,
                        result.distribution.len(),
                    )
                } else {
                    result.distribution.clone()
                };

                debug!(
                    simulations = result.simulations,
                    forced = search.stats().forced_playouts,
                    "full search"
                );

                Ok(MoveSearch {
                    mode,
                    result,
                    policy_target: Some(policy_target),
                })
            }
        }
    }
}

/// Training target from the root with forced visits pruned away.
///
/// The most-visited edge is kept as is. Every other edge gives back up to
/// its forced visits, one at a time, for as long as its PUCT value with the
/// reduced count stays below the best edge's PUCT value. Edges left with
/// fewer than `min_visits` visits are zeroed, and the rest renormalized.
/// If nothing survives, the target is uniform over the node's edges.
#[must_use]
pub fn prune_policy_target(node: &MCTSNode, config: &MCTSConfig, min_visits: u32, action_count: usize) -> Vec<f32> {
    let mut target = vec![0.0f32; action_count];

    let Some(best_idx) = node.best_edge_by_visits() else {
        return target;
    };

    let player = node.to_move;
    let sqrt_parent = parent_sqrt(node.visits);
    let puct = |idx: usize, visits: u32| {
        let edge = &node.edges[idx];
        puct_score(
            edge.q_value(player, config.fpu_value),
            edge.prior,
            sqrt_parent,
            visits,
            config.c_puct,
        )
    };
    let best_puct = puct(best_idx, node.edges[best_idx].visits);

    let mut kept: Vec<(usize, u32)> = Vec::with_capacity(node.edges.len());
    for (idx, edge) in node.edges.iter().enumerate() {
        let mut visits = edge.visits;
        if idx != best_idx {
            let mut removable = edge.forced_visits.min(visits);
            while removable > 0 && puct(idx, visits - 1) < best_puct {
                visits -= 1;
                removable -= 1;
            }
        }
        if visits < min_visits.max(1) {
            visits = 0;
        }
        kept.push((edge.action, visits));
    }

    let total: u32 = kept.iter().map(|&(_, v)| v).sum();
    if total == 0 {
        let p = 1.0 / node.edges.len() as f32;
        for edge in &node.edges {
            if let Some(slot) = target.get_mut(edge.action) {
                *slot = p;
            }
        }
        return target;
    }

    for (action, visits) in kept {
        if let Some(slot) = target.get_mut(action) {
            *slot = visits as f32 / total as f32;
        }
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActionMask;
    use crate::mcts::node::{Edge, NodeKind};

    fn root(priors: &[f32]) -> MCTSNode {
        let mut node = MCTSNode::root(
            PlayerId::new(0),
            NodeKind::Decision {
                legal: ActionMask::all(priors.len()),
            },
        );
        for (action, &prior) in priors.iter().enumerate() {
            node.edges.push(Edge::new(action, 2, prior));
        }
        node
    }

    #[test]
    fn test_choose_mode_extremes() {
        let mut rng = GameRng::new(3);
        let always = ExplorationController::new(ExplorationConfig::default().with_full_search_probability(1.0));
        let never = ExplorationController::new(ExplorationConfig::default().with_full_search_probability(0.0));
        for _ in 0..100 {
            assert_eq!(always.choose_mode(&mut rng), SearchMode::Full);
            assert_eq!(never.choose_mode(&mut rng), SearchMode::Fast);
        }
    }

    #[test]
    fn test_choose_mode_frequency() {
        let mut rng = GameRng::new(11);
        let controller = ExplorationController::new(ExplorationConfig::default().with_full_search_probability(0.25));
        let full = (0..10_000)
            .filter(|_| controller.choose_mode(&mut rng) == SearchMode::Full)
            .count();
        assert!((full as f64 / 10_000.0 - 0.25).abs() < 0.02);
    }

    #[test]
    fn test_prune_removes_unjustified_forced_visits() {
        let mut node = root(&[0.6, 0.2, 0.2]);
        node.visits = 100;
        node.edges[0].visits = 80;
        node.edges[0].total_value[PlayerId::new(0)] = 48.0;
        // Ten visits, all forced, with a poor value.
        node.edges[1].visits = 10;
        node.edges[1].forced_visits = 10;
        node.edges[1].total_value[PlayerId::new(0)] = -10.0;
        // Ten earned visits, none forced.
        node.edges[2].visits = 10;
        node.edges[2].total_value[PlayerId::new(0)] = 5.0;

        let target = prune_policy_target(&node, &MCTSConfig::default(), 2, 3);

        assert_eq!(target[1], 0.0);
        assert!((target[0] - 80.0 / 90.0).abs() < 1e-6);
        assert!((target[2] - 10.0 / 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_prune_keeps_forced_visits_puct_would_spend() {
        let mut node = root(&[0.5, 0.5]);
        node.visits = 20;
        node.edges[0].visits = 10;
        node.edges[0].total_value[PlayerId::new(0)] = 5.0;
        // Same value and prior as the best edge: removing any visit would
        // lift it above the best edge.
        node.edges[1].visits = 10;
        node.edges[1].forced_visits = 4;
        node.edges[1].total_value[PlayerId::new(0)] = 5.0;

        let target = prune_policy_target(&node, &MCTSConfig::default(), 1, 2);
        assert_eq!(target, vec![0.5, 0.5]);
    }

    #[test]
    fn test_prune_without_visits_is_uniform() {
        let node = root(&[0.7, 0.3]);
        let target = prune_policy_target(&node, &MCTSConfig::default(), 1, 4);
        assert_eq!(target, vec![0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_config_serialization() {
        let config = ExplorationConfig::default().with_forced_playouts(1.5);
        let json = serde_json::to_string(&config).unwrap();
        let back: ExplorationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);

        let plain = ExplorationConfig::plain(64);
        assert!(!plain.noise_enabled());
        assert_eq!(plain.full_search_probability, 1.0);
    }
}
