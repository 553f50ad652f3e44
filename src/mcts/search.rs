//! Core MCTS search algorithm.
//!
//! AlphaZero-style search: every new decision node is evaluated once by the
//! [`Evaluator`], which supplies priors for its edges and a value vector that
//! is backed up along the selection path. There are no rollouts.
//!
//! Values are stored in absolute seat order. Backup adds the whole vector to
//! each edge on the path, so every player's value stays in its own slot and
//! nothing is negated between plies.
//!
//! Chance nodes are not evaluated. Each visit samples an outcome from the
//! game's distribution, and children are shared between outcomes that lead
//! to states with the same canonical key.

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::core::{ActionMask, GameRng, PlayerId, PlayerMap};
use crate::error::{ContractViolation, SearchError};
use crate::game::{validate_chance_outcomes, Game};
use crate::nn::Evaluator;

use super::config::MCTSConfig;
use super::node::{Edge, MCTSNode, NodeId, NodeKind};
use super::policy::{forced_playout_edge, masked_priors, SelectionPolicy, PUCT};
use super::stats::SearchStats;
use super::tree::MCTSTree;

/// How much work a search may do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchBudget {
    pub simulations: u32,

    /// Checked before every simulation. Once passed, the search stops and
    /// returns what it has.
    pub deadline: Option<Instant>,
}

impl SearchBudget {
    pub fn simulations(simulations: u32) -> Self {
        Self {
            simulations,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_time_limit(self, limit: Duration) -> Self {
        self.with_deadline(Some(Instant::now() + limit))
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// What a search produced at the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Root visit count per action over the full action space.
    pub visits: Vec<u32>,

    /// `visits` normalized; uniform over legal actions when the root has
    /// no visits.
    pub distribution: Vec<f32>,

    /// Mean backed-up value per seat at the root (the root evaluation when
    /// no simulation ran).
    pub root_value: PlayerMap<f64>,

    pub root_score: f64,

    /// Simulations completed.
    pub simulations: u32,

    /// The deadline cut the search short.
    pub truncated: bool,
}

impl SearchResult {
    /// Action with the highest probability; ties go to the lowest index.
    #[must_use]
    pub fn best_action(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (action, &p) in self.distribution.iter().enumerate() {
            if p > 0.0 && best.map_or(true, |(_, bp)| p > bp) {
                best = Some((action, p));
            }
        }
        best.map(|(a, _)| a)
    }
}

enum Step {
    Leaf(PlayerMap<f64>, f64),
    Expand(ActionMask),
    Chance { outcome: usize, probability: f64 },
    Descend { edge_idx: usize, forced: bool },
}

/// Main MCTS search context.
///
/// Generic over the game and the evaluator. Owns the search tree, which is
/// rebuilt from scratch for every root.
pub struct MCTSSearch<'a, G: Game, E: Evaluator + ?Sized> {
    game: &'a G,

    evaluator: &'a E,

    config: MCTSConfig,

    tree: MCTSTree<G::State>,

    /// Chance children by (chance node, canonical key of the child state).
    chance_children: FxHashMap<(NodeId, G::Key), usize>,

    selection: Box<dyn SelectionPolicy>,

    /// Root evaluation from the last `prepare_root`.
    root_estimate: Option<(PlayerMap<f64>, f64)>,

    stats: SearchStats,
}

impl<'a, G: Game, E: Evaluator + ?Sized> MCTSSearch<'a, G, E> {
    pub fn new(game: &'a G, evaluator: &'a E, config: MCTSConfig) -> Self {
        let capacity = config.max_nodes.min(4096);
        Self {
            game,
            evaluator,
            tree: MCTSTree::with_capacity(game.player_count(), capacity),
            config,
            chance_children: FxHashMap::default(),
            selection: Box::new(PUCT),
            root_estimate: None,
            stats: SearchStats::default(),
        }
    }

    /// Set a custom selection policy.
    pub fn with_selection<S: SelectionPolicy + 'static>(mut self, selection: S) -> Self {
        self.selection = Box::new(selection);
        self
    }

    /// Prepare `state` as the root and run `budget` simulations.
    pub fn search(
        &mut self,
        state: &G::State,
        player: PlayerId,
        budget: &SearchBudget,
        rng: &mut GameRng,
    ) -> Result<SearchResult, SearchError> {
        self.prepare_root(state, player)?;
        self.run(budget, None, rng)
    }

    /// Discard the previous tree, then evaluate and expand `state` as the
    /// new root.
    ///
    /// Terminal and chance states cannot be searched from.
    pub fn prepare_root(&mut self, state: &G::State, player: PlayerId) -> Result<(), SearchError> {
        self.tree.clear();
        self.chance_children.clear();
        self.root_estimate = None;
        self.stats.reset();

        let legal = match self.classify(state, player)? {
            NodeKind::Terminal { .. } => return Err(SearchError::TerminalRoot),
            NodeKind::Chance { .. } => return Err(SearchError::ChanceRoot),
            NodeKind::Decision { legal } => legal,
        };

        let root = self.tree.set_root(
            MCTSNode::root(player, NodeKind::Decision { legal: legal.clone() }),
            state.clone(),
        );
        self.stats.nodes_created = 1;

        let estimate = self.expand(root, &legal)?;
        self.root_estimate = Some(estimate);
        Ok(())
    }

    /// Mix Dirichlet noise into the root priors:
    /// `P' = (1 - epsilon) * P + epsilon * Dir(alpha)`.
    ///
    /// Only root edges are touched. Does nothing without a root or when
    /// `alpha` or `epsilon` is not positive.
    pub fn apply_root_noise(&mut self, alpha: f64, epsilon: f64, rng: &mut GameRng) {
        if self.tree.is_empty() || alpha <= 0.0 || epsilon <= 0.0 {
            return;
        }
        let epsilon = epsilon.min(1.0);
        let root = self.tree.root_node_mut();
        let Some(noise) = rng.dirichlet(alpha, root.edges.len()) else {
            debug!(alpha, "dirichlet sampling failed; root priors left unchanged");
            return;
        };
        for (edge, eta) in root.edges.iter_mut().zip(noise) {
            edge.prior = ((1.0 - epsilon) * f64::from(edge.prior) + epsilon * eta) as f32;
        }
    }

    /// Run simulations from the prepared root.
    ///
    /// `forced_k` enables forced playouts at the root with coefficient `k`.
    /// Stops when the budget is spent, the deadline passes (the result is
    /// then marked truncated) or the tree reaches `max_nodes`.
    pub fn run(
        &mut self,
        budget: &SearchBudget,
        forced_k: Option<f64>,
        rng: &mut GameRng,
    ) -> Result<SearchResult, SearchError> {
        if self.tree.is_empty() {
            return Err(SearchError::NoRoot);
        }

        let start = Instant::now();
        let forced_k = forced_k.filter(|k| *k > 0.0);
        let mut simulations = 0;
        let mut truncated = false;

        while simulations < budget.simulations {
            if budget.expired() {
                truncated = true;
                break;
            }
            if self.tree.len() >= self.config.max_nodes {
                debug!(nodes = self.tree.len(), "node budget reached");
                break;
            }
            self.simulate(forced_k, rng)?;
            simulations += 1;
        }

        self.stats.simulations += simulations;
        self.stats.time_us += start.elapsed().as_micros() as u64;

        debug!(
            simulations,
            nodes = self.tree.len(),
            truncated,
            "search finished"
        );

        Ok(self.result(simulations, truncated))
    }

    /// One simulation: select down to a leaf, expand it, back up its value.
    fn simulate(&mut self, forced_k: Option<f64>, rng: &mut GameRng) -> Result<(), SearchError> {
        let root = self.tree.root();
        let mut path: SmallVec<[(NodeId, usize); 32]> = SmallVec::new();
        let mut current = root;

        let (values, score) = loop {
            let step = {
                let node = self.tree.get(current);
                match &node.kind {
                    NodeKind::Terminal { outcome } => Step::Leaf(outcome.values.clone(), outcome.score),
                    NodeKind::Chance { outcomes } => {
                        let weights: SmallVec<[f64; 16]> = outcomes.iter().map(|&(_, p)| p).collect();
                        let idx = rng.choose_weighted(&weights).ok_or_else(|| {
                            ContractViolation::ChanceDistribution("no outcome has positive probability".into())
                        })?;
                        let (outcome, probability) = outcomes[idx];
                        Step::Chance {
                            outcome,
                            probability,
                        }
                    }
                    NodeKind::Decision { legal } if !node.is_expanded => Step::Expand(legal.clone()),
                    NodeKind::Decision { .. } => {
                        let forced = if current == root {
                            forced_k.and_then(|k| forced_playout_edge(node, k))
                        } else {
                            None
                        };
                        match forced {
                            Some(edge_idx) => Step::Descend {
                                edge_idx,
                                forced: true,
                            },
                            None => Step::Descend {
                                edge_idx: self.selection.select(node, &self.config),
                                forced: false,
                            },
                        }
                    }
                }
            };

            match step {
                Step::Leaf(values, score) => {
                    self.stats.terminal_hits += 1;
                    break (values, score);
                }
                Step::Expand(legal) => break self.expand(current, &legal)?,
                Step::Chance {
                    outcome,
                    probability,
                } => {
                    let edge_idx = self.chance_edge(current, outcome, probability)?;
                    path.push((current, edge_idx));
                    current = self.tree.get(current).edges[edge_idx].child;
                }
                Step::Descend { edge_idx, forced } => {
                    if forced {
                        self.tree.get_mut(current).edges[edge_idx].forced_visits += 1;
                        self.stats.forced_playouts += 1;
                    }
                    path.push((current, edge_idx));
                    current = self.ensure_child(current, edge_idx)?;
                }
            }
        };

        self.backpropagate(&path, &values, score);
        Ok(())
    }

    /// Evaluate a decision node and give it one edge per legal action.
    ///
    /// Returns the evaluation in absolute seat order.
    fn expand(&mut self, node_id: NodeId, legal: &ActionMask) -> Result<(PlayerMap<f64>, f64), SearchError> {
        let player = self.tree.get(node_id).to_move;
        let player_count = self.tree.player_count();

        let encoded = self.game.encode(self.tree.state(node_id), player);
        let evaluation = self.evaluator.evaluate_one(&encoded)?;
        evaluation.validate(self.game.action_count(), player_count)?;
        self.stats.evaluations += 1;

        let (priors, fell_back) = masked_priors(&evaluation.policy, legal);
        if fell_back {
            self.stats.prior_fallbacks += 1;
            debug!(node = %node_id, "no prior mass on legal actions; using uniform prior");
        }

        let node = self.tree.get_mut(node_id);
        node.edges = priors
            .into_iter()
            .map(|(action, prior)| Edge::new(action, player_count, prior))
            .collect();
        node.is_expanded = true;

        let values: Vec<f64> = evaluation.values.iter().map(|&v| f64::from(v)).collect();
        Ok((
            PlayerMap::from_perspective(&values, player),
            f64::from(evaluation.score),
        ))
    }

    /// Child of a decision edge, created on first use.
    fn ensure_child(&mut self, node_id: NodeId, edge_idx: usize) -> Result<NodeId, SearchError> {
        let (child, action, player) = {
            let node = self.tree.get(node_id);
            let edge = &node.edges[edge_idx];
            (edge.child, edge.action, node.to_move)
        };
        if !child.is_none() {
            return Ok(child);
        }

        let (next_state, next_player) = self
            .game
            .apply_action(self.tree.state(node_id), player, action)
            .map_err(|e| ContractViolation::IllegalTransition {
                action,
                player,
                reason: e.0,
            })?;

        let child = self.create_child(node_id, edge_idx, next_state, next_player)?;
        self.tree.get_mut(node_id).edges[edge_idx].child = child;
        Ok(child)
    }

    /// Edge of a chance node for a sampled outcome.
    ///
    /// Outcomes that lead to states with the same canonical key share one
    /// edge and one child.
    fn chance_edge(&mut self, node_id: NodeId, outcome: usize, probability: f64) -> Result<usize, SearchError> {
        let player = self.tree.get(node_id).to_move;
        let (next_state, next_player) = self
            .game
            .apply_chance(self.tree.state(node_id), outcome)
            .map_err(|e| ContractViolation::IllegalTransition {
                action: outcome,
                player,
                reason: e.0,
            })?;

        let key = (node_id, self.game.canonical_key(&next_state));
        if let Some(&edge_idx) = self.chance_children.get(&key) {
            return Ok(edge_idx);
        }

        let edge_idx = self.tree.get(node_id).edges.len();
        let child = self.create_child(node_id, edge_idx, next_state, next_player)?;

        let mut edge = Edge::new(outcome, self.tree.player_count(), probability as f32);
        edge.child = child;
        self.tree.get_mut(node_id).edges.push(edge);
        self.chance_children.insert(key, edge_idx);
        Ok(edge_idx)
    }

    fn create_child(
        &mut self,
        parent: NodeId,
        edge_idx: usize,
        state: G::State,
        player: PlayerId,
    ) -> Result<NodeId, SearchError> {
        let kind = self.classify(&state, player)?;
        let depth = self.tree.get(parent).depth.saturating_add(1);
        self.stats.max_depth = self.stats.max_depth.max(depth);
        self.stats.nodes_created += 1;

        let node = MCTSNode::new(parent, edge_idx as u32, player, depth, kind);
        Ok(self.tree.alloc(node, state))
    }

    /// Decide what kind of node `state` becomes, validating what the game
    /// reports about it.
    fn classify(&self, state: &G::State, player: PlayerId) -> Result<NodeKind, SearchError> {
        let player_count = self.tree.player_count();

        if let Some(outcome) = self.game.terminal_value(state) {
            if outcome.player_count() != player_count {
                return Err(ContractViolation::ValueShape {
                    expected: player_count,
                    actual: outcome.player_count(),
                }
                .into());
            }
            return Ok(NodeKind::Terminal { outcome });
        }

        let outcomes = self.game.chance_outcomes(state);
        if !outcomes.is_empty() {
            validate_chance_outcomes(&outcomes)?;
            return Ok(NodeKind::Chance { outcomes });
        }

        let legal = self.game.legal_actions(state, player);
        if legal.none_legal() {
            return Err(ContractViolation::NoLegalActions(player).into());
        }
        Ok(NodeKind::Decision { legal })
    }

    /// Add the value vector and score to every edge on the path.
    fn backpropagate(&mut self, path: &[(NodeId, usize)], values: &PlayerMap<f64>, score: f64) {
        for &(node_id, edge_idx) in path.iter().rev() {
            let node = self.tree.get_mut(node_id);
            node.visits += 1;

            let edge = &mut node.edges[edge_idx];
            edge.visits += 1;
            edge.total_value.accumulate(values);
            edge.total_score += score;
        }
    }

    fn result(&self, simulations: u32, truncated: bool) -> SearchResult {
        let root = self.tree.root_node();
        let action_count = self.game.action_count();
        let player_count = self.tree.player_count();

        let mut visits = vec![0u32; action_count];
        for edge in &root.edges {
            if let Some(slot) = visits.get_mut(edge.action) {
                *slot = edge.visits;
            }
        }

        let total = root.edge_visits();
        let distribution = if total == 0 {
            root.legal()
                .map(ActionMask::uniform)
                .unwrap_or_else(|| vec![0.0; action_count])
        } else {
            visits.iter().map(|&v| v as f32 / total as f32).collect()
        };

        let (root_value, root_score) = if root.visits > 0 {
            let mut values = PlayerMap::with_value(player_count, 0.0);
            let mut score = 0.0;
            for edge in &root.edges {
                values.accumulate(&edge.total_value);
                score += edge.total_score;
            }
            let n = f64::from(root.visits);
            (values.scaled(n), score / n)
        } else {
            self.root_estimate
                .clone()
                .unwrap_or_else(|| (PlayerMap::with_value(player_count, 0.0), 0.0))
        };

        SearchResult {
            visits,
            distribution,
            root_value,
            root_score,
            simulations,
            truncated,
        }
    }

    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    #[must_use]
    pub fn tree(&self) -> &MCTSTree<G::State> {
        &self.tree
    }

    #[must_use]
    pub fn config(&self) -> &MCTSConfig {
        &self.config
    }

    #[must_use]
    pub fn game(&self) -> &'a G {
        self.game
    }

    /// Root evaluation from the last `prepare_root`, absolute seat order.
    #[must_use]
    pub fn root_estimate(&self) -> Option<&(PlayerMap<f64>, f64)> {
        self.root_estimate.as_ref()
    }
}
