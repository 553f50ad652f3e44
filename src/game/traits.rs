use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ActionMask, GameRng, PlayerId, PlayerMap};
use crate::error::ContractViolation;
use crate::nn::EncodedState;

/// Tolerance on the total probability mass of a chance distribution.
const CHANCE_MASS_TOLERANCE: f64 = 1e-4;

/// Final result of a game, or the engine's best estimate of one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameOutcome {
    /// Value for every seat, absolute seat order.
    pub values: PlayerMap<f64>,

    /// Scalar score target. Perspective-free: the same number for every seat.
    pub score: f64,
}

impl GameOutcome {
    pub fn new(values: PlayerMap<f64>, score: f64) -> Self {
        Self { values, score }
    }

    /// Every seat gets `value`.
    pub fn uniform(player_count: usize, value: f64) -> Self {
        Self::new(PlayerMap::with_value(player_count, value), 0.0)
    }

    /// Winner gets 1, everyone else 0.
    pub fn winner(player_count: usize, winner: PlayerId, score: f64) -> Self {
        Self::new(
            PlayerMap::new(player_count, |p| if p == winner { 1.0 } else { 0.0 }),
            score,
        )
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.values.player_count()
    }
}

/// A game refused a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct IllegalTransition(pub String);

impl IllegalTransition {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Rules of a turn-based game with an optional chance component.
///
/// States are values: transitions return a new state and never mutate
/// their input, so the search tree can keep every state it reached.
///
/// A state is in exactly one of three situations:
///
/// - terminal: [`Game::terminal_value`] returns `Some`;
/// - chance: [`Game::chance_outcomes`] is non-empty, and the next state is
///   produced by [`Game::apply_chance`];
/// - decision: the player to move picks one of [`Game::legal_actions`].
pub trait Game: Send + Sync {
    /// Immutable game state.
    type State: Clone + Debug + Send + Sync;

    /// Canonical identity of a state. Two states with equal keys are
    /// interchangeable for search purposes.
    type Key: Clone + Eq + Hash + Debug + Send + Sync;

    /// Number of seats.
    fn player_count(&self) -> usize;

    /// Size of the fixed action space.
    fn action_count(&self) -> usize;

    /// Starting state and the player to move in it.
    fn initial_state(&self, rng: &mut GameRng) -> (Self::State, PlayerId);

    /// Legal actions for `player` in a decision state.
    fn legal_actions(&self, state: &Self::State, player: PlayerId) -> ActionMask;

    /// Apply `action` for `player`, returning the next state and the player
    /// to move in it.
    fn apply_action(
        &self,
        state: &Self::State,
        player: PlayerId,
        action: usize,
    ) -> Result<(Self::State, PlayerId), IllegalTransition>;

    /// `Some` when the state is terminal.
    fn terminal_value(&self, state: &Self::State) -> Option<GameOutcome>;

    /// `(outcome, probability)` pairs for a chance state; empty otherwise.
    fn chance_outcomes(&self, _state: &Self::State) -> Vec<(usize, f64)> {
        Vec::new()
    }

    /// Resolve a chance state with the given outcome.
    fn apply_chance(
        &self,
        _state: &Self::State,
        outcome: usize,
    ) -> Result<(Self::State, PlayerId), IllegalTransition> {
        Err(IllegalTransition::new(format!(
            "chance outcome {outcome} in a game without chance events"
        )))
    }

    /// Canonical key used to merge identical chance children.
    fn canonical_key(&self, state: &Self::State) -> Self::Key;

    /// Tensor encoding of `state` as seen by `player`.
    fn encode(&self, state: &Self::State, player: PlayerId) -> EncodedState;
}

/// Check that a chance distribution is non-empty, finite, non-negative and
/// sums to one.
pub fn validate_chance_outcomes(outcomes: &[(usize, f64)]) -> Result<(), ContractViolation> {
    if outcomes.is_empty() {
        return Err(ContractViolation::ChanceDistribution("no outcomes".into()));
    }
    if let Some(&(outcome, p)) = outcomes.iter().find(|(_, p)| !p.is_finite() || *p < 0.0) {
        return Err(ContractViolation::ChanceDistribution(format!(
            "outcome {outcome} has probability {p}"
        )));
    }
    let mass: f64 = outcomes.iter().map(|(_, p)| p).sum();
    if (mass - 1.0).abs() > CHANCE_MASS_TOLERANCE {
        return Err(ContractViolation::ChanceDistribution(format!(
            "probabilities sum to {mass}"
        )));
    }
    Ok(())
}
