//! Head-to-head evaluation of two evaluators.
//!
//! Both sides search every move with plain MCTS (no noise, no forced
//! playouts) and play the most visited action. Seating alternates in the
//! pattern one-two, two-one, two-one, one-two so neither side keeps the
//! first-move advantage.
//!
//! A game that breaks the game or evaluator contract is logged and counted
//! in `failed`; the rest of the run carries on. Any other search error
//! ends the run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::core::{GameRng, PlayerId};
use crate::error::{ContractViolation, SelfPlayError};
use crate::game::Game;
use crate::mcts::{MCTSConfig, MCTSSearch, SearchBudget};
use crate::nn::Evaluator;

use super::self_play::resolve_chance;

/// Arena configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub mcts: MCTSConfig,

    /// Simulations per move.
    pub simulations: u32,

    /// Games longer than this are scored as draws.
    pub max_moves: usize,

    pub move_time_limit_ms: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            mcts: MCTSConfig::default(),
            simulations: 200,
            max_moves: 500,
            move_time_limit_ms: None,
        }
    }
}

impl ArenaConfig {
    pub fn with_simulations(mut self, simulations: u32) -> Self {
        self.simulations = simulations;
        self
    }

    pub fn with_max_moves(mut self, max_moves: usize) -> Self {
        self.max_moves = max_moves;
        self
    }

    pub fn with_move_time_limit(mut self, limit: Duration) -> Self {
        self.move_time_limit_ms = Some(limit.as_millis() as u64);
        self
    }
}

/// Tally of an arena run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaResult {
    pub one_wins: usize,
    pub two_wins: usize,
    pub draws: usize,

    /// Games abandoned on a contract violation.
    pub failed: usize,
}

impl ArenaResult {
    /// Games that reached a result.
    #[must_use]
    pub fn games(&self) -> usize {
        self.one_wins + self.two_wins + self.draws
    }

    /// Share of decided games won by agent one; 0.5 when nothing was decided.
    #[must_use]
    pub fn one_win_rate(&self) -> f64 {
        let decided = self.one_wins + self.two_wins;
        if decided == 0 {
            0.5
        } else {
            self.one_wins as f64 / decided as f64
        }
    }
}

/// Which agent a seat belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Agent {
    One,
    Two,
}

/// Pits two evaluators against each other on one game.
///
/// With more than two seats the agents alternate around the table, the
/// agent going first taking the even seats.
pub struct Arena<'a, G: Game, A: Evaluator + ?Sized, B: Evaluator + ?Sized> {
    game: &'a G,
    one: &'a A,
    two: &'a B,
    config: ArenaConfig,
}

impl<'a, G: Game, A: Evaluator + ?Sized, B: Evaluator + ?Sized> Arena<'a, G, A, B> {
    pub fn new(game: &'a G, one: &'a A, two: &'a B, config: ArenaConfig) -> Self {
        Self { game, one, two, config }
    }

    /// Play `num` games; game `i` uses seed `seed + i`.
    pub fn play_games(&self, num: usize, seed: u64) -> Result<ArenaResult, SelfPlayError> {
        let mut result = ArenaResult::default();

        for i in 0..num {
            let one_first = i % 4 == 0 || i % 4 == 3;
            let game_seed = seed.wrapping_add(i as u64);
            match self.play_game(one_first, game_seed) {
                Ok(Some(Agent::One)) => result.one_wins += 1,
                Ok(Some(Agent::Two)) => result.two_wins += 1,
                Ok(None) => result.draws += 1,
                Err(err) if err.is_contract_violation() => {
                    error!(game = i, seed = game_seed, error = %err, "arena game failed");
                    result.failed += 1;
                }
                Err(err) => return Err(err),
            }
            debug!(game = i, one_first, ?result, "arena game finished");
        }

        info!(
            games = num,
            one_wins = result.one_wins,
            two_wins = result.two_wins,
            draws = result.draws,
            failed = result.failed,
            "arena finished"
        );
        Ok(result)
    }

    /// Play one game and return the winning agent, `None` for a draw.
    fn play_game(&self, one_first: bool, seed: u64) -> Result<Option<Agent>, SelfPlayError> {
        let game = self.game;
        let seat_agent = |seat: PlayerId| match (seat.index() % 2 == 0, one_first) {
            (true, true) | (false, false) => Agent::One,
            _ => Agent::Two,
        };

        let mut rng = GameRng::new(seed);
        let (mut state, mut player) = game.initial_state(&mut rng);
        let mut search_one = MCTSSearch::new(game, self.one, self.config.mcts.clone());
        let mut search_two = MCTSSearch::new(game, self.two, self.config.mcts.clone());

        let mut move_number = 0;
        loop {
            if let Some(outcome) = game.terminal_value(&state) {
                return Ok(outcome.values.unique_max().map(seat_agent));
            }

            let outcomes = game.chance_outcomes(&state);
            if !outcomes.is_empty() {
                (state, player) = resolve_chance(game, &state, player, &outcomes, seed, &mut rng)?;
                continue;
            }

            if move_number >= self.config.max_moves {
                return Ok(None);
            }

            let mut budget = SearchBudget::simulations(self.config.simulations);
            if let Some(ms) = self.config.move_time_limit_ms {
                budget = budget.with_time_limit(Duration::from_millis(ms));
            }
            let searched = match seat_agent(player) {
                Agent::One => search_one.search(&state, player, &budget, &mut rng),
                Agent::Two => search_two.search(&state, player, &budget, &mut rng),
            };
            let searched = searched.map_err(|source| SelfPlayError::Search {
                seed,
                move_number,
                source,
            })?;

            let action = searched.best_action().ok_or(SelfPlayError::Contract {
                seed,
                source: ContractViolation::NoLegalActions(player),
            })?;
            (state, player) = game.apply_action(&state, player, action).map_err(|err| {
                SelfPlayError::Contract {
                    seed,
                    source: ContractViolation::IllegalTransition {
                        action,
                        player,
                        reason: err.0,
                    },
                }
            })?;
            move_number += 1;
        }
    }
}
