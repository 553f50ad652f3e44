//! Self-play loop for generating training data.
//!
//! Plays games with the exploration controller driving one search per
//! move, and records every decision into a [`Trajectory`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::{GameRng, PlayerId};
use crate::error::{ContractViolation, SelfPlayError};
use crate::game::{validate_chance_outcomes, Game, GameOutcome};
use crate::mcts::{ExplorationConfig, ExplorationController, MCTSConfig, MCTSSearch};
use crate::nn::Evaluator;

use super::trajectory::{Step, Trajectory};

/// Temperatures below this pick the most visited action.
const GREEDY_TEMPERATURE: f64 = 1e-3;

/// Configuration for self-play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    pub mcts: MCTSConfig,

    pub exploration: ExplorationConfig,

    /// Temperature for action selection during the early game.
    pub temperature: f64,

    /// Move number at which to switch to greedy (temperature = 0).
    /// 0 = always use temperature.
    pub temperature_threshold: usize,

    /// Maximum moves per game. Longer games are truncated.
    pub max_moves: usize,

    /// Wall-clock budget for one move's search.
    pub move_time_limit_ms: Option<u64>,

    /// Wall-clock budget for a whole game. Longer games are truncated.
    pub episode_time_limit_ms: Option<u64>,

    /// Seed offset for RNG (combined with game index for unique seeds).
    pub seed_offset: u64,

    /// Threads used by [`SelfPlayWorker::play_games`].
    pub workers: usize,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            mcts: MCTSConfig::default(),
            exploration: ExplorationConfig::default(),
            temperature: 1.0,
            temperature_threshold: 30,
            max_moves: 500,
            move_time_limit_ms: None,
            episode_time_limit_ms: None,
            seed_offset: 0,
            workers: 1,
        }
    }
}

impl SelfPlayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mcts(mut self, mcts: MCTSConfig) -> Self {
        self.mcts = mcts;
        self
    }

    pub fn with_exploration(mut self, exploration: ExplorationConfig) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_temperature_threshold(mut self, threshold: usize) -> Self {
        self.temperature_threshold = threshold;
        self
    }

    pub fn with_max_moves(mut self, max: usize) -> Self {
        self.max_moves = max;
        self
    }

    pub fn with_move_time_limit(mut self, limit: Duration) -> Self {
        self.move_time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    pub fn with_episode_time_limit(mut self, limit: Duration) -> Self {
        self.episode_time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    pub fn with_seed_offset(mut self, offset: u64) -> Self {
        self.seed_offset = offset;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Temperature for a given move number.
    #[must_use]
    pub fn effective_temperature(&self, move_number: usize) -> f64 {
        if self.temperature_threshold > 0 && move_number >= self.temperature_threshold {
            0.0
        } else {
            self.temperature
        }
    }
}

/// Pick an action from a visit distribution.
///
/// With `temperature` near zero this is the argmax (lowest index on ties);
/// otherwise actions are sampled with weight `p^(1/temperature)`. Returns
/// `None` when no entry is positive.
pub fn select_action(distribution: &[f32], temperature: f64, rng: &mut GameRng) -> Option<usize> {
    if temperature < GREEDY_TEMPERATURE {
        let mut best: Option<(usize, f32)> = None;
        for (action, &p) in distribution.iter().enumerate() {
            if p > 0.0 && best.map_or(true, |(_, best_p)| p > best_p) {
                best = Some((action, p));
            }
        }
        return best.map(|(action, _)| action);
    }

    // Scaled by the largest entry so the mode keeps weight 1 at any temperature.
    let max_p = distribution.iter().copied().fold(0.0f32, f32::max);
    if max_p <= 0.0 {
        return None;
    }
    let exponent = 1.0 / temperature;
    let weights: Vec<f64> = distribution
        .iter()
        .map(|&p| {
            if p > 0.0 {
                (f64::from(p) / f64::from(max_p)).powf(exponent)
            } else {
                0.0
            }
        })
        .collect();
    rng.choose_weighted(&weights)
}

/// Sample a chance outcome with the episode generator and apply it.
pub(crate) fn resolve_chance<G: Game>(
    game: &G,
    state: &G::State,
    player: PlayerId,
    outcomes: &[(usize, f64)],
    seed: u64,
    rng: &mut GameRng,
) -> Result<(G::State, PlayerId), SelfPlayError> {
    let contract = |source| SelfPlayError::Contract { seed, source };

    validate_chance_outcomes(outcomes).map_err(contract)?;
    let weights: Vec<f64> = outcomes.iter().map(|&(_, p)| p).collect();
    let idx = rng.choose_weighted(&weights).ok_or_else(|| {
        contract(ContractViolation::ChanceDistribution(
            "no outcome has positive probability".into(),
        ))
    })?;

    let outcome = outcomes[idx].0;
    game.apply_chance(state, outcome).map_err(|err| {
        contract(ContractViolation::IllegalTransition {
            action: outcome,
            player,
            reason: err.0,
        })
    })
}

/// Runs self-play games for one game and one evaluator.
pub struct SelfPlayWorker<G: Game, E: Evaluator> {
    game: G,
    evaluator: E,
    config: SelfPlayConfig,
    controller: ExplorationController,
}

impl<G: Game, E: Evaluator> SelfPlayWorker<G, E> {
    pub fn new(game: G, evaluator: E, config: SelfPlayConfig) -> Self {
        let controller = ExplorationController::new(config.exploration.clone());
        Self {
            game,
            evaluator,
            config,
            controller,
        }
    }

    /// Play one game from the game's initial state.
    ///
    /// All randomness (initial state, chance events, search mode, noise,
    /// action sampling) comes from one generator seeded with `seed`.
    pub fn play_game(&self, seed: u64) -> Result<Trajectory, SelfPlayError> {
        let game = &self.game;
        let player_count = game.player_count();
        let started = Instant::now();
        let episode_deadline = self
            .config
            .episode_time_limit_ms
            .map(|ms| started + Duration::from_millis(ms));

        let mut rng = GameRng::new(seed);
        let (mut state, mut player) = game.initial_state(&mut rng);
        let mut trajectory = Trajectory::new(seed, player_count);
        let mut search = MCTSSearch::new(game, &self.evaluator, self.config.mcts.clone());
        let mut estimate: Option<GameOutcome> = None;
        let mut move_number = 0;

        loop {
            if let Some(outcome) = game.terminal_value(&state) {
                trajectory.set_outcome(outcome);
                break;
            }

            let outcomes = game.chance_outcomes(&state);
            if !outcomes.is_empty() {
                (state, player) = resolve_chance(game, &state, player, &outcomes, seed, &mut rng)?;
                continue;
            }

            let out_of_time = episode_deadline.is_some_and(|deadline| Instant::now() >= deadline);
            if move_number >= self.config.max_moves || out_of_time {
                trajectory.truncated = true;
                trajectory.set_outcome(
                    estimate
                        .take()
                        .unwrap_or_else(|| GameOutcome::uniform(player_count, 0.0)),
                );
                break;
            }

            let move_deadline = self
                .config
                .move_time_limit_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms));
            let deadline = match (move_deadline, episode_deadline) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };

            let searched = self
                .controller
                .search_move(&mut search, &state, player, deadline, &mut rng)
                .map_err(|source| SelfPlayError::Search {
                    seed,
                    move_number,
                    source,
                })?;
            let result = &searched.result;
            estimate = Some(GameOutcome::new(result.root_value.clone(), result.root_score));

            let temperature = self.config.effective_temperature(move_number);
            let action = select_action(&result.distribution, temperature, &mut rng).ok_or(
                SelfPlayError::Contract {
                    seed,
                    source: ContractViolation::NoLegalActions(player),
                },
            )?;

            debug!(
                move_number,
                %player,
                action,
                mode = ?searched.mode,
                simulations = result.simulations,
                truncated = result.truncated,
                "move searched"
            );

            let (next_state, next_player) =
                game.apply_action(&state, player, action)
                    .map_err(|err| SelfPlayError::Contract {
                        seed,
                        source: ContractViolation::IllegalTransition {
                            action,
                            player,
                            reason: err.0,
                        },
                    })?;

            trajectory.push(Step {
                encoded_state: game.encode(&state, player),
                player,
                mode: searched.mode,
                policy_target: searched.policy_target,
                distribution: searched.result.distribution,
                action,
                move_number,
            });

            state = next_state;
            player = next_player;
            move_number += 1;
        }

        if trajectory.truncated {
            warn!(seed, moves = trajectory.len(), "episode truncated");
        }
        info!(
            seed,
            moves = trajectory.len(),
            examples = trajectory.full_steps(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "episode finished"
        );

        Ok(trajectory)
    }

    /// Play `count` games on `workers` threads.
    ///
    /// Game `i` uses seed `seed_offset + i`; results come back in game
    /// order. A failing game does not stop the others.
    pub fn play_games(&self, count: usize) -> Vec<Result<Trajectory, SelfPlayError>> {
        let workers = self.config.workers.clamp(1, count.max(1));
        let next = &AtomicUsize::new(0);
        let mut results: Vec<Option<Result<Trajectory, SelfPlayError>>> =
            (0..count).map(|_| None).collect();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut finished = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            if i >= count {
                                break;
                            }
                            let seed = self.config.seed_offset.wrapping_add(i as u64);
                            let result = self.play_game(seed);
                            if let Err(err) = &result {
                                error!(seed, error = %err, "self-play episode failed");
                            }
                            finished.push((i, result));
                        }
                        finished
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(finished) => {
                        for (i, result) in finished {
                            results[i] = Some(result);
                        }
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });

        results.into_iter().flatten().collect()
    }

    #[must_use]
    pub fn game(&self) -> &G {
        &self.game
    }

    #[must_use]
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    #[must_use]
    pub fn config(&self) -> &SelfPlayConfig {
        &self.config
    }
}
