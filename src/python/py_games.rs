//! Game bindings for Python.
//!
//! Each bundled game is exposed as a stateful session: the Python side
//! steps through one game, resolving chance events with the session's own
//! seeded generator.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::core::{GameRng, PlayerId};
use crate::game::Game;
use crate::games::{CardReveal, Countdown};

use super::py_core::PyPlayerId;
use super::py_nn::PyEncodedState;

/// One game in progress.
struct Session<G: Game> {
    game: G,
    state: G::State,
    player: PlayerId,
    rng: GameRng,
}

impl<G: Game> Session<G> {
    fn new(game: G, seed: u64) -> Self {
        let mut rng = GameRng::new(seed);
        let (state, player) = game.initial_state(&mut rng);
        Self {
            game,
            state,
            player,
            rng,
        }
    }

    fn legal_actions(&self) -> Vec<usize> {
        self.game.legal_actions(&self.state, self.player).iter().collect()
    }

    fn is_chance(&self) -> bool {
        !self.game.chance_outcomes(&self.state).is_empty()
    }

    fn apply(&mut self, action: usize) -> PyResult<()> {
        let (state, player) = self
            .game
            .apply_action(&self.state, self.player, action)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.state = state;
        self.player = player;
        Ok(())
    }

    /// Sample and apply a chance outcome; returns the outcome drawn.
    fn resolve_chance(&mut self) -> PyResult<usize> {
        let outcomes = self.game.chance_outcomes(&self.state);
        let weights: Vec<f64> = outcomes.iter().map(|&(_, p)| p).collect();
        let idx = self
            .rng
            .choose_weighted(&weights)
            .ok_or_else(|| PyValueError::new_err("not a chance state"))?;
        let outcome = outcomes[idx].0;
        let (state, player) = self
            .game
            .apply_chance(&self.state, outcome)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.state = state;
        self.player = player;
        Ok(outcome)
    }

    fn outcome(&self) -> Option<Vec<f64>> {
        self.game
            .terminal_value(&self.state)
            .map(|o| o.values.as_slice().to_vec())
    }

    fn encode(&self, perspective: Option<&PyPlayerId>) -> PyEncodedState {
        let player = perspective.map_or(self.player, |p| p.0);
        PyEncodedState(self.game.encode(&self.state, player))
    }
}

macro_rules! game_session {
    ($py_name:ident, $name:literal, { $($methods:tt)* }) => {
        #[pymethods]
        impl $py_name {
            $($methods)*

            /// Legal actions for the player to move.
            fn legal_actions(&self) -> Vec<usize> {
                self.session.legal_actions()
            }

            #[getter]
            fn current_player(&self) -> PyPlayerId {
                PyPlayerId(self.session.player)
            }

            #[getter]
            fn action_count(&self) -> usize {
                self.session.game.action_count()
            }

            #[getter]
            fn player_count(&self) -> usize {
                self.session.game.player_count()
            }

            /// `True` when the next step is a chance event.
            fn is_chance(&self) -> bool {
                self.session.is_chance()
            }

            fn apply_action(&mut self, action: usize) -> PyResult<()> {
                self.session.apply(action)
            }

            fn resolve_chance(&mut self) -> PyResult<usize> {
                self.session.resolve_chance()
            }

            fn is_terminal(&self) -> bool {
                self.session.outcome().is_some()
            }

            /// Value per seat once the game is over.
            fn outcome(&self) -> Option<Vec<f64>> {
                self.session.outcome()
            }

            #[pyo3(signature = (perspective = None))]
            fn encode(&self, perspective: Option<&PyPlayerId>) -> PyEncodedState {
                self.session.encode(perspective)
            }

            fn __repr__(&self) -> String {
                format!(
                    "{}(players={}, to_move={})",
                    $name,
                    self.session.game.player_count(),
                    self.session.player.0
                )
            }
        }
    };
}

/// Countdown: take 1 to `max_take` tokens; taking the last one wins.
#[pyclass(name = "Countdown")]
pub struct PyCountdown {
    session: Session<Countdown>,
}

game_session!(PyCountdown, "Countdown", {
    #[new]
    #[pyo3(signature = (player_count = 2, start = 21, max_take = 3, seed = 42))]
    fn new(player_count: usize, start: u32, max_take: usize, seed: u64) -> PyResult<Self> {
        if player_count == 0 || max_take == 0 {
            return Err(PyValueError::new_err("player_count and max_take must be positive"));
        }
        Ok(Self {
            session: Session::new(Countdown::new(player_count, start, max_take), seed),
        })
    }

    #[getter]
    fn remaining(&self) -> u32 {
        self.session.state.remaining
    }
});

/// Card Reveal: draw cards or stop; busting over the limit knocks you out.
#[pyclass(name = "CardReveal")]
pub struct PyCardReveal {
    session: Session<CardReveal>,
}

game_session!(PyCardReveal, "CardReveal", {
    #[new]
    #[pyo3(signature = (player_count = 2, bust_limit = 10, seed = 42))]
    fn new(player_count: usize, bust_limit: u32, seed: u64) -> PyResult<Self> {
        if player_count == 0 {
            return Err(PyValueError::new_err("player_count must be positive"));
        }
        let game = CardReveal::new(player_count).with_bust_limit(bust_limit);
        Ok(Self {
            session: Session::new(game, seed),
        })
    }

    /// Running total per seat.
    #[getter]
    fn totals(&self) -> Vec<u32> {
        self.session.state.totals.iter().copied().collect()
    }
});
