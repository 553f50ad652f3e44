//! Self-play bindings for Python.

use std::sync::Arc;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::core::EngineConfig;
use crate::game::Game;
use crate::games::{CardReveal, Countdown};
use crate::mcts::{ExplorationConfig, MCTSConfig};
use crate::nn::{BatchConfig, BatchingEvaluator, Evaluator, UniformEvaluator};
use crate::training::{Arena, ArenaConfig, SelfPlayConfig, SelfPlayWorker};

use super::py_nn::PyEvaluator;
use super::py_training::PyTrajectory;

/// Python wrapper for SelfPlayConfig.
#[pyclass(name = "SelfPlayConfig")]
#[derive(Clone)]
pub struct PySelfPlayConfig(pub SelfPlayConfig);

#[pymethods]
impl PySelfPlayConfig {
    /// Create a self-play configuration.
    ///
    /// Defaults match the Rust `SelfPlayConfig`, `MCTSConfig` and
    /// `ExplorationConfig` defaults.
    #[new]
    #[pyo3(signature = (
        full_simulations = 600,
        fast_simulations = 100,
        full_search_probability = 0.25,
        dirichlet_alpha = 0.3,
        dirichlet_epsilon = 0.25,
        forced_playout_k = 2.0,
        prune_policy = true,
        c_puct = 1.25,
        temperature = 1.0,
        temperature_threshold = 30,
        max_moves = 500,
        move_time_limit_ms = None,
        workers = 1,
        seed_offset = 0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        full_simulations: u32,
        fast_simulations: u32,
        full_search_probability: f64,
        dirichlet_alpha: f64,
        dirichlet_epsilon: f64,
        forced_playout_k: f64,
        prune_policy: bool,
        c_puct: f64,
        temperature: f64,
        temperature_threshold: usize,
        max_moves: usize,
        move_time_limit_ms: Option<u64>,
        workers: usize,
        seed_offset: u64,
    ) -> PyResult<Self> {
        let exploration = ExplorationConfig::default()
            .with_simulations(full_simulations, fast_simulations)
            .with_full_search_probability(full_search_probability)
            .with_dirichlet(dirichlet_alpha, dirichlet_epsilon)
            .with_forced_playouts(forced_playout_k);
        let min_visits = exploration.prune_min_visits;
        let exploration = exploration.with_pruning(prune_policy, min_visits);

        let mut config = SelfPlayConfig::default()
            .with_mcts(MCTSConfig::default().with_c_puct(c_puct))
            .with_exploration(exploration)
            .with_temperature(temperature)
            .with_temperature_threshold(temperature_threshold)
            .with_max_moves(max_moves)
            .with_workers(workers)
            .with_seed_offset(seed_offset);
        config.move_time_limit_ms = move_time_limit_ms;

        let engine = EngineConfig {
            self_play: config,
            ..EngineConfig::default()
        };
        engine
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self(engine.self_play))
    }

    /// Read the `[self_play]` section of a TOML engine config. The whole
    /// config is validated on the way in.
    #[staticmethod]
    fn from_toml(content: &str) -> PyResult<Self> {
        let engine = EngineConfig::from_toml_str(content).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self(engine.self_play))
    }

    #[getter]
    fn full_simulations(&self) -> u32 {
        self.0.exploration.full_simulations
    }

    #[getter]
    fn fast_simulations(&self) -> u32 {
        self.0.exploration.fast_simulations
    }

    #[getter]
    fn temperature(&self) -> f64 {
        self.0.temperature
    }

    #[getter]
    fn max_moves(&self) -> usize {
        self.0.max_moves
    }

    #[getter]
    fn workers(&self) -> usize {
        self.0.workers
    }

    fn __repr__(&self) -> String {
        format!(
            "SelfPlayConfig(full={}, fast={}, p_full={}, temp={}, max_moves={}, workers={})",
            self.0.exploration.full_simulations,
            self.0.exploration.fast_simulations,
            self.0.exploration.full_search_probability,
            self.0.temperature,
            self.0.max_moves,
            self.0.workers
        )
    }
}

/// Evaluator shared by the worker threads: the Python callable (or a
/// uniform baseline), behind a batching queue when `batch_size > 1`.
fn shared_evaluator(
    py: Python<'_>,
    evaluator: Option<&PyEvaluator>,
    batch_size: usize,
    action_count: usize,
    player_count: usize,
) -> Arc<dyn Evaluator> {
    let base: Arc<dyn Evaluator> = match evaluator {
        Some(evaluator) => Arc::new(evaluator.clone_ref(py)),
        None => Arc::new(UniformEvaluator::new(action_count, player_count)),
    };
    if batch_size > 1 {
        Arc::new(BatchingEvaluator::spawn(
            base,
            BatchConfig::default().with_batch_size(batch_size),
        ))
    } else {
        base
    }
}

/// Run `count` games with the GIL released so a Python evaluator can be
/// called from the worker threads. Failed games are logged and skipped.
fn play_many<G: Game>(
    py: Python<'_>,
    worker: &SelfPlayWorker<G, Arc<dyn Evaluator>>,
    count: usize,
) -> Vec<PyTrajectory> {
    py.allow_threads(|| worker.play_games(count))
        .into_iter()
        .filter_map(Result::ok)
        .map(PyTrajectory)
        .collect()
}

fn play_one<G: Game>(
    py: Python<'_>,
    worker: &SelfPlayWorker<G, Arc<dyn Evaluator>>,
    seed: u64,
) -> PyResult<PyTrajectory> {
    py.allow_threads(|| worker.play_game(seed))
        .map(PyTrajectory)
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Self-play worker for Countdown.
#[pyclass(name = "CountdownWorker")]
pub struct PyCountdownWorker {
    inner: SelfPlayWorker<Countdown, Arc<dyn Evaluator>>,
}

#[pymethods]
impl PyCountdownWorker {
    #[new]
    #[pyo3(signature = (config, player_count = 2, start = 21, max_take = 3, evaluator = None, batch_size = 1))]
    fn new(
        py: Python<'_>,
        config: &PySelfPlayConfig,
        player_count: usize,
        start: u32,
        max_take: usize,
        evaluator: Option<&PyEvaluator>,
        batch_size: usize,
    ) -> PyResult<Self> {
        if player_count == 0 || max_take == 0 {
            return Err(PyValueError::new_err("player_count and max_take must be positive"));
        }
        let game = Countdown::new(player_count, start, max_take);
        let evaluator = shared_evaluator(py, evaluator, batch_size, game.action_count(), player_count);
        Ok(Self {
            inner: SelfPlayWorker::new(game, evaluator, config.0.clone()),
        })
    }

    fn play_game(&self, py: Python<'_>, seed: u64) -> PyResult<PyTrajectory> {
        play_one(py, &self.inner, seed)
    }

    fn play_games(&self, py: Python<'_>, count: usize) -> Vec<PyTrajectory> {
        play_many(py, &self.inner, count)
    }

    /// Pit two evaluators against each other; `None` is the uniform
    /// baseline. Returns `(one_wins, two_wins, draws)`; games abandoned on a
    /// contract violation are left out.
    #[pyo3(signature = (one = None, two = None, games = 20, simulations = 200, seed = 0))]
    fn arena(
        &self,
        py: Python<'_>,
        one: Option<&PyEvaluator>,
        two: Option<&PyEvaluator>,
        games: usize,
        simulations: u32,
        seed: u64,
    ) -> PyResult<(usize, usize, usize)> {
        let game = self.inner.game();
        let (actions, players) = (game.action_count(), game.player_count());
        let one = shared_evaluator(py, one, 1, actions, players);
        let two = shared_evaluator(py, two, 1, actions, players);
        let config = ArenaConfig {
            mcts: self.inner.config().mcts.clone(),
            ..ArenaConfig::default()
        }
        .with_simulations(simulations);

        let result = py
            .allow_threads(|| Arena::new(game, &one, &two, config).play_games(games, seed))
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        Ok((result.one_wins, result.two_wins, result.draws))
    }

    fn __repr__(&self) -> String {
        format!("CountdownWorker({:?})", self.inner.config().exploration)
    }
}

/// Self-play worker for Card Reveal.
#[pyclass(name = "CardRevealWorker")]
pub struct PyCardRevealWorker {
    inner: SelfPlayWorker<CardReveal, Arc<dyn Evaluator>>,
}

#[pymethods]
impl PyCardRevealWorker {
    #[new]
    #[pyo3(signature = (config, player_count = 2, bust_limit = 10, evaluator = None, batch_size = 1))]
    fn new(
        py: Python<'_>,
        config: &PySelfPlayConfig,
        player_count: usize,
        bust_limit: u32,
        evaluator: Option<&PyEvaluator>,
        batch_size: usize,
    ) -> PyResult<Self> {
        if player_count == 0 {
            return Err(PyValueError::new_err("player_count must be positive"));
        }
        let game = CardReveal::new(player_count).with_bust_limit(bust_limit);
        let evaluator = shared_evaluator(py, evaluator, batch_size, game.action_count(), player_count);
        Ok(Self {
            inner: SelfPlayWorker::new(game, evaluator, config.0.clone()),
        })
    }

    fn play_game(&self, py: Python<'_>, seed: u64) -> PyResult<PyTrajectory> {
        play_one(py, &self.inner, seed)
    }

    fn play_games(&self, py: Python<'_>, count: usize) -> Vec<PyTrajectory> {
        play_many(py, &self.inner, count)
    }

    fn __repr__(&self) -> String {
        format!("CardRevealWorker({:?})", self.inner.config().exploration)
    }
}
