//! Python bindings for the rust-azero self-play engine.
//!
//! Built with the `python` feature. The network lives on the Python side
//! and is called through an `Evaluator` wrapping any callable.
//!
//! # Quick Start
//!
//! ```python
//! import rust_azero as az
//!
//! def network(states):
//!     # One (policy, values, score) row per state; values are in the
//!     # frame of the player to move.
//!     return [([1 / 3] * 3, [0.0, 0.0], 0.0) for _ in states]
//!
//! config = az.SelfPlayConfig(full_simulations=200, fast_simulations=40)
//! evaluator = az.Evaluator(network, action_count=3, player_count=2)
//! worker = az.CountdownWorker(config, evaluator=evaluator, batch_size=8)
//!
//! buffer = az.ExperienceBuffer(1000)
//! for trajectory in worker.play_games(16):
//!     buffer.push(trajectory)
//!
//! states, policies, values, scores = buffer.to_numpy_batch()
//! ```

use pyo3::prelude::*;

mod py_core;
mod py_games;
mod py_nn;
mod py_self_play;
mod py_training;

pub use py_core::*;
pub use py_games::*;
pub use py_nn::*;
pub use py_self_play::*;
pub use py_training::*;

/// rust-azero: AlphaZero-style self-play for N-player games with chance.
#[pymodule]
fn rust_azero(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPlayerId>()?;

    m.add_class::<PyEncodedState>()?;
    m.add_class::<PyEvaluator>()?;

    m.add_class::<PyStep>()?;
    m.add_class::<PyTrajectory>()?;
    m.add_class::<PyTrainingExample>()?;
    m.add_class::<PyExperienceBuffer>()?;
    m.add_class::<PyTrajectoryIterator>()?;

    m.add_class::<PySelfPlayConfig>()?;
    m.add_class::<PyCountdownWorker>()?;
    m.add_class::<PyCardRevealWorker>()?;

    m.add_class::<PyCountdown>()?;
    m.add_class::<PyCardReveal>()?;

    Ok(())
}
