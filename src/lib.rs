//! # rust-azero
//!
//! A self-play MCTS engine for multi-player board games with stochastic
//! events, in the AlphaZero family.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: games plug in through the [`Game`] trait; the
//!    engine never looks inside a state.
//!
//! 2. **N-Player First**: values are per-seat vectors in absolute seat
//!    order. Nothing assumes two players or zero-sum payoffs.
//!
//! 3. **Configuration Over Convention**: every search and exploration
//!    constant is a config field with a documented default.
//!
//! 4. **Reproducible**: all randomness flows from an explicit, seeded
//!    [`GameRng`].
//!
//! ## Architecture
//!
//! - **Arena tree**: search nodes and their states live in flat vectors
//!   addressed by `NodeId`, one tree per in-flight game.
//!
//! - **Chance nodes**: stochastic events are sampled during search, and
//!   identical outcomes share a child.
//!
//! - **Exploration**: root Dirichlet noise, playout-cap randomization,
//!   forced playouts and policy-target pruning.
//!
//! ## Modules
//!
//! - `core`: players, per-player maps, action masks, RNG, configuration
//! - `error`: error taxonomy
//! - `game`: the game contract
//! - `games`: bundled games used by tests and benchmarks
//! - `mcts`: tree search and the exploration controller
//! - `nn`: evaluator interface and batching queue
//! - `training`: self-play, training examples, arena

pub mod core;
pub mod error;
pub mod game;
pub mod games;
pub mod mcts;
pub mod nn;
pub mod training;

#[cfg(feature = "python")]
pub mod python;

// Re-export commonly used types
pub use crate::core::{ActionMask, EngineConfig, GameRng, PlayerId, PlayerMap};

pub use crate::error::{ConfigError, ContractViolation, EvaluatorError, SearchError, SelfPlayError};

pub use crate::game::{Game, GameOutcome, IllegalTransition};

pub use crate::mcts::{
    ExplorationConfig, ExplorationController, MCTSConfig, MCTSSearch, SearchBudget, SearchMode,
    SearchResult,
};

pub use crate::nn::{BatchConfig, BatchingEvaluator, EncodedState, Evaluation, Evaluator, UniformEvaluator};

pub use crate::training::{
    Arena, ArenaConfig, ExperienceBuffer, SelfPlayConfig, SelfPlayWorker, TrainingExample, Trajectory,
};
