//! Self-play data generation and evaluation.
//!
//! ## Overview
//!
//! - **SelfPlayWorker**: plays games with the exploration controller and
//!   records a `Trajectory` per game
//! - **Trajectory**: one game's decisions plus its outcome; converts to
//!   `TrainingExample`s (fast-searched moves are dropped)
//! - **ExperienceBuffer**: FIFO of trajectories with seeded sampling
//! - **Arena**: head-to-head comparison of two evaluators
//!
//! ## Usage
//!
//! ```rust
//! use rust_azero::games::Countdown;
//! use rust_azero::mcts::ExplorationConfig;
//! use rust_azero::nn::UniformEvaluator;
//! use rust_azero::training::{ExperienceBuffer, SelfPlayConfig, SelfPlayWorker};
//!
//! let game = Countdown::new(2, 6, 3);
//! let evaluator = UniformEvaluator::new(3, 2);
//! let config = SelfPlayConfig::default()
//!     .with_exploration(ExplorationConfig::default().with_simulations(32, 8))
//!     .with_workers(2);
//! let worker = SelfPlayWorker::new(game, evaluator, config);
//!
//! let mut buffer = ExperienceBuffer::new(100);
//! for trajectory in worker.play_games(4) {
//!     buffer.push(trajectory.unwrap());
//! }
//! let batch = buffer.sample_batch(16, 7);
//! assert!(batch.len() <= 16);
//! ```

pub mod arena;
pub mod self_play;
pub mod trajectory;

// Re-export main types
pub use arena::{Arena, ArenaConfig, ArenaResult};
pub use self_play::{select_action, SelfPlayConfig, SelfPlayWorker};
pub use trajectory::{decode_examples, encode_examples, ExperienceBuffer, Step, Trajectory, TrainingExample};
