//! Monte Carlo Tree Search guided by an evaluator.
//!
//! ## Overview
//!
//! - **Arena tree**: nodes and their game states live in flat vectors
//!   addressed by `NodeId`; each search owns its tree exclusively
//! - **PUCT selection** over priors masked to legal actions
//! - **N-player backup**: value vectors in absolute seat order, never
//!   re-signed
//! - **Chance nodes**: sampled outcomes, children shared by canonical key
//! - **Exploration**: root noise, playout-cap randomization, forced
//!   playouts and policy-target pruning
//!
//! ## Usage
//!
//! ```rust
//! use rust_azero::core::GameRng;
//! use rust_azero::game::Game;
//! use rust_azero::games::Countdown;
//! use rust_azero::mcts::{MCTSConfig, MCTSSearch, SearchBudget};
//! use rust_azero::nn::UniformEvaluator;
//!
//! let game = Countdown::new(2, 10, 3);
//! let evaluator = UniformEvaluator::new(game.action_count(), game.player_count());
//! let mut rng = GameRng::new(42);
//! let (state, player) = game.initial_state(&mut rng);
//!
//! let mut search = MCTSSearch::new(&game, &evaluator, MCTSConfig::default());
//! let result = search
//!     .search(&state, player, &SearchBudget::simulations(200), &mut rng)
//!     .unwrap();
//!
//! let total: f32 = result.distribution.iter().sum();
//! assert!((total - 1.0).abs() < 1e-5);
//! ```

pub mod config;
pub mod exploration;
pub mod node;
pub mod policy;
pub mod search;
pub mod stats;
pub mod tree;

// Re-export main types
pub use config::MCTSConfig;
pub use exploration::{
    prune_policy_target, ExplorationConfig, ExplorationController, MoveSearch, SearchMode,
};
pub use node::{Edge, MCTSNode, NodeId, NodeKind};
pub use policy::{forced_playout_edge, forced_playout_floor, masked_priors, SelectionPolicy, PUCT};
pub use search::{MCTSSearch, SearchBudget, SearchResult};
pub use stats::SearchStats;
pub use tree::{MCTSTree, TreeStats};
