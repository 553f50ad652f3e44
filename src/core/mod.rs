//! Core engine types: players, per-player maps, action masks, RNG,
//! configuration.
//!
//! Everything here is game-agnostic. Games describe themselves through the
//! `Game` trait and never extend these types.

pub mod config;
pub mod mask;
pub mod player;
pub mod rng;

pub use config::EngineConfig;
pub use mask::ActionMask;
pub use player::{PlayerId, PlayerMap};
pub use rng::GameRng;
