//! Countdown: a deterministic N-player subtraction game.
//!
//! - A pile starts with `start` tokens
//! - Players take turns in seat order, removing 1 to `max_take` tokens
//! - Whoever takes the last token wins
//!
//! Small enough to search exhaustively, and works for any number of
//! players, which makes it the reference game for search tests.

mod game;

pub use game::{Countdown, CountdownState};
