//! Card Reveal: an N-player press-your-luck game with hidden draws.
//!
//! - A shared face-down deck holds cards of values 1, 2, 3, ...
//! - On your turn you either draw (the top card is revealed at random) or
//!   stop and bank your total
//! - Going over the bust limit knocks you out
//! - Once everyone has stopped or busted, the highest banked total wins
//!
//! Every draw is a chance event, so this game exercises chance nodes in
//! search and chance resolution in self-play. The deck and per-seat
//! tallies are `im` vectors, so cloning a state is cheap.

mod game;

pub use game::{CardReveal, CardRevealState, DRAW, STOP};
