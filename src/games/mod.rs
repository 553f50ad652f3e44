//! Bundled games.
//!
//! Small rule sets used by the tests, benchmarks and Python bindings:
//!
//! - `countdown`: deterministic N-player subtraction game
//! - `card_reveal`: N-player press-your-luck game with chance draws

pub mod card_reveal;
pub mod countdown;

pub use card_reveal::{CardReveal, CardRevealState};
pub use countdown::{Countdown, CountdownState};
