//! The contract between the engine and a game's rules.
//!
//! Search and self-play are generic over [`Game`]: they never look inside a
//! state, only ask the game for legal actions, transitions, terminal values,
//! chance distributions, canonical keys and tensor encodings.

mod traits;

pub use traits::{validate_chance_outcomes, Game, GameOutcome, IllegalTransition};
