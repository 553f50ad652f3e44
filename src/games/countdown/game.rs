use serde::{Deserialize, Serialize};

use crate::core::{ActionMask, GameRng, PlayerId};
use crate::game::{Game, GameOutcome, IllegalTransition};
use crate::nn::EncodedState;

/// Countdown position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountdownState {
    pub remaining: u32,
    pub to_move: PlayerId,

    /// Moves made so far.
    pub turns: u32,

    /// Player who made the last move.
    pub last_taker: Option<PlayerId>,
}

/// Countdown rules. Action `a` takes `a + 1` tokens.
#[derive(Clone, Debug)]
pub struct Countdown {
    player_count: usize,
    start: u32,
    max_take: usize,
}

impl Countdown {
    /// # Panics
    ///
    /// Panics if `player_count` or `max_take` is zero.
    pub fn new(player_count: usize, start: u32, max_take: usize) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(max_take > 0, "Players must be able to take a token");
        Self {
            player_count,
            start,
            max_take,
        }
    }

    /// Position with `remaining` tokens and `to_move` on turn.
    pub fn position(&self, remaining: u32, to_move: PlayerId) -> CountdownState {
        CountdownState {
            remaining,
            to_move,
            turns: 0,
            last_taker: None,
        }
    }
}

impl Game for Countdown {
    type State = CountdownState;
    type Key = CountdownState;

    fn player_count(&self) -> usize {
        self.player_count
    }

    fn action_count(&self) -> usize {
        self.max_take
    }

    fn initial_state(&self, _rng: &mut GameRng) -> (CountdownState, PlayerId) {
        let first = PlayerId::new(0);
        (self.position(self.start, first), first)
    }

    fn legal_actions(&self, state: &CountdownState, _player: PlayerId) -> ActionMask {
        let takeable = (state.remaining as usize).min(self.max_take);
        ActionMask::from_actions(self.max_take, 0..takeable)
    }

    fn apply_action(
        &self,
        state: &CountdownState,
        player: PlayerId,
        action: usize,
    ) -> Result<(CountdownState, PlayerId), IllegalTransition> {
        if player != state.to_move {
            return Err(IllegalTransition::new(format!("{player} is not on turn")));
        }
        let take = action as u32 + 1;
        if action >= self.max_take || take > state.remaining {
            return Err(IllegalTransition::new(format!(
                "cannot take {take} of {} tokens",
                state.remaining
            )));
        }

        let next = CountdownState {
            remaining: state.remaining - take,
            to_move: player.next(self.player_count),
            turns: state.turns + 1,
            last_taker: Some(player),
        };
        let to_move = next.to_move;
        Ok((next, to_move))
    }

    fn terminal_value(&self, state: &CountdownState) -> Option<GameOutcome> {
        if state.remaining > 0 {
            return None;
        }
        let score = f64::from(state.turns);
        Some(match state.last_taker {
            Some(winner) => GameOutcome::winner(self.player_count, winner, score),
            None => GameOutcome::uniform(self.player_count, 0.0),
        })
    }

    fn canonical_key(&self, state: &CountdownState) -> CountdownState {
        state.clone()
    }

    /// Remaining fraction of the pile, then a one-hot of the player on turn
    /// relative to `player`.
    fn encode(&self, state: &CountdownState, player: PlayerId) -> EncodedState {
        let n = self.player_count;
        let mut features = vec![0.0; 1 + n];
        features[0] = if self.start == 0 {
            0.0
        } else {
            state.remaining as f32 / self.start as f32
        };
        let offset = (state.to_move.index() + n - player.index() % n) % n;
        features[1 + offset] = 1.0;
        EncodedState::flat(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_actions_shrink_with_pile() {
        let game = Countdown::new(2, 2, 3);
        let mut rng = GameRng::new(0);
        let (state, player) = game.initial_state(&mut rng);

        let legal = game.legal_actions(&state, player);
        assert_eq!(legal.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(legal.len(), 3);
    }

    #[test]
    fn test_turn_order_and_win() {
        let game = Countdown::new(3, 3, 2);
        let mut rng = GameRng::new(0);
        let (state, p0) = game.initial_state(&mut rng);

        let (state, p1) = game.apply_action(&state, p0, 0).unwrap();
        assert_eq!(p1, PlayerId::new(1));
        assert!(game.terminal_value(&state).is_none());

        let (state, p2) = game.apply_action(&state, p1, 1).unwrap();
        assert_eq!(p2, PlayerId::new(2));

        let outcome = game.terminal_value(&state).unwrap();
        assert_eq!(outcome.values.as_slice(), &[0.0, 1.0, 0.0]);
        assert_eq!(outcome.score, 2.0);
    }

    #[test]
    fn test_illegal_transitions() {
        let game = Countdown::new(2, 1, 3);
        let state = game.position(1, PlayerId::new(0));

        assert!(game.apply_action(&state, PlayerId::new(1), 0).is_err());
        assert!(game.apply_action(&state, PlayerId::new(0), 1).is_err());
        assert!(game.apply_action(&state, PlayerId::new(0), 7).is_err());
        assert!(game.apply_action(&state, PlayerId::new(0), 0).is_ok());
    }

    #[test]
    fn test_encode_is_relative() {
        let game = Countdown::new(3, 10, 2);
        let state = game.position(5, PlayerId::new(2));

        let own = game.encode(&state, PlayerId::new(2));
        assert_eq!(own.tensor, vec![0.5, 1.0, 0.0, 0.0]);

        let other = game.encode(&state, PlayerId::new(0));
        assert_eq!(other.tensor, vec![0.5, 0.0, 0.0, 1.0]);
        assert_eq!(other.shape, vec![4]);
    }
}
