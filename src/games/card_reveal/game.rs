use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::{ActionMask, GameRng, PlayerId, PlayerMap};
use crate::game::{Game, GameOutcome, IllegalTransition};
use crate::nn::EncodedState;

/// Reveal the next card.
pub const DRAW: usize = 0;

/// Bank the current total and leave the round.
pub const STOP: usize = 1;

/// Card Reveal position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardRevealState {
    /// Cards left per kind; kind `k` is worth `k + 1`.
    pub deck: Vector<u32>,

    /// Running total per seat.
    pub totals: Vector<u32>,

    /// Seat has stopped or busted.
    pub done: Vector<bool>,

    pub busted: Vector<bool>,

    pub to_move: PlayerId,

    /// A draw was chosen and the card is about to be revealed.
    pub revealing: bool,
}

impl CardRevealState {
    #[must_use]
    pub fn cards_left(&self) -> u32 {
        self.deck.iter().sum()
    }
}

/// Card Reveal rules.
#[derive(Clone, Debug)]
pub struct CardReveal {
    player_count: usize,
    deck: Vec<u32>,
    bust_limit: u32,
}

impl CardReveal {
    /// Three copies each of 1 to 5, bust above 10.
    pub fn new(player_count: usize) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        Self {
            player_count,
            deck: vec![3; 5],
            bust_limit: 10,
        }
    }

    /// Copies per card kind; kind `k` is worth `k + 1`.
    pub fn with_deck(mut self, copies: Vec<u32>) -> Self {
        self.deck = copies;
        self
    }

    pub fn with_bust_limit(mut self, limit: u32) -> Self {
        self.bust_limit = limit;
        self
    }

    #[must_use]
    pub fn bust_limit(&self) -> u32 {
        self.bust_limit
    }

    /// Next seat after `from` that is still playing.
    fn next_active(&self, state: &CardRevealState, from: PlayerId) -> Option<PlayerId> {
        let mut seat = from;
        for _ in 0..self.player_count {
            seat = seat.next(self.player_count);
            if !state.done[seat.index()] {
                return Some(seat);
            }
        }
        None
    }

    /// Pass the turn on from `player` who just finished.
    fn pass_turn(&self, state: &mut CardRevealState, player: PlayerId) {
        if let Some(next) = self.next_active(state, player) {
            state.to_move = next;
        }
    }
}

impl Game for CardReveal {
    type State = CardRevealState;
    type Key = CardRevealState;

    fn player_count(&self) -> usize {
        self.player_count
    }

    fn action_count(&self) -> usize {
        2
    }

    fn initial_state(&self, _rng: &mut GameRng) -> (CardRevealState, PlayerId) {
        let first = PlayerId::new(0);
        let state = CardRevealState {
            deck: self.deck.iter().copied().collect(),
            totals: Vector::from(vec![0; self.player_count]),
            done: Vector::from(vec![false; self.player_count]),
            busted: Vector::from(vec![false; self.player_count]),
            to_move: first,
            revealing: false,
        };
        (state, first)
    }

    fn legal_actions(&self, state: &CardRevealState, player: PlayerId) -> ActionMask {
        let mut mask = ActionMask::new(2);
        if state.revealing || player != state.to_move || state.done[player.index()] {
            return mask;
        }
        if state.cards_left() > 0 {
            mask.set(DRAW);
        }
        mask.set(STOP);
        mask
    }

    fn apply_action(
        &self,
        state: &CardRevealState,
        player: PlayerId,
        action: usize,
    ) -> Result<(CardRevealState, PlayerId), IllegalTransition> {
        if !self.legal_actions(state, player).contains(action) {
            return Err(IllegalTransition::new(format!("action {action} is not legal for {player}")));
        }

        let mut next = state.clone();
        if action == DRAW {
            next.revealing = true;
        } else {
            next.done.set(player.index(), true);
            self.pass_turn(&mut next, player);
        }
        let to_move = next.to_move;
        Ok((next, to_move))
    }

    fn terminal_value(&self, state: &CardRevealState) -> Option<GameOutcome> {
        if state.revealing || state.done.iter().any(|d| !d) {
            return None;
        }

        let banked = |seat: usize| if state.busted[seat] { None } else { Some(state.totals[seat]) };
        let best = (0..self.player_count).filter_map(banked).max();
        let Some(best) = best else {
            return Some(GameOutcome::uniform(self.player_count, 0.0));
        };

        let winners = (0..self.player_count).filter(|&s| banked(s) == Some(best)).count();
        let share = 1.0 / winners as f64;
        let values = PlayerMap::new(self.player_count, |p| {
            if banked(p.index()) == Some(best) {
                share
            } else {
                0.0
            }
        });
        Some(GameOutcome::new(values, f64::from(best)))
    }

    fn chance_outcomes(&self, state: &CardRevealState) -> Vec<(usize, f64)> {
        if !state.revealing {
            return Vec::new();
        }
        let total = f64::from(state.cards_left());
        if total == 0.0 {
            return Vec::new();
        }
        state
            .deck
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(kind, &count)| (kind, f64::from(count) / total))
            .collect()
    }

    fn apply_chance(
        &self,
        state: &CardRevealState,
        outcome: usize,
    ) -> Result<(CardRevealState, PlayerId), IllegalTransition> {
        if !state.revealing {
            return Err(IllegalTransition::new("no card is being revealed"));
        }
        let count = state.deck.get(outcome).copied().unwrap_or(0);
        if count == 0 {
            return Err(IllegalTransition::new(format!("no card of kind {outcome} left")));
        }

        let player = state.to_move;
        let seat = player.index();
        let mut next = state.clone();
        next.revealing = false;
        next.deck.set(outcome, count - 1);
        let total = next.totals[seat] + outcome as u32 + 1;
        next.totals.set(seat, total);

        if total > self.bust_limit {
            next.busted.set(seat, true);
            next.done.set(seat, true);
            self.pass_turn(&mut next, player);
        }

        // An empty deck ends the round: everyone still in banks.
        if next.cards_left() == 0 {
            for s in 0..self.player_count {
                next.done.set(s, true);
            }
        }

        let to_move = next.to_move;
        Ok((next, to_move))
    }

    fn canonical_key(&self, state: &CardRevealState) -> CardRevealState {
        state.clone()
    }

    /// Per seat relative to `player`: total over the bust limit, done flag,
    /// busted flag. Then the fraction of each card kind left, and whether a
    /// reveal is pending.
    fn encode(&self, state: &CardRevealState, player: PlayerId) -> EncodedState {
        let n = self.player_count;
        let limit = self.bust_limit.max(1) as f32;
        let mut features = Vec::with_capacity(3 * n + self.deck.len() + 1);

        for k in 0..n {
            let seat = (player.index() + k) % n;
            features.push(state.totals[seat] as f32 / limit);
            features.push(if state.done[seat] { 1.0 } else { 0.0 });
            features.push(if state.busted[seat] { 1.0 } else { 0.0 });
        }
        for (kind, &initial) in self.deck.iter().enumerate() {
            let left = state.deck.get(kind).copied().unwrap_or(0);
            features.push(if initial == 0 { 0.0 } else { left as f32 / initial as f32 });
        }
        features.push(if state.revealing { 1.0 } else { 0.0 });

        EncodedState::flat(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::validate_chance_outcomes;

    fn start(game: &CardReveal) -> (CardRevealState, PlayerId) {
        game.initial_state(&mut GameRng::new(0))
    }

    #[test]
    fn test_draw_creates_chance_state() {
        let game = CardReveal::new(2);
        let (state, p0) = start(&game);

        let (state, player) = game.apply_action(&state, p0, DRAW).unwrap();
        assert_eq!(player, p0);
        assert!(state.revealing);

        let outcomes = game.chance_outcomes(&state);
        assert_eq!(outcomes.len(), 5);
        assert!(validate_chance_outcomes(&outcomes).is_ok());
        assert!(game.legal_actions(&state, p0).none_legal());
    }

    #[test]
    fn test_reveal_adds_to_total() {
        let game = CardReveal::new(2);
        let (state, p0) = start(&game);
        let (state, _) = game.apply_action(&state, p0, DRAW).unwrap();

        let (state, player) = game.apply_chance(&state, 3).unwrap();
        assert_eq!(player, p0);
        assert_eq!(state.totals[0], 4);
        assert_eq!(state.deck[3], 2);
        assert!(!state.revealing);
        assert!(game.chance_outcomes(&state).is_empty());
    }

    #[test]
    fn test_bust_passes_turn() {
        let game = CardReveal::new(2).with_bust_limit(3);
        let (state, p0) = start(&game);
        let (state, _) = game.apply_action(&state, p0, DRAW).unwrap();
        let (state, player) = game.apply_chance(&state, 4).unwrap();

        assert!(state.busted[0]);
        assert_eq!(player, PlayerId::new(1));
    }

    #[test]
    fn test_highest_banked_total_wins() {
        let game = CardReveal::new(2);
        let (state, p0) = start(&game);

        let (state, _) = game.apply_action(&state, p0, DRAW).unwrap();
        let (state, p0) = game.apply_chance(&state, 4).unwrap();
        let (state, p1) = game.apply_action(&state, p0, STOP).unwrap();
        assert_eq!(p1, PlayerId::new(1));
        assert!(game.terminal_value(&state).is_none());

        let (state, _) = game.apply_action(&state, p1, DRAW).unwrap();
        let (state, p1) = game.apply_chance(&state, 1).unwrap();
        let (state, _) = game.apply_action(&state, p1, STOP).unwrap();

        let outcome = game.terminal_value(&state).unwrap();
        assert_eq!(outcome.values.as_slice(), &[1.0, 0.0]);
        assert_eq!(outcome.score, 5.0);
    }

    #[test]
    fn test_tied_winners_share() {
        let game = CardReveal::new(2);
        let (state, p0) = start(&game);
        let (state, p1) = game.apply_action(&state, p0, STOP).unwrap();
        let (state, _) = game.apply_action(&state, p1, STOP).unwrap();

        let outcome = game.terminal_value(&state).unwrap();
        assert_eq!(outcome.values.as_slice(), &[0.5, 0.5]);
    }

    #[test]
    fn test_empty_deck_ends_round() {
        let game = CardReveal::new(2).with_deck(vec![1]);
        let (state, p0) = start(&game);
        let (state, _) = game.apply_action(&state, p0, DRAW).unwrap();
        let (state, _) = game.apply_chance(&state, 0).unwrap();

        let outcome = game.terminal_value(&state).unwrap();
        assert_eq!(outcome.values.as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn test_illegal_moves() {
        let game = CardReveal::new(2);
        let (state, p0) = start(&game);

        assert!(game.apply_action(&state, PlayerId::new(1), DRAW).is_err());
        assert!(game.apply_chance(&state, 0).is_err());

        let (revealing, _) = game.apply_action(&state, p0, DRAW).unwrap();
        assert!(game.apply_action(&revealing, p0, STOP).is_err());
        assert!(game.apply_chance(&revealing, 9).is_err());
    }

    #[test]
    fn test_encode_shape() {
        let game = CardReveal::new(3);
        let (state, p0) = start(&game);
        let encoded = game.encode(&state, p0);
        assert_eq!(encoded.shape, vec![3 * 3 + 5 + 1]);
    }
}
