//! Shared fixtures for integration tests.
//!
//! [`Table`] is a game whose positions are rows of a hand-written table,
//! which makes search results computable by hand.

#![allow(dead_code)]

use rust_azero::core::{ActionMask, GameRng, PlayerId, PlayerMap};
use rust_azero::error::EvaluatorError;
use rust_azero::game::{Game, GameOutcome, IllegalTransition};
use rust_azero::nn::{EncodedState, Evaluation, Evaluator};

/// One position of a [`Table`] game.
#[derive(Clone, Debug)]
pub enum Spot {
    /// `player` picks one of `(action, next spot)`.
    Decision {
        player: u8,
        moves: Vec<(usize, usize)>,
    },

    /// Nature picks `(outcome, probability, next spot)`.
    Chance { outcomes: Vec<(usize, f64, usize)> },

    /// Game over with these values (absolute seats) and score.
    Terminal { values: Vec<f64>, score: f64 },
}

/// Game played over a fixed table of spots, starting at spot 0.
///
/// States and canonical keys are spot indices, so two chance outcomes that
/// lead to the same spot share a child in the search tree.
#[derive(Clone, Debug)]
pub struct Table {
    pub players: usize,
    pub actions: usize,
    pub spots: Vec<Spot>,
}

impl Table {
    pub fn new(players: usize, actions: usize, spots: Vec<Spot>) -> Self {
        Self {
            players,
            actions,
            spots,
        }
    }

    fn mover(&self, spot: usize) -> PlayerId {
        match &self.spots[spot] {
            Spot::Decision { player, .. } => PlayerId::new(*player),
            _ => PlayerId::new(0),
        }
    }
}

impl Game for Table {
    type State = usize;
    type Key = usize;

    fn player_count(&self) -> usize {
        self.players
    }

    fn action_count(&self) -> usize {
        self.actions
    }

    fn initial_state(&self, _rng: &mut GameRng) -> (usize, PlayerId) {
        (0, self.mover(0))
    }

    fn legal_actions(&self, state: &usize, _player: PlayerId) -> ActionMask {
        match &self.spots[*state] {
            Spot::Decision { moves, .. } => {
                ActionMask::from_actions(self.actions, moves.iter().map(|&(a, _)| a))
            }
            _ => ActionMask::new(self.actions),
        }
    }

    fn apply_action(
        &self,
        state: &usize,
        _player: PlayerId,
        action: usize,
    ) -> Result<(usize, PlayerId), IllegalTransition> {
        match &self.spots[*state] {
            Spot::Decision { moves, .. } => moves
                .iter()
                .find(|&&(a, _)| a == action)
                .map(|&(_, next)| (next, self.mover(next)))
                .ok_or_else(|| IllegalTransition::new(format!("action {action} not listed"))),
            _ => Err(IllegalTransition::new("not a decision spot")),
        }
    }

    fn terminal_value(&self, state: &usize) -> Option<GameOutcome> {
        match &self.spots[*state] {
            Spot::Terminal { values, score } => {
                Some(GameOutcome::new(PlayerMap::from_vec(values.clone()), *score))
            }
            _ => None,
        }
    }

    fn chance_outcomes(&self, state: &usize) -> Vec<(usize, f64)> {
        match &self.spots[*state] {
            Spot::Chance { outcomes } => outcomes.iter().map(|&(o, p, _)| (o, p)).collect(),
            _ => Vec::new(),
        }
    }

    fn apply_chance(&self, state: &usize, outcome: usize) -> Result<(usize, PlayerId), IllegalTransition> {
        match &self.spots[*state] {
            Spot::Chance { outcomes } => outcomes
                .iter()
                .find(|&&(o, _, _)| o == outcome)
                .map(|&(_, _, next)| (next, self.mover(next)))
                .ok_or_else(|| IllegalTransition::new(format!("outcome {outcome} not listed"))),
            _ => Err(IllegalTransition::new("not a chance spot")),
        }
    }

    fn canonical_key(&self, state: &usize) -> usize {
        *state
    }

    fn encode(&self, state: &usize, _player: PlayerId) -> EncodedState {
        EncodedState::flat(vec![*state as f32])
    }
}

/// Same prior and perspective-frame values for every state.
#[derive(Clone, Debug)]
pub struct Fixed {
    pub policy: Vec<f32>,
    pub values: Vec<f32>,
}

impl Fixed {
    pub fn new(policy: Vec<f32>, values: Vec<f32>) -> Self {
        Self { policy, values }
    }
}

impl Evaluator for Fixed {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
        Ok(batch
            .iter()
            .map(|_| Evaluation::new(self.policy.clone(), self.values.clone(), 0.0))
            .collect())
    }
}

/// Three players move once each, in seat order, then the game ends with
/// `payoff`.
pub fn cyclic_line(payoff: [f64; 3]) -> Table {
    Table::new(
        3,
        2,
        vec![
            Spot::Decision {
                player: 0,
                moves: vec![(0, 1)],
            },
            Spot::Decision {
                player: 1,
                moves: vec![(1, 2)],
            },
            Spot::Decision {
                player: 2,
                moves: vec![(0, 3)],
            },
            Spot::Terminal {
                values: payoff.to_vec(),
                score: 1.0,
            },
        ],
    )
}

/// One move into a coin flip: outcome 0 with `p`, outcome 1 otherwise,
/// each ending the game.
pub fn single_flip(p: f64) -> Table {
    Table::new(
        1,
        1,
        vec![
            Spot::Decision {
                player: 0,
                moves: vec![(0, 1)],
            },
            Spot::Chance {
                outcomes: vec![(0, p, 2), (1, 1.0 - p, 3)],
            },
            Spot::Terminal {
                values: vec![1.0],
                score: 0.0,
            },
            Spot::Terminal {
                values: vec![0.0],
                score: 0.0,
            },
        ],
    )
}

/// Single player, four actions with fixed payoffs.
pub fn four_arms(payoffs: [f64; 4]) -> Table {
    let mut spots = vec![Spot::Decision {
        player: 0,
        moves: (0..4).map(|a| (a, a + 1)).collect(),
    }];
    spots.extend(payoffs.iter().map(|&v| Spot::Terminal {
        values: vec![v],
        score: v,
    }));
    Table::new(1, 4, spots)
}

/// Three seats, two actions each, eight terminals.
///
/// Seat 0 picks spot 1 or 2, seat 1 then picks one of two seat-2 spots,
/// and seat 2 picks a leaf. Leaf `i` (spot `7 + i`) pays `payoffs[i]`.
pub fn three_seat_tree(payoffs: [[f64; 3]; 8]) -> Table {
    let mut spots = vec![
        Spot::Decision {
            player: 0,
            moves: vec![(0, 1), (1, 2)],
        },
        Spot::Decision {
            player: 1,
            moves: vec![(0, 3), (1, 4)],
        },
        Spot::Decision {
            player: 1,
            moves: vec![(0, 5), (1, 6)],
        },
    ];
    spots.extend((0..4).map(|i| Spot::Decision {
        player: 2,
        moves: vec![(0, 7 + 2 * i), (1, 8 + 2 * i)],
    }));
    spots.extend(payoffs.iter().map(|values| Spot::Terminal {
        values: values.to_vec(),
        score: 0.0,
    }));
    Table::new(3, 2, spots)
}
