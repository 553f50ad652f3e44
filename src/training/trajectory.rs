//! Episode traces and the training examples derived from them.
//!
//! A trajectory records one self-play game:
//! - Encoded states at each decision point
//! - How each move was searched, and the policy target when there is one
//! - Actions actually taken
//! - Final outcome (or the engine's estimate of it for truncated games)

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::{GameRng, PlayerId};
use crate::game::GameOutcome;
use crate::mcts::SearchMode;
use crate::nn::EncodedState;

/// A single decision in a trajectory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Encoded game state from the acting player's perspective.
    pub encoded_state: EncodedState,

    pub player: PlayerId,

    pub mode: SearchMode,

    /// Pruned visit distribution over the full action space. Only full
    /// searches produce one.
    pub policy_target: Option<Vec<f32>>,

    /// Visit distribution the move was picked from.
    pub distribution: Vec<f32>,

    /// The action that was actually taken.
    pub action: usize,

    /// Move number in the game (0-indexed).
    pub move_number: usize,
}

impl Step {
    /// Probability the search assigned to the taken action.
    #[must_use]
    pub fn taken_action_prob(&self) -> f32 {
        self.distribution.get(self.action).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.mode == SearchMode::Full
    }
}

/// A complete game trajectory from self-play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub steps: Vec<Step>,

    /// Final outcome. For truncated games this is the last root estimate.
    pub outcome: GameOutcome,

    /// The game hit a move or time limit before reaching a terminal state.
    pub truncated: bool,

    pub game_length: usize,

    /// Random seed used for this game.
    pub seed: u64,
}

impl Trajectory {
    pub fn new(seed: u64, player_count: usize) -> Self {
        Self {
            steps: Vec::new(),
            outcome: GameOutcome::uniform(player_count, 0.0),
            truncated: false,
            game_length: 0,
            seed,
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
        self.game_length += 1;
    }

    pub fn set_outcome(&mut self, outcome: GameOutcome) {
        self.outcome = outcome;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn player_steps(&self, player: PlayerId) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(move |s| s.player == player)
    }

    #[must_use]
    pub fn player_outcome(&self, player: PlayerId) -> f64 {
        self.outcome.values[player]
    }

    /// Number of fully searched moves, i.e. the number of training examples.
    #[must_use]
    pub fn full_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_full()).count()
    }

    /// Convert to training examples.
    ///
    /// Fast-searched moves are dropped. Each remaining move yields its
    /// policy target, the outcome rotated so slot 0 is the acting player,
    /// and the outcome score.
    pub fn to_training_examples(&self) -> Vec<TrainingExample> {
        let score = self.outcome.score as f32;
        self.steps
            .iter()
            .filter_map(|step| {
                let policy = step.policy_target.as_ref()?;
                if !step.is_full() {
                    return None;
                }
                Some(TrainingExample {
                    state: step.encoded_state.clone(),
                    policy: policy.clone(),
                    value: self
                        .outcome
                        .values
                        .to_perspective(step.player)
                        .into_iter()
                        .map(|v| v as f32)
                        .collect(),
                    score,
                    player: step.player,
                })
            })
            .collect()
    }
}

/// One supervised example for the policy/value network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub state: EncodedState,

    /// Policy target over the full action space, zero on illegal actions.
    pub policy: Vec<f32>,

    /// Outcome per seat, slot 0 being the acting player.
    pub value: Vec<f32>,

    pub score: f32,

    pub player: PlayerId,
}

/// Serialize a batch of examples for an external training loop.
pub fn encode_examples(examples: &[TrainingExample]) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(examples)
}

/// Inverse of [`encode_examples`].
pub fn decode_examples(bytes: &[u8]) -> Result<Vec<TrainingExample>, bincode::Error> {
    bincode::deserialize(bytes)
}

/// Buffer for storing trajectories during training.
///
/// FIFO: when full, the oldest trajectory is removed.
#[derive(Clone, Debug)]
pub struct ExperienceBuffer {
    trajectories: VecDeque<Trajectory>,
    max_trajectories: usize,
}

impl ExperienceBuffer {
    pub fn new(max_trajectories: usize) -> Self {
        Self {
            trajectories: VecDeque::with_capacity(max_trajectories),
            max_trajectories,
        }
    }

    pub fn push(&mut self, trajectory: Trajectory) {
        if self.max_trajectories == 0 {
            return;
        }
        if self.trajectories.len() >= self.max_trajectories {
            self.trajectories.pop_front();
        }
        self.trajectories.push_back(trajectory);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_trajectories
    }

    pub fn clear(&mut self) {
        self.trajectories.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.iter()
    }

    /// Total number of steps across all trajectories.
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.trajectories.iter().map(Trajectory::len).sum()
    }

    pub fn to_training_examples(&self) -> Vec<TrainingExample> {
        self.trajectories
            .iter()
            .flat_map(Trajectory::to_training_examples)
            .collect()
    }

    /// Sample up to `batch_size` distinct examples, reproducibly for a seed.
    pub fn sample_batch(&self, batch_size: usize, seed: u64) -> Vec<TrainingExample> {
        let mut all = self.to_training_examples();
        if all.is_empty() || batch_size == 0 {
            return vec![];
        }

        let mut rng = GameRng::new(seed);

        // Partial Fisher-Yates over the first `batch_size` slots
        let n = all.len();
        let limit = batch_size.min(n);
        for i in 0..limit {
            let j = i + rng.gen_range_usize(0..n - i);
            all.swap(i, j);
        }
        all.truncate(limit);
        all
    }
}

impl Default for ExperienceBuffer {
    fn default() -> Self {
        Self::new(10000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerMap;

    fn make_step(player: u8, move_number: usize, mode: SearchMode) -> Step {
        let target = match mode {
            SearchMode::Full => Some(vec![0.75, 0.25, 0.0]),
            SearchMode::Fast => None,
        };
        Step {
            encoded_state: EncodedState::zeros(vec![4]),
            player: PlayerId::new(player),
            mode,
            policy_target: target,
            distribution: vec![0.6, 0.4, 0.0],
            action: 0,
            move_number,
        }
    }

    fn three_player_outcome() -> GameOutcome {
        GameOutcome::new(PlayerMap::from_vec(vec![0.2, 0.3, 0.5]), 7.0)
    }

    #[test]
    fn test_trajectory_creation() {
        let mut traj = Trajectory::new(42, 2);
        assert!(traj.is_empty());
        assert!(!traj.truncated);

        traj.push(make_step(0, 0, SearchMode::Full));
        traj.push(make_step(1, 1, SearchMode::Fast));

        assert_eq!(traj.len(), 2);
        assert_eq!(traj.game_length, 2);
        assert_eq!(traj.full_steps(), 1);
    }

    #[test]
    fn test_taken_action_prob() {
        let mut step = make_step(0, 0, SearchMode::Full);
        assert!((step.taken_action_prob() - 0.6).abs() < 1e-6);

        step.action = 9;
        assert_eq!(step.taken_action_prob(), 0.0);
    }

    #[test]
    fn test_fast_steps_are_dropped() {
        let mut traj = Trajectory::new(42, 2);
        traj.push(make_step(0, 0, SearchMode::Fast));
        traj.push(make_step(1, 1, SearchMode::Full));
        traj.push(make_step(0, 2, SearchMode::Fast));
        traj.set_outcome(GameOutcome::winner(2, PlayerId::new(1), 3.0));

        let examples = traj.to_training_examples();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].player, PlayerId::new(1));
        assert_eq!(examples[0].policy, vec![0.75, 0.25, 0.0]);
    }

    #[test]
    fn test_values_rotate_to_acting_player() {
        let mut traj = Trajectory::new(1, 3);
        for i in 0..3 {
            traj.push(make_step(i, i as usize, SearchMode::Full));
        }
        traj.set_outcome(three_player_outcome());

        let examples = traj.to_training_examples();
        assert_eq!(examples[0].value, vec![0.2, 0.3, 0.5]);
        assert_eq!(examples[1].value, vec![0.3, 0.5, 0.2]);
        assert_eq!(examples[2].value, vec![0.5, 0.2, 0.3]);
        assert!(examples.iter().all(|e| e.score == 7.0));
    }

    #[test]
    fn test_player_steps_four_player() {
        let mut traj = Trajectory::new(42, 4);
        for i in 0..8 {
            traj.push(make_step((i % 4) as u8, i, SearchMode::Full));
        }
        for p in 0..4 {
            assert_eq!(traj.player_steps(PlayerId::new(p)).count(), 2);
        }
    }

    #[test]
    fn test_trajectory_serialization() {
        let mut traj = Trajectory::new(42, 3);
        traj.push(make_step(0, 0, SearchMode::Full));
        traj.set_outcome(three_player_outcome());
        traj.truncated = true;

        let json = serde_json::to_string(&traj).unwrap();
        let back: Trajectory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, traj);
        assert_eq!(back.player_outcome(PlayerId::new(2)), 0.5);
    }

    #[test]
    fn test_bincode_examples() {
        let mut traj = Trajectory::new(42, 3);
        traj.push(make_step(2, 0, SearchMode::Full));
        traj.set_outcome(three_player_outcome());
        let examples = traj.to_training_examples();

        let bytes = encode_examples(&examples).unwrap();
        assert_eq!(decode_examples(&bytes).unwrap(), examples);
        assert!(decode_examples(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_experience_buffer_fifo_order() {
        let mut buffer = ExperienceBuffer::new(3);
        for seed in 1..=5 {
            buffer.push(Trajectory::new(seed, 2));
        }

        let seeds: Vec<_> = buffer.iter().map(|t| t.seed).collect();
        assert_eq!(seeds, vec![3, 4, 5]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_experience_buffer_totals() {
        let mut buffer = ExperienceBuffer::new(10);

        let mut traj1 = Trajectory::new(1, 2);
        traj1.push(make_step(0, 0, SearchMode::Full));
        traj1.push(make_step(1, 1, SearchMode::Fast));

        let mut traj2 = Trajectory::new(2, 2);
        traj2.push(make_step(0, 0, SearchMode::Full));

        buffer.push(traj1);
        buffer.push(traj2);

        assert_eq!(buffer.total_steps(), 3);
        assert_eq!(buffer.to_training_examples().len(), 2);
    }

    #[test]
    fn test_experience_buffer_sample_batch() {
        let mut buffer = ExperienceBuffer::new(10);
        let mut traj = Trajectory::new(42, 2);
        for i in 0..10 {
            traj.push(make_step((i % 2) as u8, i, SearchMode::Full));
        }
        buffer.push(traj);

        assert_eq!(buffer.sample_batch(5, 123).len(), 5);
        assert_eq!(buffer.sample_batch(100, 123).len(), 10);
        assert!(buffer.sample_batch(0, 123).is_empty());

        // Same seed, same batch
        assert_eq!(buffer.sample_batch(5, 7), buffer.sample_batch(5, 7));
    }

    #[test]
    fn test_experience_buffer_empty_operations() {
        let mut buffer = ExperienceBuffer::default();
        assert_eq!(buffer.capacity(), 10000);
        assert!(buffer.is_empty());
        assert!(buffer.sample_batch(10, 42).is_empty());

        buffer.push(Trajectory::new(1, 2));
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
