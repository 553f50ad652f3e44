//! Evaluator interface: the policy/value oracle consulted at leaf expansion.
//!
//! Implementations are typically neural networks living elsewhere (Python
//! via the `python` feature, or any Rust inference backend). Evaluators are
//! shared by every self-play worker, so they must be `Send + Sync`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ContractViolation, EvaluatorError};

/// Encoded game state as a flat tensor for neural network input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodedState {
    /// Flattened tensor data (row-major order).
    pub tensor: Vec<f32>,

    /// Shape of the tensor (e.g., [channels, height, width] or [features]).
    pub shape: Vec<usize>,
}

impl EncodedState {
    pub fn new(tensor: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(
            tensor.len(),
            shape.iter().product::<usize>(),
            "Tensor length must match shape product"
        );
        Self { tensor, shape }
    }

    /// Flat feature vector.
    pub fn flat(tensor: Vec<f32>) -> Self {
        let len = tensor.len();
        Self::new(tensor, vec![len])
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        Self {
            tensor: vec![0.0; size],
            shape,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }
}

/// Output of the evaluator for one state.
///
/// `values` is in the perspective frame of the player to move at the
/// evaluated state: slot 0 is that player, slot `k` the player `k` seats
/// later in turn order. Search rotates it back to absolute seats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Prior over the full action space. Illegal entries are masked out by
    /// the search, so they need not be zero.
    pub policy: Vec<f32>,

    /// One value per player, perspective frame.
    pub values: Vec<f32>,

    /// Scalar score estimate.
    pub score: f32,
}

impl Evaluation {
    pub fn new(policy: Vec<f32>, values: Vec<f32>, score: f32) -> Self {
        Self {
            policy,
            values,
            score,
        }
    }

    /// Build from log-probabilities, as emitted by a `log_softmax` head.
    ///
    /// Masked entries (very negative or `-inf`) become zero.
    pub fn from_log_policy(log_policy: &[f32], values: Vec<f32>, score: f32) -> Self {
        let policy = log_policy
            .iter()
            .map(|&lp| if lp.is_nan() { 0.0 } else { lp.exp() })
            .collect();
        Self::new(policy, values, score)
    }

    /// Check output shapes and finiteness.
    pub fn validate(&self, action_count: usize, player_count: usize) -> Result<(), ContractViolation> {
        if self.policy.len() != action_count {
            return Err(ContractViolation::PolicyShape {
                expected: action_count,
                actual: self.policy.len(),
            });
        }
        if self.values.len() != player_count {
            return Err(ContractViolation::ValueShape {
                expected: player_count,
                actual: self.values.len(),
            });
        }
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(ContractViolation::NonFiniteOutput("value"));
        }
        if !self.score.is_finite() {
            return Err(ContractViolation::NonFiniteOutput("score"));
        }
        Ok(())
    }
}

/// Policy/value oracle.
///
/// Given a batch of encoded states, returns one [`Evaluation`] per state,
/// in order.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError>;

    /// Evaluate a single state.
    fn evaluate_one(&self, state: &EncodedState) -> Result<Evaluation, EvaluatorError> {
        let mut results = self.evaluate(std::slice::from_ref(state))?;
        if results.len() != 1 {
            return Err(ContractViolation::BatchSizeMismatch {
                expected: 1,
                actual: results.len(),
            }
            .into());
        }
        Ok(results.swap_remove(0))
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
        (**self).evaluate(batch)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
        (**self).evaluate(batch)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
        (**self).evaluate(batch)
    }
}

/// Uniform policy and zero values (baseline for testing).
#[derive(Clone, Debug, Default)]
pub struct UniformEvaluator {
    action_count: usize,
    player_count: usize,
}

impl UniformEvaluator {
    pub fn new(action_count: usize, player_count: usize) -> Self {
        Self {
            action_count,
            player_count,
        }
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
        let prob = if self.action_count == 0 {
            0.0
        } else {
            1.0 / self.action_count as f32
        };
        Ok(batch
            .iter()
            .map(|_| {
                Evaluation::new(
                    vec![prob; self.action_count],
                    vec![0.0; self.player_count],
                    0.0,
                )
            })
            .collect())
    }
}
