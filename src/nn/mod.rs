//! Evaluator integration for AlphaZero-style training.
//!
//! ## Overview
//!
//! - **Traits**: `Evaluator`, the policy/value oracle consulted at leaf
//!   expansion, with its input `EncodedState` and output `Evaluation`
//! - **Batching**: `BatchingEvaluator` funnels single-state requests from
//!   many self-play threads into batched calls
//! - **Baseline**: `UniformEvaluator` for testing
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rust_azero::nn::{BatchConfig, BatchingEvaluator, EncodedState, Evaluator, UniformEvaluator};
//!
//! let batched = BatchingEvaluator::spawn(
//!     UniformEvaluator::new(4, 2),
//!     BatchConfig::default().with_batch_size(8).with_timeout(Duration::from_micros(200)),
//! );
//!
//! let evaluation = batched.evaluate_one(&EncodedState::zeros(vec![3])).unwrap();
//! assert_eq!(evaluation.policy, vec![0.25; 4]);
//! assert_eq!(batched.shutdown().requests, 1);
//! ```

pub mod batch;
pub mod traits;

// Re-export main types
pub use batch::{BatchConfig, BatchStats, BatchingEvaluator};
pub use traits::{EncodedState, Evaluation, Evaluator, UniformEvaluator};
