//! Error taxonomy.
//!
//! - [`ContractViolation`]: a collaborator broke its contract (illegal
//!   transition, wrongly shaped evaluator output, malformed chance
//!   distribution). Fatal for the episode it occurs in.
//! - [`EvaluatorError`]: the evaluator itself failed or went away.
//! - [`SearchError`] / [`SelfPlayError`]: what search and self-play return.
//! - [`ConfigError`]: configuration could not be loaded or is out of range.
//!
//! Numerical edge cases (zero prior mass, zero visit counts) are not errors;
//! they fall back to uniform distributions. Running out of simulations or
//! time is a normal return path.

use thiserror::Error;

use crate::core::PlayerId;

/// A collaborator violated its contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("game rejected action {action} for {player}: {reason}")]
    IllegalTransition {
        action: usize,
        player: PlayerId,
        reason: String,
    },

    #[error("non-terminal state has no legal actions for {0}")]
    NoLegalActions(PlayerId),

    #[error("evaluator returned {actual} results for a batch of {expected}")]
    BatchSizeMismatch { expected: usize, actual: usize },

    #[error("evaluator policy has {actual} entries, expected {expected}")]
    PolicyShape { expected: usize, actual: usize },

    #[error("evaluator value vector has {actual} entries, expected {expected}")]
    ValueShape { expected: usize, actual: usize },

    #[error("evaluator produced a non-finite {0}")]
    NonFiniteOutput(&'static str),

    #[error("malformed chance distribution: {0}")]
    ChanceDistribution(String),
}

/// Failure reported by an evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluatorError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("evaluation failed: {0}")]
    Failed(String),

    #[error("evaluation queue closed")]
    QueueClosed,
}

/// Failure of a single search.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    Evaluator(EvaluatorError),

    #[error("cannot search from a terminal state")]
    TerminalRoot,

    #[error("cannot search from a chance state; resolve the chance event first")]
    ChanceRoot,

    #[error("no root prepared")]
    NoRoot,
}

impl From<EvaluatorError> for SearchError {
    fn from(err: EvaluatorError) -> Self {
        match err {
            EvaluatorError::Contract(violation) => SearchError::Contract(violation),
            other => SearchError::Evaluator(other),
        }
    }
}

/// Failure of a self-play episode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelfPlayError {
    #[error("episode {seed}: search failed at move {move_number}: {source}")]
    Search {
        seed: u64,
        move_number: usize,
        #[source]
        source: SearchError,
    },

    #[error("episode {seed}: {source}")]
    Contract {
        seed: u64,
        #[source]
        source: ContractViolation,
    },
}

impl SelfPlayError {
    /// `true` when the episode died because a collaborator broke its contract.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            SelfPlayError::Contract { .. }
                | SelfPlayError::Search {
                    source: SearchError::Contract(_),
                    ..
                }
        )
    }
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
