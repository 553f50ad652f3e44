//! Edge selection at decision nodes.
//!
//! - `SelectionPolicy`: how to choose which child to explore (PUCT)
//! - forced playouts: the minimum-visit rule applied at the root in
//!   full-mode searches
//! - prior masking: restricting evaluator priors to legal actions

use crate::core::ActionMask;

use super::config::MCTSConfig;
use super::node::MCTSNode;

/// Legal mass below this is treated as underflow.
const MIN_PRIOR_MASS: f64 = 1e-12;

/// Restrict `policy` to the legal actions and renormalize.
///
/// Returns `(action, prior)` pairs in ascending action order, and whether
/// the uniform fallback was used (legal mass vanished or was not finite).
/// Negative and non-finite entries count as zero.
#[must_use]
pub fn masked_priors(policy: &[f32], legal: &ActionMask) -> (Vec<(usize, f32)>, bool) {
    let weight = |action: usize| {
        let p = f64::from(policy.get(action).copied().unwrap_or(0.0));
        if p.is_finite() && p > 0.0 {
            p
        } else {
            0.0
        }
    };

    let mass: f64 = legal.iter().map(weight).sum();
    if !mass.is_finite() || mass <= MIN_PRIOR_MASS {
        let count = legal.count().max(1) as f64;
        let uniform = (1.0 / count) as f32;
        return (legal.iter().map(|a| (a, uniform)).collect(), true);
    }

    let priors = legal
        .iter()
        .map(|a| (a, (weight(a) / mass) as f32))
        .collect();
    (priors, false)
}

/// Policy for selecting which edge of an expanded decision node to follow.
pub trait SelectionPolicy: Send + Sync {
    /// Index of the edge to follow. `node` has at least one edge.
    fn select(&self, node: &MCTSNode, config: &MCTSConfig) -> usize;
}

/// PUCT selection policy (Predictor + UCB for Trees).
///
/// Formula: Q(a) + c * P(a) * sqrt(N) / (1 + n(a)), with `Q` the mean value
/// of the node's player to move. Unvisited edges use `fpu_value` for `Q`.
/// Ties go to the lowest edge index.
#[derive(Clone, Debug, Default)]
pub struct PUCT;

impl SelectionPolicy for PUCT {
    fn select(&self, node: &MCTSNode, config: &MCTSConfig) -> usize {
        let sqrt_parent = parent_sqrt(node.visits);
        let player = node.to_move;

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (i, edge) in node.edges.iter().enumerate() {
            let q = edge.q_value(player, config.fpu_value);
            let score = puct_score(q, edge.prior, sqrt_parent, edge.visits, config.c_puct);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        best
    }
}

/// `sqrt(N)` with `N` floored at one, so the prior drives the very first
/// selection at a fresh node.
#[inline]
pub(crate) fn parent_sqrt(parent_visits: u32) -> f64 {
    f64::from(parent_visits.max(1)).sqrt()
}

#[inline]
pub(crate) fn puct_score(q: f64, prior: f32, sqrt_parent: f64, visits: u32, c_puct: f64) -> f64 {
    q + c_puct * f64::from(prior) * sqrt_parent / (1.0 + f64::from(visits))
}

/// Minimum visits an edge with prior `prior` should have once its parent
/// has `parent_visits` visits: `floor(k * sqrt(prior * parent_visits))`.
#[must_use]
pub fn forced_playout_floor(prior: f32, parent_visits: u32, k: f64) -> u32 {
    if prior <= 0.0 || k <= 0.0 {
        return 0;
    }
    (k * (f64::from(prior) * f64::from(parent_visits)).sqrt()).floor() as u32
}

/// Edge that must be forced on the next simulation, if any.
///
/// Measured against the visit count the node will have after this
/// simulation. The edge furthest below its floor wins; ties go to the
/// lowest index.
#[must_use]
pub fn forced_playout_edge(node: &MCTSNode, k: f64) -> Option<usize> {
    let upcoming = node.visits.saturating_add(1);
    let mut best: Option<(usize, u32)> = None;
    for (i, edge) in node.edges.iter().enumerate() {
        let floor = forced_playout_floor(edge.prior, upcoming, k);
        let deficit = floor.saturating_sub(edge.visits);
        if deficit > 0 && best.map_or(true, |(_, d)| deficit > d) {
            best = Some((i, deficit));
        }
    }
    best.map(|(i, _)| i)
}
