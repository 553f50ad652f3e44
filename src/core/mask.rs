//! Fixed-size legal-action mask over a game's action space.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Bitset of legal action indices in `0..len`.
///
/// Inline storage covers action spaces up to 256 actions without heap
/// allocation.
///
/// ```
/// use rust_azero::core::ActionMask;
///
/// let mask = ActionMask::from_actions(5, [1, 3]);
/// assert!(mask.contains(3));
/// assert!(!mask.contains(0));
/// assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 3]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionMask {
    words: SmallVec<[u64; 4]>,
    len: usize,
}

impl ActionMask {
    /// An all-illegal mask over `len` actions.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: SmallVec::from_elem(0, len.div_ceil(64)),
            len,
        }
    }

    /// A mask with every action legal.
    #[must_use]
    pub fn all(len: usize) -> Self {
        let mut mask = Self::new(len);
        for action in 0..len {
            mask.set(action);
        }
        mask
    }

    #[must_use]
    pub fn from_actions(len: usize, actions: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = Self::new(len);
        for action in actions {
            mask.set(action);
        }
        mask
    }

    /// Mark `action` legal. Out-of-range indices are ignored.
    pub fn set(&mut self, action: usize) {
        if action < self.len {
            self.words[action / 64] |= 1u64 << (action % 64);
        }
    }

    pub fn clear(&mut self, action: usize) {
        if action < self.len {
            self.words[action / 64] &= !(1u64 << (action % 64));
        }
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, action: usize) -> bool {
        action < self.len && self.words[action / 64] & (1u64 << (action % 64)) != 0
    }

    /// Size of the action space the mask covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the action space itself is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of legal actions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// `true` when no action is legal.
    #[must_use]
    pub fn none_legal(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Legal action indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&a| self.contains(a))
    }

    /// Uniform distribution over legal actions, zero elsewhere.
    #[must_use]
    pub fn uniform(&self) -> Vec<f32> {
        let count = self.count();
        let mut probs = vec![0.0; self.len];
        if count == 0 {
            return probs;
        }
        let p = 1.0 / count as f32;
        for action in self.iter() {
            probs[action] = p;
        }
        probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_set_and_clear() {
        let mut mask = ActionMask::new(130);
        assert!(mask.none_legal());
        mask.set(0);
        mask.set(64);
        mask.set(129);
        mask.set(500);
        assert_eq!(mask.count(), 3);
        assert!(mask.contains(129));
        assert!(!mask.contains(500));

        mask.clear(64);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![0, 129]);
    }

    #[test]
    fn test_mask_all() {
        let mask = ActionMask::all(70);
        assert_eq!(mask.count(), 70);
        assert_eq!(mask.len(), 70);
    }

    #[test]
    fn test_mask_uniform() {
        let mask = ActionMask::from_actions(4, [0, 2]);
        assert_eq!(mask.uniform(), vec![0.5, 0.0, 0.5, 0.0]);
        assert_eq!(ActionMask::new(3).uniform(), vec![0.0; 3]);
    }

    #[test]
    fn test_mask_serialization() {
        let mask = ActionMask::from_actions(10, [1, 9]);
        let json = serde_json::to_string(&mask).unwrap();
        let deserialized: ActionMask = serde_json::from_str(&json).unwrap();
        assert_eq!(mask, deserialized);
    }
}
