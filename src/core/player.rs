//! Player identification and per-player value storage.
//!
//! ## PlayerId
//!
//! Seat index in a game with 1-255 players.
//!
//! ## PlayerMap
//!
//! One entry per seat, indexed by `PlayerId`. Search backs up value vectors
//! as `PlayerMap<f64>` in the absolute seat frame; evaluators and training
//! targets use the perspective frame where slot 0 is the player to move.
//! `to_perspective` / `from_perspective` convert between the two.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Seat identifier. Seats are 0-based: the first player is `PlayerId(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Raw seat index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The seat that moves after this one in cyclic turn order.
    ///
    /// ```
    /// use rust_azero::core::PlayerId;
    ///
    /// assert_eq!(PlayerId::new(2).next(3), PlayerId::new(0));
    /// ```
    #[must_use]
    pub fn next(self, player_count: usize) -> Self {
        Self(((self.index() + 1) % player_count) as u8)
    }

    /// Iterate over all seats of a `player_count`-player game.
    pub fn all(player_count: usize) -> impl Iterator<Item = PlayerId> {
        (0..player_count as u8).map(PlayerId)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// Per-seat storage backed by a `Vec<T>`.
///
/// ```
/// use rust_azero::core::{PlayerId, PlayerMap};
///
/// let mut totals: PlayerMap<f64> = PlayerMap::with_value(3, 0.0);
/// totals[PlayerId::new(1)] += 0.5;
/// assert_eq!(totals[PlayerId::new(1)], 0.5);
///
/// // Slot 0 of the perspective frame is the player to move.
/// let relative = totals.to_perspective(PlayerId::new(1));
/// assert_eq!(relative, vec![0.5, 0.0, 0.0]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: Vec<T>,
}

impl<T> PlayerMap<T> {
    /// Create a map with values from a factory function.
    pub fn new(player_count: usize, factory: impl Fn(PlayerId) -> T) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(player_count <= 255, "At most 255 players supported");

        let data = (0..player_count as u8).map(|i| factory(PlayerId(i))).collect();
        Self { data }
    }

    /// Create a map with every seat set to `value`.
    pub fn with_value(player_count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(player_count, |_| value.clone())
    }

    pub fn with_default(player_count: usize) -> Self
    where
        T: Default,
    {
        Self::new(player_count, |_| T::default())
    }

    /// Wrap a vector already laid out in seat order.
    pub fn from_vec(data: Vec<T>) -> Self {
        assert!(!data.is_empty(), "Must have at least 1 player");
        assert!(data.len() <= 255, "At most 255 players supported");
        Self { data }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn get(&self, player: PlayerId) -> &T {
        &self.data[player.index()]
    }

    pub fn get_mut(&mut self, player: PlayerId) -> &mut T {
        &mut self.data[player.index()]
    }

    /// Values in seat order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterate over (PlayerId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (PlayerId(i as u8), v))
    }

    /// Iterate over (PlayerId, &mut T) pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut T)> {
        self.data.iter_mut().enumerate().map(|(i, v)| (PlayerId(i as u8), v))
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.data.len() as u8).map(PlayerId)
    }

    /// Rotate into the perspective frame of `player`: slot `k` holds the
    /// value of the seat `k` places after `player` in turn order.
    #[must_use]
    pub fn to_perspective(&self, player: PlayerId) -> Vec<T>
    where
        T: Clone,
    {
        let n = self.data.len();
        (0..n)
            .map(|k| self.data[(player.index() + k) % n].clone())
            .collect()
    }

    /// Inverse of [`PlayerMap::to_perspective`].
    pub fn from_perspective(values: &[T], player: PlayerId) -> Self
    where
        T: Clone,
    {
        let n = values.len();
        Self::new(n, |seat| {
            values[(seat.index() + n - player.index() % n) % n].clone()
        })
    }
}

impl PlayerMap<f64> {
    /// Element-wise `self += other`.
    pub fn accumulate(&mut self, other: &PlayerMap<f64>) {
        for (total, value) in self.data.iter_mut().zip(other.data.iter()) {
            *total += value;
        }
    }

    /// Element-wise division, used to turn totals into means.
    #[must_use]
    pub fn scaled(&self, divisor: f64) -> PlayerMap<f64> {
        PlayerMap {
            data: self.data.iter().map(|v| v / divisor).collect(),
        }
    }

    /// The unique seat with the highest value, if any.
    #[must_use]
    pub fn unique_max(&self) -> Option<PlayerId> {
        let best = self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut leaders = self.iter().filter(|(_, v)| **v == best);
        match (leaders.next(), leaders.next()) {
            (Some((player, _)), None) => Some(player),
            _ => None,
        }
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        self.get(player)
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        self.get_mut(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_basics() {
        let p0 = PlayerId::new(0);
        assert_eq!(p0.index(), 0);
        assert_eq!(format!("{}", p0), "Player 0");
        assert_eq!(p0.next(2), PlayerId::new(1));
        assert_eq!(PlayerId::new(1).next(2), PlayerId::new(0));
    }

    #[test]
    fn test_player_id_all() {
        let players: Vec<_> = PlayerId::all(4).collect();
        assert_eq!(players.len(), 4);
        assert_eq!(players[3], PlayerId::new(3));
    }

    #[test]
    fn test_player_map_new() {
        let map: PlayerMap<i32> = PlayerMap::new(3, |p| p.index() as i32 * 10);
        assert_eq!(map.as_slice(), &[0, 10, 20]);
    }

    #[test]
    fn test_player_map_mutation() {
        let mut map: PlayerMap<i32> = PlayerMap::with_value(2, 0);
        map[PlayerId::new(1)] = 20;
        assert_eq!(map[PlayerId::new(1)], 20);
        assert_eq!(map.player_count(), 2);
    }

    #[test]
    fn test_perspective_roundtrip() {
        let map = PlayerMap::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        for seat in PlayerId::all(4) {
            let relative = map.to_perspective(seat);
            assert_eq!(relative[0], map[seat]);
            assert_eq!(PlayerMap::from_perspective(&relative, seat), map);
        }
        assert_eq!(map.to_perspective(PlayerId::new(2)), vec![3.0, 4.0, 1.0, 2.0]);
    }

    #[test]
    fn test_accumulate_and_scale() {
        let mut total = PlayerMap::with_value(3, 0.0);
        total.accumulate(&PlayerMap::from_vec(vec![1.0, -1.0, 0.5]));
        total.accumulate(&PlayerMap::from_vec(vec![1.0, 1.0, 0.5]));
        assert_eq!(total.as_slice(), &[2.0, 0.0, 1.0]);
        assert_eq!(total.scaled(2.0).as_slice(), &[1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_unique_max() {
        let map = PlayerMap::from_vec(vec![0.0, 1.0, 0.5]);
        assert_eq!(map.unique_max(), Some(PlayerId::new(1)));

        let tied = PlayerMap::from_vec(vec![1.0, 1.0, 0.5]);
        assert_eq!(tied.unique_max(), None);
    }

    #[test]
    fn test_player_map_serialization() {
        let map: PlayerMap<f64> = PlayerMap::new(2, |p| p.index() as f64 + 0.5);
        let json = serde_json::to_string(&map).unwrap();
        let deserialized: PlayerMap<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, deserialized);
    }

    #[test]
    #[should_panic(expected = "Must have at least 1 player")]
    fn test_player_map_zero_players() {
        let _: PlayerMap<i32> = PlayerMap::with_value(0, 0);
    }
}
