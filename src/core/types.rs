//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a game (one campaign, independent of all others)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display(fmt = "game-{}", _0)]
pub struct GameId(pub Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for entities (characters, cities, villains, projects...)
///
/// Ids are handed out sequentially by the world, so ascending id order is
/// the stable order used when a selector matches several entities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "entity-{}", _0)]
pub struct EntityId(pub u32);

/// Unique identifier for stories
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "story-{}", _0)]
pub struct StoryId(pub u32);

/// Identifier assigned to an effect when it enters a resolution chain
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "effect-{}", _0)]
pub struct EffectId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "encounter-{}", _0)]
pub struct EncounterId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "entry-{}", _0)]
pub struct QueueEntryId(pub u64);

/// Tableau card identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "card-{}", _0)]
pub struct CardId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[display(fmt = "resolution-{}", _0)]
pub struct ResolutionId(pub u64);

/// Axial hex coordinate (q, r system)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct HexCoord {
    pub q: i32, // Column
    pub r: i32, // Row
}

impl HexCoord {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Cube coordinate S (derived from q and r)
    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Distance in hex steps using axial coordinate formula
    pub fn distance(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Get all 6 adjacent hexes
    pub fn neighbors(&self) -> [HexCoord; 6] {
        HexDirection::all().map(|d| self.step(d, 1))
    }

    /// Move `steps` hexes in a straight line
    pub fn step(&self, direction: HexDirection, steps: i32) -> HexCoord {
        let offset = direction.offset();
        HexCoord::new(self.q + offset.q * steps, self.r + offset.r * steps)
    }

    /// Heading of a move from `self` to `other`
    ///
    /// Exact for straight lines; otherwise the direction whose straight line
    /// of the same length ends closest to `other`, first in `all()` order on
    /// ties. `None` only when the hexes are the same.
    pub fn direction_to(&self, other: &HexCoord) -> Option<HexDirection> {
        let n = self.distance(other) as i32;
        if n == 0 {
            return None;
        }
        HexDirection::all()
            .into_iter()
            .min_by_key(|d| self.step(*d, n).distance(other))
    }

    /// All hexes exactly `radius` steps away, in a stable walk order
    pub fn ring(&self, radius: u32) -> Vec<HexCoord> {
        if radius == 0 {
            return vec![*self];
        }
        let mut results = Vec::with_capacity(6 * radius as usize);
        let mut cur = self.step(HexDirection::SouthWest, radius as i32);
        for direction in HexDirection::all() {
            for _ in 0..radius {
                results.push(cur);
                cur = cur.step(direction, 1);
            }
        }
        results
    }

}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// The six hex directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

impl HexDirection {
    /// Get the hex offset for this direction
    pub fn offset(&self) -> HexCoord {
        match self {
            HexDirection::East => HexCoord::new(1, 0),
            HexDirection::NorthEast => HexCoord::new(1, -1),
            HexDirection::NorthWest => HexCoord::new(0, -1),
            HexDirection::West => HexCoord::new(-1, 0),
            HexDirection::SouthWest => HexCoord::new(-1, 1),
            HexDirection::SouthEast => HexCoord::new(0, 1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            HexDirection::East => HexDirection::West,
            HexDirection::NorthEast => HexDirection::SouthWest,
            HexDirection::NorthWest => HexDirection::SouthEast,
            HexDirection::West => HexDirection::East,
            HexDirection::SouthWest => HexDirection::NorthEast,
            HexDirection::SouthEast => HexDirection::NorthWest,
        }
    }

    /// All directions
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::NorthEast,
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::SouthWest,
            HexDirection::SouthEast,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ordering() {
        assert!(EntityId(1) < EntityId(2));
        let mut ids = vec![EntityId(3), EntityId(1), EntityId(2)];
        ids.sort();
        assert_eq!(ids, vec![EntityId(1), EntityId(2), EntityId(3)]);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(EntityId(7).to_string(), "entity-7");
        assert_eq!(EffectId(3).to_string(), "effect-3");
    }

    #[test]
    fn test_hex_distance() {
        let origin = HexCoord::new(0, 0);
        assert_eq!(origin.distance(&HexCoord::new(3, 0)), 3);
        assert_eq!(origin.distance(&HexCoord::new(2, -4)), 4);
        assert_eq!(origin.distance(&origin), 0);
    }

    #[test]
    fn test_step_and_direction_round_trip() {
        let start = HexCoord::new(2, -1);
        for direction in HexDirection::all() {
            let end = start.step(direction, 5);
            assert_eq!(start.distance(&end), 5);
            assert_eq!(start.direction_to(&end), Some(direction));
        }
    }

    #[test]
    fn test_direction_to_bends_to_closest() {
        let start = HexCoord::new(0, 0);
        assert_eq!(start.direction_to(&HexCoord::new(2, 1)), Some(HexDirection::East));
        assert_eq!(start.direction_to(&HexCoord::new(-1, 3)), Some(HexDirection::SouthEast));
        assert_eq!(start.direction_to(&start), None);
    }

    #[test]
    fn test_ring_sizes() {
        let center = HexCoord::new(4, 4);
        assert_eq!(center.ring(0), vec![center]);
        assert_eq!(center.ring(1).len(), 6);
        assert_eq!(center.ring(3).len(), 18);
        assert!(center.ring(3).iter().all(|h| h.distance(&center) == 3));
    }

    #[test]
    fn test_opposite_direction() {
        for direction in HexDirection::all() {
            assert_eq!(direction.opposite().opposite(), direction);
            let there = HexCoord::default().step(direction, 1);
            let back = there.step(direction.opposite(), 1);
            assert_eq!(back, HexCoord::default());
        }
    }
}
