use std::collections::{HashMap, HashSet, VecDeque};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeDirection {
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

impl EdgeDirection {
    pub fn opposite(self) -> EdgeDirection {
        match self {
            EdgeDirection::East => EdgeDirection::West,
            EdgeDirection::NorthEast => EdgeDirection::SouthWest,
            EdgeDirection::NorthWest => EdgeDirection::SouthEast,
            EdgeDirection::West => EdgeDirection::East,
            EdgeDirection::SouthWest => EdgeDirection::NorthEast,
            EdgeDirection::SouthEast => EdgeDirection::NorthWest,
        }
    }
}

/// Axial coordinates on a pointy-top hex grid. `q` grows eastwards, `r`
/// grows south-eastwards.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TilePosition {
    pub q: i32,
    pub r: i32,
}

impl TilePosition {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn add(self, other: TilePosition) -> Self {
        TilePosition::new(self.q + other.q, self.r + other.r)
    }

    pub fn neighbour(self, direction: EdgeDirection) -> TilePosition {
        self.add(UNIT_VECTORS[&direction])
    }

    pub fn neighbours(self) -> impl Iterator<Item = TilePosition> {
        EdgeDirection::iter().map(move |direction| self.neighbour(direction))
    }
}

pub static UNIT_VECTORS: Lazy<HashMap<EdgeDirection, TilePosition>> = Lazy::new(|| {
    use EdgeDirection::*;
    HashMap::from([
        (East, TilePosition::new(1, 0)),
        (NorthEast, TilePosition::new(1, -1)),
        (NorthWest, TilePosition::new(0, -1)),
        (West, TilePosition::new(-1, 0)),
        (SouthWest, TilePosition::new(-1, 1)),
        (SouthEast, TilePosition::new(0, 1)),
    ])
});

fn num_tiles_for(layer: i32) -> i32 {
    if layer == 0 {
        return 1;
    }
    6 * layer + num_tiles_for(layer - 1)
}

/// Generates the positions of a hexagon-shaped map with the given number of
/// rings around the center tile, by breadth-first expansion from the origin.
pub fn generate_coordinate_system(num_layers: i32) -> HashSet<TilePosition> {
    let target = num_tiles_for(num_layers);
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([TilePosition::new(0, 0)]);

    while (visited.len() as i32) < target {
        let node = queue.pop_front().expect("queue should not be empty");
        if !visited.insert(node) {
            continue;
        }
        for neighbour in node.neighbours() {
            if !visited.contains(&neighbour) && !queue.contains(&neighbour) {
                queue.push_back(neighbour);
            }
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_are_derived_from_offset_tables() {
        let center = TilePosition::new(0, 0);
        let expected: HashSet<TilePosition> = UNIT_VECTORS.values().copied().collect();
        let actual: HashSet<TilePosition> = center.neighbours().collect();
        assert_eq!(actual, expected);
        assert_eq!(actual.len(), 6);
    }

    #[test]
    fn opposite_directions_cancel() {
        for direction in EdgeDirection::iter() {
            let pos = TilePosition::new(3, -2);
            assert_eq!(
                pos.neighbour(direction).neighbour(direction.opposite()),
                pos
            );
        }
    }

    #[test]
    fn coordinate_system_sizes() {
        assert_eq!(generate_coordinate_system(0).len(), 1);
        assert_eq!(generate_coordinate_system(1).len(), 7);
        assert_eq!(generate_coordinate_system(2).len(), 19);
        assert_eq!(generate_coordinate_system(3).len(), 37);
    }
}
