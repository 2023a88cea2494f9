use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::IntoEnumIterator;

use crate::coords::{EdgeDirection, TilePosition};
use crate::types::{PlayerId, Terrain};

pub mod cost;

/// Rail owners per edge. Almost always at most two parallel tracks; append
/// order is preserved for deterministic replay.
pub type OwnerList = SmallVec<[PlayerId; 2]>;

/// Canonical identifier of an edge: the unordered pair of its endpoint
/// positions, stored smaller-first so each pair maps to exactly one key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EdgeKey {
    a: TilePosition,
    b: TilePosition,
}

impl EdgeKey {
    pub fn new(first: TilePosition, second: TilePosition) -> Self {
        if second < first {
            Self {
                a: second,
                b: first,
            }
        } else {
            Self {
                a: first,
                b: second,
            }
        }
    }

    pub fn position1(&self) -> TilePosition {
        self.a
    }

    pub fn position2(&self) -> TilePosition {
        self.b
    }

    pub fn endpoints(&self) -> [TilePosition; 2] {
        [self.a, self.b]
    }

    pub fn has_endpoint(&self, position: TilePosition) -> bool {
        self.a == position || self.b == position
    }

    /// The endpoint opposite `from`, if `from` is an endpoint at all.
    pub fn other_endpoint(&self, from: TilePosition) -> Option<TilePosition> {
        if from == self.a {
            Some(self.b)
        } else if from == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Two distinct edges connect iff they share exactly one endpoint.
    pub fn connects_to(&self, other: &EdgeKey) -> bool {
        if self == other {
            return false;
        }
        let shared = usize::from(other.has_endpoint(self.a)) + usize::from(other.has_endpoint(self.b));
        shared == 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub position: TilePosition,
    pub terrain: Terrain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub position: TilePosition,
    pub is_starting_city: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    key: EdgeKey,
    rail_owners: OwnerList,
}

impl Edge {
    fn new(key: EdgeKey) -> Self {
        Self {
            key,
            rail_owners: OwnerList::new(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        self.key
    }

    pub fn rail_owners(&self) -> &[PlayerId] {
        &self.rail_owners
    }

    pub fn has_rail(&self) -> bool {
        !self.rail_owners.is_empty()
    }

    pub fn has_rail_of(&self, player: PlayerId) -> bool {
        self.rail_owners.contains(&player)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("city {name} at ({q},{r}) is not on a tile", q = .position.q, r = .position.r)]
    CityOffGrid { name: String, position: TilePosition },
    #[error("tile ({q},{r}) already hosts a city", q = .position.q, r = .position.r)]
    DuplicateCity { position: TilePosition },
    #[error("map has {tiles} tiles but {cities} cities were requested")]
    NotEnoughTiles { tiles: usize, cities: usize },
}

/// The immutable hex topology plus the mutable rail overlay. Tiles, edges
/// and cities are owned here and referenced by position everywhere else.
/// Serialized as plain tables since the position-keyed maps do not map onto
/// JSON object keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "GridTables", into = "GridTables")]
pub struct HexGrid {
    tiles: HashMap<TilePosition, Tile>,
    edges: BTreeMap<EdgeKey, Edge>,
    cities: BTreeMap<TilePosition, City>,
}

#[derive(Serialize, Deserialize)]
struct GridTables {
    tiles: Vec<Tile>,
    edges: Vec<Edge>,
    cities: Vec<City>,
}

impl From<HexGrid> for GridTables {
    fn from(grid: HexGrid) -> Self {
        let mut tiles: Vec<Tile> = grid.tiles.into_values().collect();
        tiles.sort_by_key(|tile| tile.position);
        Self {
            tiles,
            edges: grid.edges.into_values().collect(),
            cities: grid.cities.into_values().collect(),
        }
    }
}

impl From<GridTables> for HexGrid {
    fn from(tables: GridTables) -> Self {
        Self {
            tiles: tables
                .tiles
                .into_iter()
                .map(|tile| (tile.position, tile))
                .collect(),
            edges: tables.edges.into_iter().map(|edge| (edge.key, edge)).collect(),
            cities: tables
                .cities
                .into_iter()
                .map(|city| (city.position, city))
                .collect(),
        }
    }
}

impl HexGrid {
    /// Builds a grid from explicit tiles and cities. An edge is created for
    /// every pair of adjacent tiles; tiles at the map boundary simply have
    /// fewer edges.
    pub fn from_parts(tiles: Vec<Tile>, cities: Vec<City>) -> Result<Self, GridError> {
        let tile_map: HashMap<TilePosition, Tile> =
            tiles.into_iter().map(|tile| (tile.position, tile)).collect();

        let mut edges = BTreeMap::new();
        for position in tile_map.keys() {
            for neighbour in position.neighbours() {
                if tile_map.contains_key(&neighbour) {
                    let key = EdgeKey::new(*position, neighbour);
                    edges.entry(key).or_insert_with(|| Edge::new(key));
                }
            }
        }

        let mut city_map = BTreeMap::new();
        for city in cities {
            if !tile_map.contains_key(&city.position) {
                return Err(GridError::CityOffGrid {
                    name: city.name,
                    position: city.position,
                });
            }
            if city_map.contains_key(&city.position) {
                return Err(GridError::DuplicateCity {
                    position: city.position,
                });
            }
            city_map.insert(city.position, city);
        }

        Ok(Self {
            tiles: tile_map,
            edges,
            cities: city_map,
        })
    }

    /// Generates the default hexagon-shaped map: `layers` rings of tiles,
    /// mountains sprinkled at `mountain_ratio`, one city per town name on
    /// distinct tiles, the first `starting_city_count` of them seeded.
    pub fn generate(
        layers: i32,
        mountain_ratio: f64,
        town_names: &[String],
        starting_city_count: usize,
        rng: &mut impl Rng,
    ) -> Result<Self, GridError> {
        let mut positions: Vec<TilePosition> =
            crate::coords::generate_coordinate_system(layers).into_iter().collect();
        positions.sort();

        if positions.len() < town_names.len() {
            return Err(GridError::NotEnoughTiles {
                tiles: positions.len(),
                cities: town_names.len(),
            });
        }

        let tiles: Vec<Tile> = positions
            .iter()
            .map(|&position| Tile {
                position,
                terrain: if rng.gen_bool(mountain_ratio) {
                    Terrain::Mountain
                } else {
                    Terrain::Plain
                },
            })
            .collect();

        let mut city_positions = positions.clone();
        city_positions.shuffle(rng);
        let cities: Vec<City> = town_names
            .iter()
            .zip(city_positions)
            .enumerate()
            .map(|(index, (name, position))| City {
                name: name.clone(),
                position,
                is_starting_city: index < starting_city_count,
            })
            .collect();

        Self::from_parts(tiles, cities)
    }

    pub fn tile_at(&self, position: TilePosition) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub fn city_at(&self, position: TilePosition) -> Option<&City> {
        self.cities.get(&position)
    }

    pub fn edge_between(&self, a: TilePosition, b: TilePosition) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(a, b))
    }

    pub fn edge(&self, key: EdgeKey) -> Option<&Edge> {
        self.edges.get(&key)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.keys().copied()
    }

    pub fn cities(&self) -> impl Iterator<Item = &City> {
        self.cities.values()
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    pub fn starting_cities(&self) -> impl Iterator<Item = &City> {
        self.cities.values().filter(|city| city.is_starting_city)
    }

    /// All edges the given player has laid track on.
    pub fn rails(&self, player: PlayerId) -> Vec<EdgeKey> {
        self.edges
            .values()
            .filter(|edge| edge.has_rail_of(player))
            .map(Edge::key)
            .collect()
    }

    pub fn edge_in_direction(&self, position: TilePosition, direction: EdgeDirection) -> Option<&Edge> {
        let neighbour = position.neighbour(direction);
        if !self.tiles.contains_key(&neighbour) {
            return None;
        }
        self.edge_between(position, neighbour)
    }

    /// The six edges of a tile, absent ones at the map boundary skipped.
    pub fn edges_of(&self, position: TilePosition) -> Vec<&Edge> {
        EdgeDirection::iter()
            .filter_map(|direction| self.edge_in_direction(position, direction))
            .collect()
    }

    pub fn neighbour(&self, position: TilePosition, direction: EdgeDirection) -> Option<&Tile> {
        self.tiles.get(&position.neighbour(direction))
    }

    pub fn neighbours(&self, position: TilePosition) -> Vec<&Tile> {
        position
            .neighbours()
            .filter_map(|neighbour| self.tiles.get(&neighbour))
            .collect()
    }

    pub fn is_at_coast(&self, position: TilePosition) -> bool {
        self.neighbours(position).len() < 6
    }

    /// Neighbour tiles reachable from `position` through edges contained in
    /// `edge_set`.
    pub fn connected_neighbours(
        &self,
        position: TilePosition,
        edge_set: &HashSet<EdgeKey>,
    ) -> Vec<&Tile> {
        EdgeDirection::iter()
            .filter_map(|direction| {
                let edge = self.edge_in_direction(position, direction)?;
                if edge_set.contains(&edge.key()) {
                    self.neighbour(position, direction)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Edges of the grid sharing exactly one endpoint with `key`.
    pub fn connected_edges(&self, key: EdgeKey) -> Vec<EdgeKey> {
        self.edges
            .keys()
            .filter(|other| key.connects_to(other))
            .copied()
            .collect()
    }

    /// The subset of `connected_edges` the given player has track on.
    pub fn connected_rails(&self, key: EdgeKey, player: PlayerId) -> Vec<EdgeKey> {
        self.connected_edges(key)
            .into_iter()
            .filter(|other| {
                self.edges
                    .get(other)
                    .is_some_and(|edge| edge.has_rail_of(player))
            })
            .collect()
    }

    /// Whether `add_rail` would succeed for this player and edge: the edge
    /// exists, the player does not own it yet, and either this is the
    /// player's first rail touching a starting city or it extends their
    /// existing network.
    pub fn can_add_rail(&self, key: EdgeKey, player: PlayerId) -> bool {
        let Some(edge) = self.edges.get(&key) else {
            return false;
        };
        if edge.has_rail_of(player) {
            return false;
        }
        if self.rails(player).is_empty() {
            key.endpoints().iter().any(|&position| {
                self.city_at(position)
                    .is_some_and(|city| city.is_starting_city)
            })
        } else {
            !self.connected_rails(key, player).is_empty()
        }
    }

    /// Lays track for `player` on the edge, enforcing the placement rules:
    /// no re-owning, first rail must touch a starting city, later rails must
    /// extend the player's own network.
    pub fn add_rail(&mut self, key: EdgeKey, player: PlayerId) -> bool {
        if !self.can_add_rail(key, player) {
            return false;
        }
        if let Some(edge) = self.edges.get_mut(&key) {
            edge.rail_owners.push(player);
            true
        } else {
            false
        }
    }

    pub fn remove_rail(&mut self, key: EdgeKey, player: PlayerId) -> bool {
        let Some(edge) = self.edges.get_mut(&key) else {
            return false;
        };
        if let Some(index) = edge.rail_owners.iter().position(|&owner| owner == player) {
            edge.rail_owners.remove(index);
            true
        } else {
            false
        }
    }

    /// A city is connected iff some path of railed edges, owned by anyone,
    /// reaches another city.
    pub fn is_city_connected(&self, position: TilePosition) -> bool {
        if self.city_at(position).is_none() {
            return false;
        }
        let mut visited = HashSet::from([position]);
        let mut queue = VecDeque::from([position]);
        while let Some(current) = queue.pop_front() {
            for edge in self.edges_of(current) {
                if !edge.has_rail() {
                    continue;
                }
                let Some(next) = edge.key().other_endpoint(current) else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }
                if self.cities.contains_key(&next) {
                    return true;
                }
                queue.push_back(next);
            }
        }
        false
    }

    pub fn unconnected_cities(&self) -> Vec<&City> {
        self.cities
            .values()
            .filter(|city| !self.is_city_connected(city.position))
            .collect()
    }

    /// Shortest path between two positions over railed edges, as the list of
    /// edges to traverse. `None` when no railed route exists.
    pub fn find_rail_path(
        &self,
        start: TilePosition,
        target: TilePosition,
    ) -> Option<Vec<EdgeKey>> {
        if start == target {
            return Some(Vec::new());
        }
        let mut came_from: HashMap<TilePosition, EdgeKey> = HashMap::new();
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for edge in self.edges_of(current) {
                if !edge.has_rail() {
                    continue;
                }
                let Some(next) = edge.key().other_endpoint(current) else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }
                came_from.insert(next, edge.key());
                if next == target {
                    let mut path = Vec::new();
                    let mut cursor = target;
                    while cursor != start {
                        let key = came_from[&cursor];
                        cursor = key
                            .other_endpoint(cursor)
                            .expect("path edges have both endpoints");
                        path.push(key);
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }
}
