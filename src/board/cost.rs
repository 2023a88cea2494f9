//! Pure cost functions over the grid, its rail overlay and a caller player.

use std::collections::{BTreeMap, HashSet};

use crate::board::{EdgeKey, HexGrid};
use crate::coords::TilePosition;
use crate::game::config::GameConfig;
use crate::types::PlayerId;

/// Surcharge per pre-existing parallel owner when an endpoint hosts a city.
const PARALLEL_COST_WITH_CITY: u32 = 3;
/// Surcharge per pre-existing parallel owner on an open stretch.
const PARALLEL_COST_OPEN: u32 = 5;
/// Minimum surcharge for owners of neighbouring edges at non-city endpoints.
const PARALLEL_COST_NEIGHBOUR: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CostError {
    #[error("no such edge on the grid")]
    UnknownEdge,
    #[error("position ({q},{r}) is not an endpoint of the edge", q = .position.q, r = .position.r)]
    NotAnEndpoint { position: TilePosition },
    #[error("no cost entry for the terrain combination")]
    MissingCostEntry,
}

/// Base cost of laying track on the edge, keyed by the unordered pair of
/// terrain types of its endpoint tiles.
pub fn base_building_cost(
    grid: &HexGrid,
    config: &GameConfig,
    edge: EdgeKey,
) -> Result<u32, CostError> {
    if grid.edge(edge).is_none() {
        return Err(CostError::UnknownEdge);
    }
    let [first, second] = edge.endpoints();
    let a = grid.tile_at(first).ok_or(CostError::UnknownEdge)?.terrain;
    let b = grid.tile_at(second).ok_or(CostError::UnknownEdge)?.terrain;
    config
        .tile_type_to_building_cost
        .building_cost(a, b)
        .ok_or(CostError::MissingCostEntry)
}

/// Surcharge owed to each other player for building parallel to their track.
///
/// Pre-existing owners of this edge are charged 3 when an endpoint hosts a
/// city, 5 otherwise. Owners of other edges at non-city endpoints are
/// charged at least 1, without ever lowering an already assigned surcharge.
/// Endpoints where the builder already has a neighbouring rail contribute
/// nothing.
pub fn parallel_cost_per_player(
    grid: &HexGrid,
    edge: EdgeKey,
    builder: PlayerId,
) -> BTreeMap<PlayerId, u32> {
    let mut result = BTreeMap::new();
    let Some(existing) = grid.edge(edge) else {
        return result;
    };

    let endpoints = edge.endpoints();
    let has_city_endpoint = endpoints
        .iter()
        .any(|&position| grid.city_at(position).is_some());
    let per_owner = if has_city_endpoint {
        PARALLEL_COST_WITH_CITY
    } else {
        PARALLEL_COST_OPEN
    };
    for &owner in existing.rail_owners() {
        if owner != builder {
            result.insert(owner, per_owner);
        }
    }

    for &position in &endpoints {
        if grid.city_at(position).is_some() {
            continue;
        }
        let owners: HashSet<PlayerId> = grid
            .edges_of(position)
            .into_iter()
            .filter(|other| other.key() != edge)
            .flat_map(|other| other.rail_owners().iter().copied())
            .collect();
        if owners.contains(&builder) {
            continue;
        }
        for owner in owners {
            let entry = result.entry(owner).or_insert(0);
            *entry = (*entry).max(PARALLEL_COST_NEIGHBOUR);
        }
    }

    result
}

pub fn total_parallel_cost(grid: &HexGrid, edge: EdgeKey, builder: PlayerId) -> u32 {
    parallel_cost_per_player(grid, edge, builder).values().sum()
}

pub fn total_building_cost(
    grid: &HexGrid,
    config: &GameConfig,
    edge: EdgeKey,
    builder: PlayerId,
) -> Result<u32, CostError> {
    Ok(base_building_cost(grid, config, edge)? + total_parallel_cost(grid, edge, builder))
}

/// One credit per distinct owner for driving over foreign track; empty when
/// the caller owns the edge themselves.
pub fn renting_cost(grid: &HexGrid, edge: EdgeKey, player: PlayerId) -> BTreeMap<PlayerId, u32> {
    let Some(existing) = grid.edge(edge) else {
        return BTreeMap::new();
    };
    if existing.has_rail_of(player) {
        return BTreeMap::new();
    }
    existing
        .rail_owners()
        .iter()
        .map(|&owner| (owner, 1))
        .collect()
}

/// Movement cost of crossing the edge starting at `from`, keyed by the
/// ordered pair (terrain of `from`, terrain of the opposite endpoint).
pub fn driving_cost(
    grid: &HexGrid,
    config: &GameConfig,
    edge: EdgeKey,
    from: TilePosition,
) -> Result<u32, CostError> {
    if grid.edge(edge).is_none() {
        return Err(CostError::UnknownEdge);
    }
    let to = edge
        .other_endpoint(from)
        .ok_or(CostError::NotAnEndpoint { position: from })?;
    let from_terrain = grid.tile_at(from).ok_or(CostError::UnknownEdge)?.terrain;
    let to_terrain = grid.tile_at(to).ok_or(CostError::UnknownEdge)?.terrain;
    config
        .tile_type_to_driving_cost
        .driving_cost(from_terrain, to_terrain)
        .ok_or(CostError::MissingCostEntry)
}
