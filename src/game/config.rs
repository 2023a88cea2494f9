use serde::{Deserialize, Serialize};

use crate::types::Terrain;

/// Building cost lookup keyed by the unordered pair of endpoint terrains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingCostTable {
    entries: Vec<(Terrain, Terrain, u32)>,
}

impl BuildingCostTable {
    pub fn new(entries: Vec<(Terrain, Terrain, u32)>) -> Self {
        Self { entries }
    }

    pub fn building_cost(&self, a: Terrain, b: Terrain) -> Option<u32> {
        self.entries
            .iter()
            .find(|(first, second, _)| {
                (*first == a && *second == b) || (*first == b && *second == a)
            })
            .map(|(_, _, cost)| *cost)
    }
}

impl Default for BuildingCostTable {
    fn default() -> Self {
        Self::new(vec![
            (Terrain::Plain, Terrain::Plain, 1),
            (Terrain::Plain, Terrain::Mountain, 3),
            (Terrain::Mountain, Terrain::Mountain, 5),
        ])
    }
}

/// Driving cost lookup keyed by the ordered pair (from, to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrivingCostTable {
    entries: Vec<(Terrain, Terrain, u32)>,
}

impl DrivingCostTable {
    pub fn new(entries: Vec<(Terrain, Terrain, u32)>) -> Self {
        Self { entries }
    }

    pub fn driving_cost(&self, from: Terrain, to: Terrain) -> Option<u32> {
        self.entries
            .iter()
            .find(|(first, second, _)| *first == from && *second == to)
            .map(|(_, _, cost)| *cost)
    }
}

impl Default for DrivingCostTable {
    fn default() -> Self {
        Self::new(vec![
            (Terrain::Plain, Terrain::Plain, 1),
            (Terrain::Plain, Terrain::Mountain, 2),
            (Terrain::Mountain, Terrain::Plain, 1),
            (Terrain::Mountain, Terrain::Mountain, 2),
        ])
    }
}

/// The closed set of engine tunables. Passed in at construction so tests
/// can vary any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub min_players: usize,
    pub dice_sides: u32,
    /// The building phase ends once at most this many cities are
    /// unconnected.
    pub unconnected_cities_start_threshold: usize,
    /// Fixed budget handed out during the every-third-round build window of
    /// the driving phase.
    pub max_building_budget_driving_phase: u32,
    /// Building-phase budget per round is the dice roll times this factor.
    pub building_budget_multiplier: u32,
    /// Payouts for the first, second, ... finisher of a driving round.
    pub winning_credits: Vec<u32>,
    pub tile_type_to_building_cost: BuildingCostTable,
    pub tile_type_to_driving_cost: DrivingCostTable,
    pub town_names: Vec<String>,
    pub starting_city_count: usize,
    pub map_layers: i32,
    pub mountain_ratio: f64,
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            dice_sides: 6,
            unconnected_cities_start_threshold: 0,
            max_building_budget_driving_phase: 5,
            building_budget_multiplier: 2,
            winning_credits: vec![6, 3],
            tile_type_to_building_cost: BuildingCostTable::default(),
            tile_type_to_driving_cost: DrivingCostTable::default(),
            town_names: [
                "Aachen", "Bremen", "Cottbus", "Dresden", "Erfurt", "Flensburg", "Gera", "Hamm",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            starting_city_count: 3,
            map_layers: 3,
            mountain_ratio: 0.25,
            seed: 42,
        }
    }
}
