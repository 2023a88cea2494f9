use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::board::cost::total_building_cost;
use crate::board::EdgeKey;
use crate::coords::TilePosition;
use crate::game::action::PlayerAction;
use crate::players::base::{PolicyContext, RailPolicy};
use crate::types::{PlayerId, PlayerObjective};

/// Baseline strategy: builds random affordable rails and rides the shortest
/// available route.
pub struct RandomPolicy {
    player: PlayerId,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        Self {
            player,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn affordable_builds(&self, ctx: &PolicyContext<'_>) -> Vec<EdgeKey> {
        let grid = ctx.state.grid();
        let config = ctx.state.config();
        grid.edge_keys()
            .filter(|&key| grid.can_add_rail(key, self.player))
            .filter(|&key| {
                total_building_cost(grid, config, key, self.player)
                    .map(|cost| cost <= ctx.building_budget)
                    .unwrap_or(false)
            })
            .collect()
    }

    fn unused_city_pairs(&self, ctx: &PolicyContext<'_>) -> Vec<(TilePosition, TilePosition)> {
        let cities: Vec<TilePosition> = ctx
            .state
            .grid()
            .cities()
            .map(|city| city.position)
            .collect();
        let mut pairs = Vec::new();
        for (i, &start) in cities.iter().enumerate() {
            for &target in &cities[i + 1..] {
                if !ctx.state.city_pair_used(start, target) {
                    pairs.push((start, target));
                }
            }
        }
        pairs
    }
}

impl RailPolicy for RandomPolicy {
    fn decide(&mut self, objective: PlayerObjective, ctx: &PolicyContext<'_>) -> PlayerAction {
        match objective {
            PlayerObjective::PlaceRail => {
                let candidates = self.affordable_builds(ctx);
                match candidates.choose(&mut self.rng) {
                    Some(&edge) => PlayerAction::BuildRail { edge },
                    None => PlayerAction::ConfirmBuild,
                }
            }
            PlayerObjective::ChooseCities => {
                let pairs = self.unused_city_pairs(ctx);
                match pairs.choose(&mut self.rng) {
                    Some(&(start, target)) => PlayerAction::ChooseCities { start, target },
                    // Nothing left to race; the engine ends the phase.
                    None => PlayerAction::ConfirmBuild,
                }
            }
            PlayerObjective::ChoosePath => {
                let edges = ctx
                    .state
                    .chosen_cities()
                    .and_then(|(start, target)| ctx.state.grid().find_rail_path(start, target))
                    .unwrap_or_default();
                PlayerAction::ChoosePath { edges }
            }
            PlayerObjective::ConfirmPath => PlayerAction::ConfirmPath,
            PlayerObjective::RollDice => PlayerAction::RollDice,
            PlayerObjective::Drive => PlayerAction::Drive,
            PlayerObjective::ConfirmBuild | PlayerObjective::Idle => PlayerAction::ConfirmBuild,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{City, HexGrid, Tile};
    use crate::game::config::GameConfig;
    use crate::game::player::Player;
    use crate::game::state::GameState;
    use crate::types::Terrain;

    fn state() -> GameState {
        let grid = HexGrid::from_parts(
            vec![
                Tile {
                    position: TilePosition::new(0, 0),
                    terrain: Terrain::Plain,
                },
                Tile {
                    position: TilePosition::new(1, 0),
                    terrain: Terrain::Plain,
                },
                Tile {
                    position: TilePosition::new(2, 0),
                    terrain: Terrain::Plain,
                },
            ],
            vec![
                City {
                    name: "Aachen".to_string(),
                    position: TilePosition::new(0, 0),
                    is_starting_city: true,
                },
                City {
                    name: "Cottbus".to_string(),
                    position: TilePosition::new(2, 0),
                    is_starting_city: true,
                },
            ],
        )
        .expect("valid grid");
        GameState::new(
            GameConfig::default(),
            grid,
            vec![Player::ai("Bot", "RANDOM"), Player::human("Ada")],
        )
    }

    #[test]
    fn builds_only_affordable_valid_edges() {
        let state = state();
        let mut policy = RandomPolicy::new(0, 9);
        let ctx = PolicyContext {
            player: 0,
            state: &state,
            building_budget: 10,
            pending_path: &[],
        };
        match policy.decide(PlayerObjective::PlaceRail, &ctx) {
            PlayerAction::BuildRail { edge } => {
                assert!(state.grid().can_add_rail(edge, 0));
            }
            other => panic!("expected a build, got {other:?}"),
        }
    }

    #[test]
    fn confirms_when_budget_is_exhausted() {
        let state = state();
        let mut policy = RandomPolicy::new(0, 9);
        let ctx = PolicyContext {
            player: 0,
            state: &state,
            building_budget: 0,
            pending_path: &[],
        };
        assert_eq!(
            policy.decide(PlayerObjective::PlaceRail, &ctx),
            PlayerAction::ConfirmBuild
        );
    }

    #[test]
    fn chooses_an_unused_city_pair() {
        let state = state();
        let mut policy = RandomPolicy::new(0, 9);
        let ctx = PolicyContext {
            player: 0,
            state: &state,
            building_budget: 0,
            pending_path: &[],
        };
        match policy.decide(PlayerObjective::ChooseCities, &ctx) {
            PlayerAction::ChooseCities { start, target } => {
                assert_ne!(start, target);
                assert!(state.grid().city_at(start).is_some());
                assert!(state.grid().city_at(target).is_some());
            }
            other => panic!("expected a city choice, got {other:?}"),
        }
    }
}
