use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::board::cost::{renting_cost, total_building_cost};
use crate::board::EdgeKey;
use crate::coords::TilePosition;
use crate::game::action::PlayerAction;
use crate::players::base::{PolicyContext, RailPolicy};
use crate::types::{PlayerId, PlayerObjective};

/// Cost-aware strategy: extends its network with the cheapest useful edge,
/// races the city pair with the cheapest available route, and keeps rental
/// fees down by preferring its own track.
pub struct GreedyPolicy {
    player: PlayerId,
    rng: StdRng,
}

impl GreedyPolicy {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        Self {
            player,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn best_build(&mut self, ctx: &PolicyContext<'_>) -> Option<EdgeKey> {
        let grid = ctx.state.grid();
        let config = ctx.state.config();
        let mut best: Option<(i64, EdgeKey)> = None;
        for key in grid.edge_keys() {
            if !grid.can_add_rail(key, self.player) {
                continue;
            }
            let Ok(cost) = total_building_cost(grid, config, key, self.player) else {
                continue;
            };
            if cost > ctx.building_budget {
                continue;
            }
            let city_bonus: i64 = key
                .endpoints()
                .iter()
                .filter(|&&position| grid.city_at(position).is_some())
                .count() as i64
                * 4;
            let fresh_bonus: i64 = if grid.edge(key).is_some_and(|edge| edge.has_rail()) {
                0
            } else {
                2
            };
            let score = city_bonus + fresh_bonus - cost as i64;
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, key));
            }
        }
        best.map(|(_, key)| key)
    }

    /// Cost of riding a route: driving distance plus rental fees.
    fn route_cost(&self, ctx: &PolicyContext<'_>, path: &[EdgeKey]) -> i64 {
        let grid = ctx.state.grid();
        path.iter()
            .map(|&edge| {
                let rent: u32 = renting_cost(grid, edge, self.player).values().sum();
                1 + rent as i64
            })
            .sum()
    }

    fn best_city_pair(&mut self, ctx: &PolicyContext<'_>) -> Option<(TilePosition, TilePosition)> {
        let grid = ctx.state.grid();
        let cities: Vec<TilePosition> = grid.cities().map(|city| city.position).collect();
        let mut reachable: Option<(i64, (TilePosition, TilePosition))> = None;
        let mut fallback = Vec::new();
        for (i, &start) in cities.iter().enumerate() {
            for &target in &cities[i + 1..] {
                if ctx.state.city_pair_used(start, target) {
                    continue;
                }
                fallback.push((start, target));
                let Some(path) = grid.find_rail_path(start, target) else {
                    continue;
                };
                let cost = self.route_cost(ctx, &path);
                if reachable.map_or(true, |(best_cost, _)| cost < best_cost) {
                    reachable = Some((cost, (start, target)));
                }
            }
        }
        reachable
            .map(|(_, pair)| pair)
            .or_else(|| fallback.choose(&mut self.rng).copied())
    }
}

impl RailPolicy for GreedyPolicy {
    fn decide(&mut self, objective: PlayerObjective, ctx: &PolicyContext<'_>) -> PlayerAction {
        match objective {
            PlayerObjective::PlaceRail => match self.best_build(ctx) {
                Some(edge) => PlayerAction::BuildRail { edge },
                None => PlayerAction::ConfirmBuild,
            },
            PlayerObjective::ChooseCities => match self.best_city_pair(ctx) {
                Some((start, target)) => PlayerAction::ChooseCities { start, target },
                None => PlayerAction::ConfirmBuild,
            },
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
