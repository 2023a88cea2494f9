use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::cost::{
    driving_cost, parallel_cost_per_player, renting_cost, total_building_cost,
};
use crate::board::EdgeKey;
use crate::coords::TilePosition;
use crate::game::action::PlayerAction;
use crate::game::state::{GameError, GameState, InvalidAction};
use crate::observe::Property;
use crate::players::base::{PolicyContext, PolicyRegistry, RailPolicy};
use crate::players::controller::{PlayerController, PlayerHandle};
use crate::types::{ActionKind, GamePhase, PlayerId, PlayerObjective};

/// After this many rejected answers in a row an AI policy is overridden
/// with the engine's fallback action for the objective.
const MAX_POLICY_REJECTIONS: u32 = 8;
/// Hard backstop against a race that can no longer make progress.
const DRIVING_ROUNDS_LIMIT: u32 = 1000;

/// Lets a UI thread stop the engine; the flag is observed at the next
/// active-player boundary.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// The orchestrator. Owns the game state and one controller per seat,
/// drives the building and driving phases on the calling thread, and
/// delegates every choice to the player controllers.
pub struct GameController {
    id: Uuid,
    state: GameState,
    controllers: Vec<PlayerController>,
    policies: HashMap<PlayerId, Box<dyn RailPolicy>>,
    degraded: HashSet<PlayerId>,
    dice: Box<dyn FnMut() -> u32 + Send>,
    rng: StdRng,
    active_player: Property<Option<PlayerId>>,
    stopped: Arc<AtomicBool>,
}

impl GameController {
    pub fn new(state: GameState, registry: &PolicyRegistry) -> Self {
        let seed = state.config().seed;
        let dice_sides = state.config().dice_sides;
        let mut dice_rng = StdRng::seed_from_u64(seed);
        Self::with_dice(state, registry, move || {
            dice_rng.gen_range(1..=dice_sides.max(1))
        })
    }

    /// Injectable dice for tests and tools.
    pub fn with_dice(
        state: GameState,
        registry: &PolicyRegistry,
        dice: impl FnMut() -> u32 + Send + 'static,
    ) -> Self {
        let seed = state.config().seed;
        let mut controllers = Vec::with_capacity(state.players().len());
        let mut policies: HashMap<PlayerId, Box<dyn RailPolicy>> = HashMap::new();
        let mut degraded = HashSet::new();

        for (player, record) in state.players().iter().enumerate() {
            controllers.push(PlayerController::new(player));
            if let Some(policy_name) = &record.ai_policy {
                match registry.create(policy_name, player, seed.wrapping_add(player as u64 + 1)) {
                    Some(policy) => {
                        policies.insert(player, policy);
                    }
                    None => {
                        warn!(
                            player,
                            policy = policy_name.as_str(),
                            "unknown AI policy; player will idle"
                        );
                        degraded.insert(player);
                    }
                }
            }
        }

        Self {
            id: Uuid::new_v4(),
            state,
            controllers,
            policies,
            degraded,
            dice: Box::new(dice),
            rng: StdRng::seed_from_u64(seed.wrapping_mul(31).wrapping_add(17)),
            active_player: Property::new(None),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn active_player(&self) -> Option<PlayerId> {
        self.active_player.get()
    }

    pub fn active_player_property(&self) -> Property<Option<PlayerId>> {
        self.active_player.clone()
    }

    /// Submission handles for UI collaborators, keyed by seat.
    pub fn player_handles(&self) -> HashMap<PlayerId, PlayerHandle> {
        self.controllers
            .iter()
            .map(|controller| (controller.player(), controller.handle()))
            .collect()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stopped),
        }
    }

    /// Runs the whole game on the calling thread and returns the winner.
    pub fn start(&mut self) -> Result<PlayerId, GameError> {
        let required = self.state.config().min_players;
        let actual = self.state.players().len();
        if actual < required {
            return Err(GameError::NotEnoughPlayers { required, actual });
        }

        info!(game = %self.id, players = actual, "game started");
        self.state.set_phase(GamePhase::Building);
        self.execute_building_phase()?;

        self.state.set_phase(GamePhase::Driving);
        self.state.set_round_counter(0);
        self.execute_driving_phase()?;

        let winner = self.determine_winner();
        self.state.set_winner(winner);
        self.state.set_phase(GamePhase::Finished);
        info!(game = %self.id, winner, "game finished");
        Ok(winner)
    }

    fn cast_dice(&mut self) -> u32 {
        let roll = (self.dice)();
        self.state.set_current_dice_roll(roll);
        roll
    }

    /// Winner is the richest player; seat order breaks ties.
    fn determine_winner(&self) -> PlayerId {
        let mut winner = 0;
        let mut best = 0;
        for (player, record) in self.state.players().iter().enumerate() {
            if record.credits() > best {
                best = record.credits();
                winner = player;
            }
        }
        winner
    }

    /// Brackets `run` with the active-player property and always returns the
    /// controller to IDLE afterwards, also when `run` fails. The stop flag
    /// is observed here.
    fn with_active_player<T>(
        &mut self,
        player: PlayerId,
        run: impl FnOnce(&mut Self) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(GameError::EngineStopped);
        }
        self.active_player.set(Some(player));
        let result = run(self);
        self.controllers[player].set_objective(PlayerObjective::Idle);
        self.active_player.set(None);
        result
    }

    /// Suspends until the player's controller yields an action the engine
    /// accepts. Passing an objective sets it first. Invalid actions are
    /// rejected and the controller re-prompted.
    fn wait_for_next_action(
        &mut self,
        player: PlayerId,
        objective: Option<PlayerObjective>,
    ) -> Result<PlayerAction, GameError> {
        if let Some(objective) = objective {
            self.controllers[player].set_objective(objective);
        }
        let mut rejections = 0u32;
        loop {
            let action = self.obtain_action(player, rejections)?;
            match self.apply_action(player, &action) {
                Ok(()) => return Ok(action),
                Err(rejection) => {
                    warn!(player, %rejection, "action rejected; re-prompting");
                    rejections += 1;
                }
            }
        }
    }

    fn obtain_action(
        &mut self,
        player: PlayerId,
        rejections: u32,
    ) -> Result<PlayerAction, GameError> {
        let objective = self.controllers[player].objective();
        let policy_gave_up = rejections >= MAX_POLICY_REJECTIONS && self.policies.contains_key(&player);
        if self.degraded.contains(&player) || policy_gave_up {
            return Ok(self.fallback_action(player, objective));
        }
        if let Some(policy) = self.policies.get_mut(&player) {
            let ctx = PolicyContext {
                player,
                state: &self.state,
                building_budget: self.controllers[player].building_budget(),
                pending_path: self.controllers[player].pending_path(),
            };
            return Ok(policy.decide(objective, &ctx));
        }
        self.controllers[player].recv_action()
    }

    /// What an idle seat does: builds nothing, sits out the race, and lets
    /// the engine pick cities when it must.
    fn fallback_action(&mut self, _player: PlayerId, objective: PlayerObjective) -> PlayerAction {
        match objective {
            PlayerObjective::ChooseCities => match self.choose_random_cities() {
                Some((start, target)) => PlayerAction::ChooseCities { start, target },
                None => PlayerAction::ConfirmBuild,
            },
            PlayerObjective::ChoosePath => PlayerAction::ChoosePath { edges: Vec::new() },
            PlayerObjective::ConfirmPath => PlayerAction::ConfirmPath,
            PlayerObjective::RollDice => PlayerAction::RollDice,
            PlayerObjective::Drive => PlayerAction::Drive,
            PlayerObjective::PlaceRail
            | PlayerObjective::ConfirmBuild
            | PlayerObjective::Idle => PlayerAction::ConfirmBuild,
        }
    }

    /// A random pair of distinct cities not driven before.
    fn choose_random_cities(&mut self) -> Option<(TilePosition, TilePosition)> {
        let pairs = self.unused_city_pairs();
        if pairs.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..pairs.len());
        Some(pairs[index])
    }

    fn unused_city_pairs(&self) -> Vec<(TilePosition, TilePosition)> {
        let cities: Vec<TilePosition> = self
            .state
            .grid()
            .cities()
            .map(|city| city.position)
            .collect();
        let mut pairs = Vec::new();
        for (i, &start) in cities.iter().enumerate() {
            for &target in &cities[i + 1..] {
                if !self.state.city_pair_used(start, target) {
                    pairs.push((start, target));
                }
            }
        }
        pairs
    }

    // --- action application ------------------------------------------------

    fn apply_action(&mut self, player: PlayerId, action: &PlayerAction) -> Result<(), InvalidAction> {
        let objective = self.controllers[player].objective();
        if !objective.allows(action.kind()) {
            return Err(InvalidAction::WrongObjective {
                objective,
                kind: action.kind(),
            });
        }
        match action {
            PlayerAction::BuildRail { edge } => self.apply_build(player, *edge),
            PlayerAction::ConfirmBuild => Ok(()),
            PlayerAction::ChooseCities { start, target } => {
                self.apply_choose_cities(*start, *target)
            }
            PlayerAction::ChoosePath { edges } => self.apply_choose_path(player, edges),
            PlayerAction::ConfirmPath => {
                let enrolled = !self.controllers[player].pending_path().is_empty();
                self.controllers[player].confirm_path();
                if enrolled {
                    self.state.enroll_driving_player(player);
                }
                Ok(())
            }
            PlayerAction::RollDice => {
                self.cast_dice();
                Ok(())
            }
            PlayerAction::Drive => self.apply_drive(player),
        }
    }

    fn apply_build(&mut self, player: PlayerId, edge: EdgeKey) -> Result<(), InvalidAction> {
        let cost = total_building_cost(self.state.grid(), self.state.config(), edge, player)
            .map_err(|_| InvalidAction::Uncostable)?;
        let budget = self.controllers[player].building_budget();
        if cost > budget {
            return Err(InvalidAction::InsufficientBudget { cost, budget });
        }
        let payouts = parallel_cost_per_player(self.state.grid(), edge, player);
        if !self.state.grid_mut().add_rail(edge, player) {
            return Err(InvalidAction::InvalidRailPlacement);
        }
        self.controllers[player].spend_building_budget(cost);
        for (owner, amount) in payouts {
            self.state.player_mut(owner).add_credits(amount);
        }
        debug!(player, ?edge, cost, "rail built");
        Ok(())
    }

    fn apply_choose_cities(
        &mut self,
        start: TilePosition,
        target: TilePosition,
    ) -> Result<(), InvalidAction> {
        if self.state.grid().city_at(start).is_none() {
            return Err(InvalidAction::NotACity { position: start });
        }
        if self.state.grid().city_at(target).is_none() {
            return Err(InvalidAction::NotACity { position: target });
        }
        if start == target {
            return Err(InvalidAction::SameCityTwice);
        }
        if self.state.city_pair_used(start, target) {
            return Err(InvalidAction::CityPairAlreadyUsed);
        }
        self.state.set_chosen_cities(start, target);
        info!(?start, ?target, "cities chosen");
        Ok(())
    }

    /// An empty path is an explicit abstention: the player sits this race
    /// out. A non-empty path must run contiguously over railed edges from
    /// the start city to the target city.
    fn apply_choose_path(
        &mut self,
        player: PlayerId,
        edges: &[EdgeKey],
    ) -> Result<(), InvalidAction> {
        if edges.is_empty() {
            self.controllers[player].set_pending_path(Vec::new());
            return Ok(());
        }
        let Some((start, target)) = self.state.chosen_cities() else {
            return Err(InvalidAction::PathOffRoute);
        };
        let grid = self.state.grid();
        let mut cursor = start;
        for &key in edges {
            let Some(edge) = grid.edge(key) else {
                return Err(InvalidAction::PathWithoutRail);
            };
            if !edge.has_rail() {
                return Err(InvalidAction::PathWithoutRail);
            }
            let Some(next) = key.other_endpoint(cursor) else {
                return Err(InvalidAction::DisconnectedPath);
            };
            cursor = next;
        }
        if cursor != target {
            return Err(InvalidAction::PathOffRoute);
        }
        self.controllers[player].set_pending_path(edges.to_vec());
        Ok(())
    }

    /// Moves the player along their confirmed route for up to
    /// `dice + surplus` movement points, paying rent per traversed edge.
    /// The unspent remainder becomes the new surplus.
    fn apply_drive(&mut self, player: PlayerId) -> Result<(), InvalidAction> {
        if !self.state.driving_players().contains(&player) {
            return Err(InvalidAction::NotDriving);
        }
        let Some((_, target)) = self.state.chosen_cities() else {
            return Err(InvalidAction::NotDriving);
        };
        let Some(mut position) = self.state.player_position(player) else {
            return Err(InvalidAction::NotDriving);
        };

        let mut points = self.state.current_dice_roll() as i64 + self.state.player_surplus(player);
        while position != target {
            let Some(edge) = self.controllers[player].next_path_edge() else {
                break;
            };
            let Ok(cost) = driving_cost(self.state.grid(), self.state.config(), edge, position)
            else {
                break;
            };
            if i64::from(cost) > points {
                break;
            }
            let rent = renting_cost(self.state.grid(), edge, player);
            let rent_total: u32 = rent.values().sum();
            // The mover stops where the rent can no longer be paid.
            if self.state.player_mut(player).spend_credits(rent_total).is_err() {
                break;
            }
            for (owner, amount) in rent {
                self.state.player_mut(owner).add_credits(amount);
            }
            let Some(next) = edge.other_endpoint(position) else {
                break;
            };
            points -= i64::from(cost);
            position = next;
            self.controllers[player].advance_path();
        }

        self.state.set_player_position(player, position);
        self.state.set_player_surplus(player, points);
        if position == target {
            debug!(player, "reached the target city");
        }
        Ok(())
    }

    // --- building phase ----------------------------------------------------

    /// Rounds of dice-funded building until at most the configured number of
    /// cities is still unconnected.
    fn execute_building_phase(&mut self) -> Result<(), GameError> {
        let threshold = self.state.config().unconnected_cities_start_threshold;
        let seats = self.state.players().len();
        while self.state.unconnected_city_count() > threshold {
            let round = self.state.round_counter() + 1;
            self.state.set_round_counter(round);
            let starter = ((round - 1) as usize) % seats;
            let roll = self.cast_dice();
            let budget = roll * self.state.config().building_budget_multiplier;
            debug!(round, starter, roll, budget, "building round");
            for offset in 0..seats {
                let player = (starter + offset) % seats;
                self.controllers[player].set_building_budget(budget);
                self.wait_for_build(player)?;
            }
        }
        Ok(())
    }

    /// Keeps the player at PLACE_RAIL until a confirm arrives.
    fn wait_for_build(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.with_active_player(player, |this| {
            let mut action =
                this.wait_for_next_action(player, Some(PlayerObjective::PlaceRail))?;
            while action.kind() != ActionKind::ConfirmBuild {
                action = this.wait_for_next_action(player, None)?;
            }
            Ok(())
        })
    }

    // --- driving phase -----------------------------------------------------

    fn execute_driving_phase(&mut self) -> Result<(), GameError> {
        let total_cities = self.state.grid().city_count();
        let seats = self.state.players().len();
        while self.state.chosen_city_history().len() < total_cities {
            if self.unused_city_pairs().is_empty() {
                debug!("no unused city pairs left; ending driving phase early");
                break;
            }
            let round = self.state.round_counter() + 1;
            self.state.set_round_counter(round);
            self.state.reset_driving_players();
            self.state.reset_player_positions();
            self.state.reset_player_surplus();

            if round % 3 == 0 {
                self.building_during_driving_phase()?;
            }

            let chooser = ((round - 1) as usize) % seats;
            self.with_active_player(chooser, |this| {
                this.wait_for_next_action(chooser, Some(PlayerObjective::ChooseCities))
                    .map(|_| ())
            })?;

            self.let_players_choose_path()?;
            self.handle_driving()?;

            let winners = self.round_winners();
            let payouts = self.state.config().winning_credits.clone();
            for (rank, &player) in winners.iter().enumerate() {
                let amount = payouts[rank];
                self.state.player_mut(player).add_credits(amount);
                info!(player, rank, amount, "round payout");
            }
        }
        Ok(())
    }

    /// The every-third-round build window: poorest player first, fixed
    /// budget for everyone.
    fn building_during_driving_phase(&mut self) -> Result<(), GameError> {
        let budget = self.state.config().max_building_budget_driving_phase;
        let order: Vec<PlayerId> = (0..self.state.players().len())
            .sorted_by_key(|&player| (self.state.players()[player].credits(), player))
            .collect();
        for player in order {
            self.controllers[player].set_building_budget(budget);
            self.wait_for_build(player)?;
        }
        Ok(())
    }

    /// Pure path collection: richest player first, everyone is placed on
    /// the start city and asked for a route, confirming enrolls them.
    fn let_players_choose_path(&mut self) -> Result<(), GameError> {
        let Some((start, _)) = self.state.chosen_cities() else {
            return Ok(());
        };
        let order: Vec<PlayerId> = (0..self.state.players().len())
            .sorted_by_key(|&player| {
                (
                    std::cmp::Reverse(self.state.players()[player].credits()),
                    player,
                )
            })
            .collect();
        for player in order {
            self.controllers[player].reset_route();
            self.state.set_player_position(player, start);
            self.with_active_player(player, |this| {
                this.wait_for_next_action(player, Some(PlayerObjective::ChoosePath))?;
                this.wait_for_next_action(player, Some(PlayerObjective::ConfirmPath))?;
                Ok(())
            })?;
        }
        Ok(())
    }

    /// The race itself. A single enrolled player travels for free. With
    /// more, rounds of ROLL_DICE/DRIVE run until enough players finished,
    /// everyone finished, or the stragglers can no longer move.
    fn handle_driving(&mut self) -> Result<(), GameError> {
        let Some((_, target)) = self.state.chosen_cities() else {
            return Ok(());
        };
        let roster: Vec<PlayerId> = self.state.driving_players().iter().copied().collect();
        if roster.is_empty() {
            return Ok(());
        }
        if roster.len() == 1 {
            self.state.set_player_position(roster[0], target);
            return Ok(());
        }

        let max_finishers = self.state.config().winning_credits.len();
        let penalty = i64::from(self.state.config().dice_sides);
        let mut rounds = 0u32;
        loop {
            let finishers = roster
                .iter()
                .filter(|&&player| self.state.player_position(player) == Some(target))
                .count();
            if finishers >= max_finishers || finishers == roster.len() {
                break;
            }
            rounds += 1;
            if rounds > DRIVING_ROUNDS_LIMIT {
                warn!("driving round limit reached; ending race");
                break;
            }

            // Once somebody is home, every straggler loses a full dice roll
            // of surplus at the top of the round.
            if finishers > 0 {
                for &player in &roster {
                    if self.state.player_position(player) != Some(target) {
                        self.state.add_player_point_surplus(player, -penalty);
                    }
                }
            }

            let order: Vec<PlayerId> = roster
                .iter()
                .copied()
                .sorted_by_key(|&player| {
                    (
                        std::cmp::Reverse(self.state.players()[player].credits()),
                        player,
                    )
                })
                .collect();
            let mut progressed = false;
            for player in order {
                if self.state.player_position(player) == Some(target) {
                    continue;
                }
                let before = self.state.player_position(player);
                self.with_active_player(player, |this| {
                    this.wait_for_next_action(player, Some(PlayerObjective::RollDice))?;
                    this.wait_for_next_action(player, Some(PlayerObjective::Drive))?;
                    Ok(())
                })?;
                if self.state.player_position(player) != before {
                    progressed = true;
                }
            }

            // With the round-top penalty in place a straggler's movement
            // points can never grow again; a pass without movement means the
            // race is decided.
            if finishers > 0 && !progressed {
                break;
            }
        }
        Ok(())
    }

    /// Finishers ranked by surplus, capped at the payout list length.
    fn round_winners(&self) -> Vec<PlayerId> {
        let Some((_, target)) = self.state.chosen_cities() else {
            return Vec::new();
        };
        let mut finishers: Vec<PlayerId> = self
            .state
            .driving_players()
            .iter()
            .copied()
            .filter(|&player| self.state.player_position(player) == Some(target))
            .collect();
        finishers.sort_by_key(|&player| std::cmp::Reverse(self.state.player_surplus(player)));
        finishers.truncate(self.state.config().winning_credits.len());
        finishers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{City, HexGrid, Tile};
    use crate::game::config::GameConfig;
    use crate::game::player::Player;
    use crate::types::Terrain;

    fn plain(q: i32, r: i32) -> Tile {
        Tile {
            position: TilePosition::new(q, r),
            terrain: Terrain::Plain,
        }
    }

    fn city(name: &str, q: i32, r: i32) -> City {
        City {
            name: name.to_string(),
            position: TilePosition::new(q, r),
            is_starting_city: true,
        }
    }

    fn linear_grid(length: i32) -> HexGrid {
        let tiles = (0..length).map(|q| plain(q, 0)).collect();
        HexGrid::from_parts(
            tiles,
            vec![city("Aachen", 0, 0), city("Cottbus", length - 1, 0)],
        )
        .expect("valid grid")
    }

    fn ai_players(count: usize) -> Vec<Player> {
        (0..count)
            .map(|i| Player::ai(format!("Bot {i}"), "RANDOM"))
            .collect()
    }

    fn edge(q1: i32, q2: i32) -> EdgeKey {
        EdgeKey::new(TilePosition::new(q1, 0), TilePosition::new(q2, 0))
    }

    /// Dice that first plays out a scripted prefix, then repeats the last
    /// value.
    fn scripted_dice(rolls: Vec<u32>) -> impl FnMut() -> u32 + Send {
        let mut queue = std::collections::VecDeque::from(rolls);
        move || {
            if queue.len() > 1 {
                queue.pop_front().unwrap_or(1)
            } else {
                queue.front().copied().unwrap_or(1)
            }
        }
    }

    #[test]
    fn refuses_to_start_without_enough_players() {
        let state = GameState::new(GameConfig::default(), linear_grid(3), ai_players(1));
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::new(state, &registry);
        assert!(matches!(
            engine.start(),
            Err(GameError::NotEnoughPlayers { required: 2, actual: 1 })
        ));
    }

    #[test]
    fn stop_flag_unwinds_at_the_next_active_player() {
        let state = GameState::new(GameConfig::default(), linear_grid(3), ai_players(2));
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::new(state, &registry);
        engine.stop_handle().stop();
        assert!(matches!(engine.start(), Err(GameError::EngineStopped)));
        assert!(engine.state().winner().is_none());
    }

    #[test]
    fn building_round_with_fixed_dice_connects_the_linear_map() {
        // Two players, three tiles in a row, a starting city at each end,
        // dice fixed to six: one building round suffices and the phase
        // exits with every city connected.
        let state = GameState::new(GameConfig::default(), linear_grid(3), ai_players(2));
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::with_dice(state, &registry, || 6);
        engine.state.set_phase(GamePhase::Building);
        engine.execute_building_phase().expect("phase runs");
        assert_eq!(engine.state().round_counter(), 1);
        assert_eq!(engine.state().unconnected_city_count(), 0);
        for key in [edge(0, 1), edge(1, 2)] {
            assert!(engine.state().grid().edge(key).expect("edge").has_rail());
        }
    }

    #[test]
    fn duplicate_city_pair_is_rejected() {
        let mut state = GameState::new(GameConfig::default(), linear_grid(3), ai_players(2));
        let a = TilePosition::new(0, 0);
        let b = TilePosition::new(2, 0);
        state.set_chosen_cities(a, b);
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::new(state, &registry);
        assert_eq!(
            engine.apply_choose_cities(b, a),
            Err(InvalidAction::CityPairAlreadyUsed)
        );
        assert_eq!(
            engine.apply_choose_cities(a, a),
            Err(InvalidAction::SameCityTwice)
        );
    }

    #[test]
    fn build_action_debits_budget_and_pays_parallel_owners() {
        let mut state = GameState::new(GameConfig::default(), linear_grid(3), ai_players(2));
        assert!(state.grid_mut().add_rail(edge(0, 1), 0));
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::new(state, &registry);

        engine.controllers[1].set_objective(PlayerObjective::PlaceRail);
        engine.controllers[1].set_building_budget(10);
        // Parallel build next to the city: base 1 + surcharge 3 to player 0.
        engine
            .apply_action(1, &PlayerAction::BuildRail { edge: edge(0, 1) })
            .expect("valid build");
        assert_eq!(engine.controllers[1].building_budget(), 6);
        assert_eq!(engine.state().players()[0].credits(), 3);

        engine.controllers[1].set_building_budget(0);
        assert!(matches!(
            engine.apply_action(1, &PlayerAction::BuildRail { edge: edge(1, 2) }),
            Err(InvalidAction::InsufficientBudget { .. })
        ));
    }

    #[test]
    fn straggler_surplus_is_cut_by_dice_sides_after_a_finish() {
        // Five tiles, rails all the way, both players race. Player 0 rolls
        // a six and finishes; player 1 rolls ones, so the next round's
        // penalty leaves a visibly negative surplus.
        let mut state = GameState::new(GameConfig::default(), linear_grid(5), ai_players(2));
        for key in [edge(0, 1), edge(1, 2), edge(2, 3), edge(3, 4)] {
            assert!(state.grid_mut().add_rail(key, 0));
        }
        state.set_chosen_cities(TilePosition::new(0, 0), TilePosition::new(4, 0));
        let registry = PolicyRegistry::with_builtins();
        let mut engine =
            GameController::with_dice(state, &registry, scripted_dice(vec![6, 1, 1]));

        let path = vec![edge(0, 1), edge(1, 2), edge(2, 3), edge(3, 4)];
        for player in 0..2 {
            engine.controllers[player].set_pending_path(path.clone());
            engine.controllers[player].confirm_path();
            engine.state.enroll_driving_player(player);
            engine
                .state
                .set_player_position(player, TilePosition::new(0, 0));
        }
        // Equal credits keep the race in seat order; player 1 can afford the
        // rent for player 0's track.
        engine.state.player_mut(0).add_credits(2);
        engine.state.player_mut(1).add_credits(2);

        engine.handle_driving().expect("race runs");

        assert_eq!(
            engine.state().player_position(0),
            Some(TilePosition::new(4, 0))
        );
        // Round one: roll 1 moves a single edge (rent 1 to player 0).
        // Round two: penalty -6, roll 1, no movement, surplus stays -5.
        assert_eq!(
            engine.state().player_position(1),
            Some(TilePosition::new(1, 0))
        );
        assert_eq!(engine.state().player_surplus(1), -5);
    }

    #[test]
    fn round_winners_rank_by_surplus_and_cap_at_payouts() {
        // Finishers A(surplus 4) and B(surplus 7), C did not finish,
        // payouts of length two: the ranking is [B, A], C gets nothing.
        let mut config = GameConfig::default();
        config.winning_credits = vec![3, 1];
        let mut state = GameState::new(config, linear_grid(3), ai_players(3));
        let target = TilePosition::new(2, 0);
        state.set_chosen_cities(TilePosition::new(0, 0), target);
        for player in 0..3 {
            state.enroll_driving_player(player);
        }
        state.set_player_position(0, target);
        state.set_player_surplus(0, 4);
        state.set_player_position(1, target);
        state.set_player_surplus(1, 7);
        state.set_player_position(2, TilePosition::new(1, 0));
        state.set_player_surplus(2, 11);

        let registry = PolicyRegistry::with_builtins();
        let engine = GameController::new(state, &registry);
        assert_eq!(engine.round_winners(), vec![1, 0]);
    }

    #[test]
    fn winner_is_richest_with_seat_order_tie_break() {
        let mut state = GameState::new(GameConfig::default(), linear_grid(3), ai_players(3));
        state.player_mut(1).add_credits(9);
        state.player_mut(2).add_credits(9);
        let registry = PolicyRegistry::with_builtins();
        let engine = GameController::new(state, &registry);
        assert_eq!(engine.determine_winner(), 1);
    }

    #[test]
    fn lone_driver_is_teleported_to_the_target() {
        let mut state = GameState::new(GameConfig::default(), linear_grid(3), ai_players(2));
        for key in [edge(0, 1), edge(1, 2)] {
            assert!(state.grid_mut().add_rail(key, 0));
        }
        state.set_chosen_cities(TilePosition::new(0, 0), TilePosition::new(2, 0));
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::new(state, &registry);
        engine.controllers[0].set_pending_path(vec![edge(0, 1), edge(1, 2)]);
        engine.controllers[0].confirm_path();
        engine.state.enroll_driving_player(0);
        engine
            .state
            .set_player_position(0, TilePosition::new(0, 0));
        engine.handle_driving().expect("race runs");
        assert_eq!(
            engine.state().player_position(0),
            Some(TilePosition::new(2, 0))
        );
    }

    #[test]
    fn degraded_ai_player_idles_instead_of_failing() {
        let players = vec![
            Player::ai("Bot", "RANDOM"),
            Player::ai("Ghost", "NO_SUCH_POLICY"),
        ];
        let state = GameState::new(GameConfig::default(), linear_grid(3), players);
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::with_dice(state, &registry, || 6);
        assert!(engine.degraded.contains(&1));
        engine.state.set_phase(GamePhase::Building);
        engine.execute_building_phase().expect("phase runs");
        // The degraded seat built nothing; the healthy bot connected the map.
        assert!(engine.state().grid().rails(1).is_empty());
        assert_eq!(engine.state().unconnected_city_count(), 0);
    }

    #[test]
    fn full_game_reaches_finished_with_a_full_history() {
        // Three cities give three drivable pairs, enough for the history to
        // reach the city count.
        let tiles = (0..5).map(|q| plain(q, 0)).collect();
        let grid = HexGrid::from_parts(
            tiles,
            vec![
                city("Aachen", 0, 0),
                city("Bremen", 2, 0),
                city("Cottbus", 4, 0),
            ],
        )
        .expect("valid grid");
        let state = GameState::new(GameConfig::default(), grid, ai_players(2));
        let registry = PolicyRegistry::with_builtins();
        let mut engine = GameController::new(state, &registry);
        let winner = engine.start().expect("game completes");
        assert_eq!(engine.state().phase(), GamePhase::Finished);
        assert_eq!(engine.state().winner(), Some(winner));
        assert_eq!(
            engine.state().chosen_city_history().len(),
            engine.state().grid().city_count()
        );
        // The winner holds the credit maximum.
        let best = engine
            .state()
            .players()
            .iter()
            .map(|p| p.credits())
            .max()
            .unwrap_or(0);
        assert_eq!(engine.state().players()[winner].credits(), best);
    }
}
