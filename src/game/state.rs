use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::board::cost::CostError;
use crate::board::HexGrid;
use crate::coords::TilePosition;
use crate::game::config::GameConfig;
use crate::game::player::Player;
use crate::observe::Property;
use crate::types::{ActionKind, GamePhase, PlayerId, PlayerObjective};

/// Fatal engine errors. Invalid actions are handled locally by the engine
/// (reject and re-prompt) and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("not enough players: need {required}, have {actual}")]
    NotEnoughPlayers { required: usize, actual: usize },
    #[error("engine was stopped")]
    EngineStopped,
    #[error("player mailbox disconnected")]
    ControllerDisconnected,
    #[error(transparent)]
    Cost(#[from] CostError),
    #[error(transparent)]
    Grid(#[from] crate::board::GridError),
}

/// Rejection reasons for submitted actions. Non-fatal: the engine logs the
/// rejection and re-prompts the controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAction {
    #[error("action {kind} does not match objective {objective}")]
    WrongObjective {
        objective: PlayerObjective,
        kind: ActionKind,
    },
    #[error("building cost {cost} exceeds remaining budget {budget}")]
    InsufficientBudget { cost: u32, budget: u32 },
    #[error("rail placement violates the seed or contiguity rules")]
    InvalidRailPlacement,
    #[error("no cost entry for this edge")]
    Uncostable,
    #[error("position ({q},{r}) is not a city", q = .position.q, r = .position.r)]
    NotACity { position: TilePosition },
    #[error("start and target city must differ")]
    SameCityTwice,
    #[error("this city pair was already driven")]
    CityPairAlreadyUsed,
    #[error("path edge has no rail to drive on")]
    PathWithoutRail,
    #[error("path edges are not contiguous")]
    DisconnectedPath,
    #[error("path does not run from the start city to the target city")]
    PathOffRoute,
    #[error("player is not enrolled in the driving roster")]
    NotDriving,
}

/// The mutable game record. The grid topology inside is immutable after
/// construction; rails, credits, positions and surplus are the mutable
/// overlays. Observable fields are published as [`Property`] handles so UI
/// collaborators subscribe instead of polling.
#[derive(Debug)]
pub struct GameState {
    config: GameConfig,
    grid: HexGrid,
    players: Vec<Player>,
    phase: Property<GamePhase>,
    round_counter: Property<u32>,
    current_dice_roll: Property<u32>,
    chosen_cities: Property<Option<(TilePosition, TilePosition)>>,
    winner: Property<Option<PlayerId>>,
    chosen_city_history: Vec<(TilePosition, TilePosition)>,
    player_positions: BTreeMap<PlayerId, TilePosition>,
    driving_players: BTreeSet<PlayerId>,
    player_surplus: BTreeMap<PlayerId, i64>,
}

impl GameState {
    pub fn new(config: GameConfig, grid: HexGrid, players: Vec<Player>) -> Self {
        Self {
            config,
            grid,
            players,
            phase: Property::new(GamePhase::Building),
            round_counter: Property::new(0),
            current_dice_roll: Property::new(0),
            chosen_cities: Property::new(None),
            winner: Property::new(None),
            chosen_city_history: Vec::new(),
            player_positions: BTreeMap::new(),
            driving_players: BTreeSet::new(),
            player_surplus: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut HexGrid {
        &mut self.grid
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub(crate) fn player_mut(&mut self, player: PlayerId) -> &mut Player {
        &mut self.players[player]
    }

    pub fn phase(&self) -> GamePhase {
        self.phase.get()
    }

    pub fn phase_property(&self) -> Property<GamePhase> {
        self.phase.clone()
    }

    pub fn set_phase(&self, phase: GamePhase) {
        self.phase.set(phase);
    }

    pub fn round_counter(&self) -> u32 {
        self.round_counter.get()
    }

    pub fn round_counter_property(&self) -> Property<u32> {
        self.round_counter.clone()
    }

    pub(crate) fn set_round_counter(&self, round: u32) {
        self.round_counter.set(round);
    }

    pub fn current_dice_roll(&self) -> u32 {
        self.current_dice_roll.get()
    }

    pub fn current_dice_roll_property(&self) -> Property<u32> {
        self.current_dice_roll.clone()
    }

    pub(crate) fn set_current_dice_roll(&self, roll: u32) {
        self.current_dice_roll.set(roll);
    }

    pub fn chosen_cities(&self) -> Option<(TilePosition, TilePosition)> {
        self.chosen_cities.get()
    }

    pub fn chosen_cities_property(&self) -> Property<Option<(TilePosition, TilePosition)>> {
        self.chosen_cities.clone()
    }

    /// Publishes the round's start/target pair and records it in the
    /// history that drives driving-phase termination.
    pub fn set_chosen_cities(&mut self, start: TilePosition, target: TilePosition) {
        self.chosen_cities.set(Some((start, target)));
        self.chosen_city_history.push((start, target));
    }

    pub fn chosen_city_history(&self) -> &[(TilePosition, TilePosition)] {
        &self.chosen_city_history
    }

    /// A pair counts as used in either orientation.
    pub fn city_pair_used(&self, start: TilePosition, target: TilePosition) -> bool {
        self.chosen_city_history
            .iter()
            .any(|&(a, b)| (a == start && b == target) || (a == target && b == start))
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner.get()
    }

    pub fn winner_property(&self) -> Property<Option<PlayerId>> {
        self.winner.clone()
    }

    pub fn set_winner(&self, winner: PlayerId) {
        self.winner.set(Some(winner));
    }

    pub fn player_position(&self, player: PlayerId) -> Option<TilePosition> {
        self.player_positions.get(&player).copied()
    }

    pub fn player_positions(&self) -> &BTreeMap<PlayerId, TilePosition> {
        &self.player_positions
    }

    pub fn set_player_position(&mut self, player: PlayerId, position: TilePosition) {
        self.player_positions.insert(player, position);
    }

    pub fn driving_players(&self) -> &BTreeSet<PlayerId> {
        &self.driving_players
    }

    pub(crate) fn enroll_driving_player(&mut self, player: PlayerId) {
        self.driving_players.insert(player);
    }

    pub fn player_surplus(&self, player: PlayerId) -> i64 {
        self.player_surplus.get(&player).copied().unwrap_or(0)
    }

    pub fn add_player_point_surplus(&mut self, player: PlayerId, delta: i64) {
        *self.player_surplus.entry(player).or_insert(0) += delta;
    }

    pub(crate) fn set_player_surplus(&mut self, player: PlayerId, surplus: i64) {
        self.player_surplus.insert(player, surplus);
    }

    pub fn reset_driving_players(&mut self) {
        self.driving_players.clear();
    }

    pub fn reset_player_positions(&mut self) {
        self.player_positions.clear();
    }

    pub fn reset_player_surplus(&mut self) {
        self.player_surplus.clear();
    }

    pub fn unconnected_city_count(&self) -> usize {
        self.grid.unconnected_cities().len()
    }

    /// Serializable snapshot of every observable field.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            config: self.config.clone(),
            grid: self.grid.clone(),
            players: self.players.clone(),
            phase: self.phase.get(),
            round_counter: self.round_counter.get(),
            current_dice_roll: self.current_dice_roll.get(),
            chosen_cities: self.chosen_cities.get(),
            winner: self.winner.get(),
            chosen_city_history: self.chosen_city_history.clone(),
            player_positions: self.player_positions.clone(),
            driving_players: self.driving_players.clone(),
            player_surplus: self.player_surplus.clone(),
        }
    }

    pub fn restore(snapshot: GameSnapshot) -> Self {
        Self {
            config: snapshot.config,
            grid: snapshot.grid,
            players: snapshot.players,
            phase: Property::new(snapshot.phase),
            round_counter: Property::new(snapshot.round_counter),
            current_dice_roll: Property::new(snapshot.current_dice_roll),
            chosen_cities: Property::new(snapshot.chosen_cities),
            winner: Property::new(snapshot.winner),
            chosen_city_history: snapshot.chosen_city_history,
            player_positions: snapshot.player_positions,
            driving_players: snapshot.driving_players,
            player_surplus: snapshot.player_surplus,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub config: GameConfig,
    pub grid: HexGrid,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub round_counter: u32,
    pub current_dice_roll: u32,
    pub chosen_cities: Option<(TilePosition, TilePosition)>,
    pub winner: Option<PlayerId>,
    pub chosen_city_history: Vec<(TilePosition, TilePosition)>,
    pub player_positions: BTreeMap<PlayerId, TilePosition>,
    pub driving_players: BTreeSet<PlayerId>,
    pub player_surplus: BTreeMap<PlayerId, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{City, Tile};
    use crate::types::Terrain;

    fn small_state() -> GameState {
        let grid = HexGrid::from_parts(
            vec![
                Tile {
                    position: TilePosition::new(0, 0),
                    terrain: Terrain::Plain,
                },
                Tile {
                    position: TilePosition::new(1, 0),
                    terrain: Terrain::Mountain,
                },
            ],
            vec![
                City {
                    name: "Aachen".to_string(),
                    position: TilePosition::new(0, 0),
                    is_starting_city: true,
                },
                City {
                    name: "Bremen".to_string(),
                    position: TilePosition::new(1, 0),
                    is_starting_city: false,
                },
            ],
        )
        .expect("valid grid");
        GameState::new(
            GameConfig::default(),
            grid,
            vec![Player::human("Ada"), Player::ai("Bot", "RANDOM")],
        )
    }

    #[test]
    fn chosen_pair_is_used_in_both_orientations() {
        let mut state = small_state();
        let a = TilePosition::new(0, 0);
        let b = TilePosition::new(1, 0);
        assert!(!state.city_pair_used(a, b));
        state.set_chosen_cities(a, b);
        assert!(state.city_pair_used(a, b));
        assert!(state.city_pair_used(b, a));
    }

    #[test]
    fn driving_round_resets_clear_overlays() {
        let mut state = small_state();
        state.set_player_position(0, TilePosition::new(1, 0));
        state.enroll_driving_player(0);
        state.add_player_point_surplus(0, 4);
        state.reset_player_positions();
        state.reset_driving_players();
        state.reset_player_surplus();
        assert!(state.player_positions().is_empty());
        assert!(state.driving_players().is_empty());
        assert_eq!(state.player_surplus(0), 0);
    }

    #[test]
    fn surplus_may_go_negative() {
        let mut state = small_state();
        state.add_player_point_surplus(1, 2);
        state.add_player_point_surplus(1, -6);
        assert_eq!(state.player_surplus(1), -4);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut state = small_state();
        state.set_phase(GamePhase::Driving);
        state.set_round_counter(3);
        state.set_current_dice_roll(5);
        state.set_chosen_cities(TilePosition::new(0, 0), TilePosition::new(1, 0));
        state.set_player_position(0, TilePosition::new(1, 0));
        state.enroll_driving_player(0);
        state.add_player_point_surplus(0, 2);
        state.set_winner(1);

        let json = serde_json::to_string(&state.snapshot()).expect("serializes");
        let restored = GameState::restore(serde_json::from_str(&json).expect("parses"));

        assert_eq!(restored.phase(), GamePhase::Driving);
        assert_eq!(restored.round_counter(), 3);
        assert_eq!(restored.current_dice_roll(), 5);
        assert_eq!(
            restored.chosen_cities(),
            Some((TilePosition::new(0, 0), TilePosition::new(1, 0)))
        );
        assert_eq!(restored.winner(), Some(1));
        assert_eq!(restored.player_position(0), Some(TilePosition::new(1, 0)));
        assert_eq!(restored.player_surplus(0), 2);
        assert_eq!(restored.chosen_city_history().len(), 1);
        assert_eq!(restored.players().len(), 2);
    }
}
