pub mod action;
pub mod config;
pub mod controller;
pub mod player;
pub mod state;

pub use action::PlayerAction;
pub use config::{BuildingCostTable, DrivingCostTable, GameConfig};
pub use controller::{GameController, StopHandle};
pub use player::Player;
pub use state::{GameError, GameSnapshot, GameState, InvalidAction};
