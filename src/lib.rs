#![warn(clippy::all)]
#![deny(rust_2018_idioms)]

pub mod board;
pub mod cli;
pub mod coords;
pub mod game;
pub mod leaderboard;
pub mod observe;
pub mod players;
pub mod types;

pub use board::{City, Edge, EdgeKey, HexGrid, Tile};
pub use coords::{EdgeDirection, TilePosition};
pub use game::{GameConfig, GameController, GameState, Player, PlayerAction};
pub use observe::Property;
pub use players::{PlayerHandle, PolicyRegistry, RailPolicy};
pub use types::{GamePhase, PlayerId, PlayerObjective, Terrain};
