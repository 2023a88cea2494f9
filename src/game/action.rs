use serde::{Deserialize, Serialize};

use crate::board::EdgeKey;
use crate::coords::TilePosition;
use crate::types::ActionKind;

/// A value object submitted by a player controller in response to an
/// objective. The engine validates every action before applying it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayerAction {
    BuildRail {
        edge: EdgeKey,
    },
    ConfirmBuild,
    ChooseCities {
        start: TilePosition,
        target: TilePosition,
    },
    ChoosePath {
        edges: Vec<EdgeKey>,
    },
    ConfirmPath,
    RollDice,
    Drive,
}

impl PlayerAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlayerAction::BuildRail { .. } => ActionKind::BuildRail,
            PlayerAction::ConfirmBuild => ActionKind::ConfirmBuild,
            PlayerAction::ChooseCities { .. } => ActionKind::ChooseCities,
            PlayerAction::ChoosePath { .. } => ActionKind::ChoosePath,
            PlayerAction::ConfirmPath => ActionKind::ConfirmPath,
            PlayerAction::RollDice => ActionKind::RollDice,
            PlayerAction::Drive => ActionKind::Drive,
        }
    }
}
