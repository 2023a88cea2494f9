use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Index of a player in the game state's seat order.
pub type PlayerId = usize;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Terrain {
    Plain,
    Mountain,
}

impl Terrain {
    pub const ALL: [Terrain; 2] = [Terrain::Plain, Terrain::Mountain];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Building,
    Driving,
    Finished,
}

/// The prompt the engine hands to a player controller. It constrains which
/// action kinds the controller may submit next.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerObjective {
    Idle,
    PlaceRail,
    ConfirmBuild,
    ChooseCities,
    ChoosePath,
    ConfirmPath,
    RollDice,
    Drive,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    BuildRail,
    ConfirmBuild,
    ChooseCities,
    ChoosePath,
    ConfirmPath,
    RollDice,
    Drive,
}

impl PlayerObjective {
    /// The action kinds a controller may submit while this objective is set.
    pub fn allowed_actions(self) -> &'static [ActionKind] {
        match self {
            PlayerObjective::Idle => &[],
            PlayerObjective::PlaceRail => &[ActionKind::BuildRail, ActionKind::ConfirmBuild],
            PlayerObjective::ConfirmBuild => &[ActionKind::ConfirmBuild],
            PlayerObjective::ChooseCities => &[ActionKind::ChooseCities],
            PlayerObjective::ChoosePath => &[ActionKind::ChoosePath],
            PlayerObjective::ConfirmPath => &[ActionKind::ConfirmPath],
            PlayerObjective::RollDice => &[ActionKind::RollDice],
            PlayerObjective::Drive => &[ActionKind::Drive],
        }
    }

    pub fn allows(self, kind: ActionKind) -> bool {
        self.allowed_actions().contains(&kind)
    }
}
