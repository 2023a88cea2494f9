use std::collections::HashMap;

use crate::board::EdgeKey;
use crate::game::action::PlayerAction;
use crate::game::state::GameState;
use crate::types::{PlayerId, PlayerObjective};

/// Read view handed to a policy when its controller becomes active.
pub struct PolicyContext<'a> {
    pub player: PlayerId,
    pub state: &'a GameState,
    /// Remaining building budget of the current build window.
    pub building_budget: u32,
    /// Path chosen earlier in this round, empty before `CHOOSE_PATH`.
    pub pending_path: &'a [EdgeKey],
}

/// An AI strategy. Policies run cooperatively on the engine thread: the
/// engine invites the policy to produce an action whenever its player's
/// controller becomes active with a fresh objective.
pub trait RailPolicy: Send {
    fn decide(&mut self, objective: PlayerObjective, ctx: &PolicyContext<'_>) -> PlayerAction;
}

/// Factory for a policy, given the seat it plays and a per-seat RNG seed.
pub type PolicyFactory = fn(PlayerId, u64) -> Box<dyn RailPolicy>;

/// Name-keyed policy construction. Players declare a policy name; the
/// engine resolves it here at startup. An unknown name degrades that player
/// to an idle seat instead of failing the game.
pub struct PolicyRegistry {
    factories: HashMap<String, PolicyFactory>,
}

impl PolicyRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("RANDOM", |player, seed| {
            Box::new(crate::players::RandomPolicy::new(player, seed))
        });
        registry.register("GREEDY", |player, seed| {
            Box::new(crate::players::GreedyPolicy::new(player, seed))
        });
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: PolicyFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn create(&self, name: &str, player: PlayerId, seed: u64) -> Option<Box<dyn RailPolicy>> {
        self.factories.get(name).map(|factory| factory(player, seed))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_policies_resolve_by_name() {
        let registry = PolicyRegistry::with_builtins();
        assert!(registry.create("RANDOM", 0, 1).is_some());
        assert!(registry.create("GREEDY", 1, 1).is_some());
        assert!(registry.create("SKYNET", 0, 1).is_none());
    }
}
