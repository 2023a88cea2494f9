use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::board::EdgeKey;
use crate::game::action::PlayerAction;
use crate::game::state::{GameError, InvalidAction};
use crate::observe::Property;
use crate::types::{PlayerId, PlayerObjective};

/// Engine-side mailbox of one player. The engine posts an objective, the
/// player (human UI via [`PlayerHandle`], or an AI policy invoked by the
/// engine) answers with an action, the engine validates and applies it.
pub struct PlayerController {
    player: PlayerId,
    objective: Property<PlayerObjective>,
    building_budget: u32,
    pending_path: Vec<EdgeKey>,
    confirmed_path: Vec<EdgeKey>,
    path_progress: usize,
    actions: Receiver<PlayerAction>,
    submit: Sender<PlayerAction>,
}

/// Cloneable submission side of a controller, handed to UI threads.
#[derive(Clone)]
pub struct PlayerHandle {
    player: PlayerId,
    objective: Property<PlayerObjective>,
    submit: Sender<PlayerAction>,
}

impl PlayerHandle {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn objective(&self) -> PlayerObjective {
        self.objective.get()
    }

    pub fn objective_property(&self) -> Property<PlayerObjective> {
        self.objective.clone()
    }

    /// Posts an action to the engine. Rejected immediately when its kind is
    /// not allowed by the current objective; the engine re-validates on
    /// receipt either way.
    pub fn submit_action(&self, action: PlayerAction) -> Result<(), InvalidAction> {
        let objective = self.objective.get();
        if !objective.allows(action.kind()) {
            return Err(InvalidAction::WrongObjective {
                objective,
                kind: action.kind(),
            });
        }
        // A send only fails when the engine has already shut down; the
        // action is simply dropped then.
        let _ = self.submit.send(action);
        Ok(())
    }
}

impl PlayerController {
    pub fn new(player: PlayerId) -> Self {
        let (submit, actions) = mpsc::channel();
        Self {
            player,
            objective: Property::new(PlayerObjective::Idle),
            building_budget: 0,
            pending_path: Vec::new(),
            confirmed_path: Vec::new(),
            path_progress: 0,
            actions,
            submit,
        }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            player: self.player,
            objective: self.objective.clone(),
            submit: self.submit.clone(),
        }
    }

    pub fn objective(&self) -> PlayerObjective {
        self.objective.get()
    }

    pub fn objective_property(&self) -> Property<PlayerObjective> {
        self.objective.clone()
    }

    /// Marks the controller ready for actions of the new objective. Stale
    /// submissions queued against the previous objective are discarded.
    pub fn set_objective(&mut self, objective: PlayerObjective) {
        loop {
            match self.actions.try_recv() {
                Ok(_) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.objective.set(objective);
    }

    /// Blocks the engine thread until the player submits an action.
    pub fn recv_action(&self) -> Result<PlayerAction, GameError> {
        self.actions
            .recv()
            .map_err(|_| GameError::ControllerDisconnected)
    }

    pub fn building_budget(&self) -> u32 {
        self.building_budget
    }

    pub fn set_building_budget(&mut self, budget: u32) {
        self.building_budget = budget;
    }

    pub fn spend_building_budget(&mut self, cost: u32) {
        self.building_budget = self.building_budget.saturating_sub(cost);
    }

    pub fn pending_path(&self) -> &[EdgeKey] {
        &self.pending_path
    }

    pub fn set_pending_path(&mut self, path: Vec<EdgeKey>) {
        self.pending_path = path;
    }

    /// Promotes the pending path to the confirmed route for this round.
    pub fn confirm_path(&mut self) {
        self.confirmed_path = std::mem::take(&mut self.pending_path);
        self.path_progress = 0;
    }

    pub fn confirmed_path(&self) -> &[EdgeKey] {
        &self.confirmed_path
    }

    pub fn next_path_edge(&self) -> Option<EdgeKey> {
        self.confirmed_path.get(self.path_progress).copied()
    }

    pub fn advance_path(&mut self) {
        self.path_progress += 1;
    }

    pub fn reset_route(&mut self) {
        self.pending_path.clear();
        self.confirmed_path.clear();
        self.path_progress = 0;
    }
}
