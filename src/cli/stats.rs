use std::collections::HashMap;
use std::time::Duration;

use crate::game::state::GameState;
use crate::types::PlayerId;

#[derive(Debug, Default, Clone)]
pub struct GameStats {
    pub wins: HashMap<PlayerId, u32>,
    pub credits_by_player: HashMap<PlayerId, Vec<u32>>,
    pub games: u32,
    pub total_rounds: u64,
    pub total_duration: Duration,
}

impl GameStats {
    pub fn new() -> Self {
        Self {
            wins: HashMap::new(),
            credits_by_player: HashMap::new(),
            games: 0,
            total_rounds: 0,
            total_duration: Duration::ZERO,
        }
    }

    pub fn record_game(&mut self, state: &GameState, duration: Duration) {
        self.games += 1;
        self.total_duration += duration;
        self.total_rounds += u64::from(state.round_counter());

        if let Some(winner) = state.winner() {
            *self.wins.entry(winner).or_insert(0) += 1;
        }

        for (player, record) in state.players().iter().enumerate() {
            self.credits_by_player
                .entry(player)
                .or_default()
                .push(record.credits());
        }
    }

    pub fn get_avg_rounds(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.total_rounds as f64 / self.games as f64
    }

    pub fn get_avg_duration(&self) -> Duration {
        if self.games == 0 {
            return Duration::ZERO;
        }
        self.total_duration / self.games
    }
}

pub struct StatisticsAccumulator {
    pub stats: GameStats,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self {
            stats: GameStats::new(),
        }
    }

    pub fn after(&mut self, state: &GameState, duration: Duration) {
        self.stats.record_game(state, duration);
    }
}

impl Default for StatisticsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
