//! Append-only CSV sink for finished games, plus the matching loader.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

pub const CSV_HEADER: &str = "PlayerName,AI,Timestamp,Score";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub ai: bool,
    pub timestamp: String,
    pub score: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("leaderboard file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed leaderboard row: {0}")]
    MalformedRow(String),
}

/// Creates the CSV with its header (and parent directories) if missing.
pub fn initialize_csv(path: &Path) -> Result<(), PersistenceError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    writeln!(file, "{CSV_HEADER}")?;
    Ok(())
}

/// Appends one finished-game row. Existing rows are never truncated.
pub fn save_player_data(
    path: &Path,
    player_name: &str,
    score: u32,
    ai: bool,
) -> Result<(), PersistenceError> {
    initialize_csv(path)?;
    let timestamp = Local::now().format(TIMESTAMP_FORMAT);
    let mut file = OpenOptions::new().append(true).open(path)?;
    writeln!(file, "{player_name},{ai},{timestamp},{score}")?;
    Ok(())
}

/// Reads every row below the header.
pub fn load_leaderboard_data(path: &Path) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> Result<LeaderboardEntry, PersistenceError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 4 {
        return Err(PersistenceError::MalformedRow(line.to_string()));
    }
    let ai = fields[1]
        .parse::<bool>()
        .map_err(|_| PersistenceError::MalformedRow(line.to_string()))?;
    let score = fields[3]
        .parse::<u32>()
        .map_err(|_| PersistenceError::MalformedRow(line.to_string()))?;
    Ok(LeaderboardEntry {
        name: fields[0].to_string(),
        ai,
        timestamp: fields[2].to_string(),
        score,
    })
}
