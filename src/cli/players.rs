use crate::game::player::Player;

pub struct CliPlayer {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const CLI_PLAYERS: &[CliPlayer] = &[
    CliPlayer {
        code: "R",
        name: "RandomPolicy",
        description: "Builds random affordable rails and rides the shortest route.",
    },
    CliPlayer {
        code: "G",
        name: "GreedyPolicy",
        description: "Extends its network cheaply and races the cheapest available route.",
    },
];

/// Maps a CLI player code to a seat record with the matching policy name.
pub fn create_player(code: &str, seat: usize) -> Option<Player> {
    match code {
        "R" => Some(Player::ai(format!("Random {seat}"), "RANDOM")),
        "G" => Some(Player::ai(format!("Greedy {seat}"), "GREEDY")),
        _ => None,
    }
}

pub fn print_player_help() {
    println!("Player Legend:");
    println!("{:<5} {:<25} {}", "CODE", "PLAYER", "DESCRIPTION");
    println!("{}", "-".repeat(80));
    for player in CLI_PLAYERS {
        println!(
            "{:<5} {:<25} {}",
            player.code, player.name, player.description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_resolve_to_ai_players() {
        let player = create_player("R", 0).expect("known code");
        assert!(player.is_ai());
        assert_eq!(player.ai_policy.as_deref(), Some("RANDOM"));
        assert!(create_player("X", 0).is_none());
    }
}
