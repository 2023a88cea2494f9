use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use steamrails_rs::cli::{create_player, print_player_help, StatisticsAccumulator};
use steamrails_rs::game::{GameConfig, GameController};
use steamrails_rs::leaderboard;
use steamrails_rs::{GameState, HexGrid, PolicyRegistry};

#[derive(Debug, Parser, Clone)]
#[command(name = "steamrails-sim")]
#[command(about = "Rail game simulator - run AI games and collect statistics")]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 5)]
    num: u32,

    /// Comma-separated player codes (e.g., R,R or R,G,R)
    /// Codes: R=Random, G=Greedy
    #[arg(long, default_value = "R,G")]
    players: String,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Rings of tiles around the center of the generated map
    #[arg(long, default_value_t = 3)]
    layers: i32,

    /// Leaderboard CSV to append finished games to
    #[arg(long, default_value = "leaderboard.csv")]
    leaderboard: PathBuf,

    /// Show player codes and exit
    #[arg(long)]
    help_players: bool,

    /// Silence console output
    #[arg(long)]
    quiet: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    if args.help_players {
        print_player_help();
        return;
    }

    let player_keys: Vec<&str> = args.players.split(',').collect();
    if player_keys.len() < 2 {
        eprintln!("Error: Must specify at least 2 players");
        std::process::exit(1);
    }

    let registry = PolicyRegistry::with_builtins();
    let mut stats = StatisticsAccumulator::new();

    for game_idx in 0..args.num {
        let mut config = GameConfig::default();
        config.seed = args.seed + u64::from(game_idx);
        config.map_layers = args.layers;

        let mut players = Vec::new();
        for (seat, key) in player_keys.iter().enumerate() {
            match create_player(key, seat) {
                Some(player) => players.push(player),
                None => {
                    eprintln!("Error: Unknown player code '{key}'");
                    eprintln!("Use --help-players to see available codes");
                    std::process::exit(1);
                }
            }
        }

        let mut rng = {
            use rand::SeedableRng;
            rand::rngs::StdRng::seed_from_u64(config.seed)
        };
        let grid = match HexGrid::generate(
            config.map_layers,
            config.mountain_ratio,
            &config.town_names,
            config.starting_city_count,
            &mut rng,
        ) {
            Ok(grid) => grid,
            Err(error) => {
                eprintln!("Error: could not generate map: {error}");
                std::process::exit(1);
            }
        };

        let state = GameState::new(config, grid, players);
        let mut engine = GameController::new(state, &registry);

        let start = Instant::now();
        let outcome = engine.start();
        let duration = start.elapsed();

        match outcome {
            Ok(winner) => {
                stats.after(engine.state(), duration);
                for record in engine.state().players() {
                    if let Err(error) = leaderboard::save_player_data(
                        &args.leaderboard,
                        &record.name,
                        record.credits(),
                        record.is_ai(),
                    ) {
                        tracing::warn!(%error, "could not persist leaderboard row");
                    }
                }
                if !args.quiet {
                    let winner_name = &engine.state().players()[winner].name;
                    let scores: String = engine
                        .state()
                        .players()
                        .iter()
                        .map(|p| format!("{}={}", p.name, p.credits()))
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!(
                        "Game {:>4}: Winner={:<12} Rounds={:>4} [{}] ({duration:?})",
                        game_idx + 1,
                        winner_name,
                        engine.state().round_counter(),
                        scores,
                    );
                }
            }
            Err(error) => {
                eprintln!("Game {} failed: {error}", game_idx + 1);
            }
        }
    }

    if !args.quiet {
        print_summary(&stats, &player_keys);
    }
}

fn print_summary(stats: &StatisticsAccumulator, player_keys: &[&str]) {
    println!("\n{}", "=".repeat(72));
    println!("SIMULATION SUMMARY");
    println!("{}", "=".repeat(72));

    println!("\nPlayer Summary:");
    println!(
        "{:<10} {:<8} {:<10} {:<12} {:<12}",
        "Seat", "Code", "Wins", "Win Rate", "Avg Credits"
    );
    println!("{}", "-".repeat(56));

    for (seat, code) in player_keys.iter().enumerate() {
        let wins = stats.stats.wins.get(&seat).copied().unwrap_or(0);
        let win_rate = if stats.stats.games > 0 {
            (f64::from(wins) / f64::from(stats.stats.games)) * 100.0
        } else {
            0.0
        };
        let avg_credits = stats
            .stats
            .credits_by_player
            .get(&seat)
            .map(|credits| {
                if credits.is_empty() {
                    0.0
                } else {
                    credits.iter().map(|&c| f64::from(c)).sum::<f64>() / credits.len() as f64
                }
            })
            .unwrap_or(0.0);

        println!(
            "{:<10} {:<8} {:<10} {:<11.1}% {:<12.2}",
            seat, code, wins, win_rate, avg_credits
        );
    }

    println!("\nGame Summary:");
    println!("  Total Games: {}", stats.stats.games);
    println!("  Avg Rounds: {:.2}", stats.stats.get_avg_rounds());
    println!("  Avg Duration: {:.2?}", stats.stats.get_avg_duration());
}
