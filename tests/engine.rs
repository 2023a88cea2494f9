//! End-to-end games against the public engine API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use steamrails_rs::game::GameController;
use steamrails_rs::types::Terrain;
use steamrails_rs::{
    City, GameConfig, GamePhase, GameState, HexGrid, Player, PlayerAction, PlayerObjective,
    PolicyRegistry, Tile, TilePosition,
};

fn generated_state(seed: u64) -> GameState {
    let mut config = GameConfig::default();
    config.seed = seed;
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = HexGrid::generate(
        config.map_layers,
        config.mountain_ratio,
        &config.town_names,
        config.starting_city_count,
        &mut rng,
    )
    .expect("default map generates");
    let players = vec![
        Player::ai("Random Bot", "RANDOM"),
        Player::ai("Greedy Bot", "GREEDY"),
    ];
    GameState::new(config, grid, players)
}

#[test]
fn ai_game_runs_to_completion_on_the_default_map() {
    let state = generated_state(7);
    let registry = PolicyRegistry::with_builtins();
    let mut engine = GameController::new(state, &registry);

    let phases: Arc<Mutex<Vec<GamePhase>>> = Arc::new(Mutex::new(Vec::new()));
    let phases_log = Arc::clone(&phases);
    engine.state().phase_property().subscribe(move |phase| {
        phases_log.lock().expect("not poisoned").push(*phase);
    });

    let winner = engine.start().expect("game completes");

    assert_eq!(engine.state().phase(), GamePhase::Finished);
    assert_eq!(engine.state().winner(), Some(winner));
    assert_eq!(
        engine.state().chosen_city_history().len(),
        engine.state().grid().city_count()
    );

    let observed = phases.lock().expect("not poisoned").clone();
    assert_eq!(
        observed,
        vec![GamePhase::Building, GamePhase::Driving, GamePhase::Finished]
    );

    // The winner holds the credit maximum, ties broken by seat order.
    let players = engine.state().players();
    let best = players.iter().map(|p| p.credits()).max().unwrap_or(0);
    assert_eq!(players[winner].credits(), best);
    for (seat, player) in players.iter().enumerate() {
        if seat < winner {
            assert!(player.credits() < best);
        }
    }
}

#[test]
fn snapshot_of_a_finished_game_round_trips() {
    let state = generated_state(11);
    let registry = PolicyRegistry::with_builtins();
    let mut engine = GameController::new(state, &registry);
    engine.start().expect("game completes");

    let snapshot = engine.state().snapshot();
    let json = serde_json::to_string(&snapshot).expect("serializes");
    let restored = GameState::restore(serde_json::from_str(&json).expect("parses"));

    assert_eq!(restored.phase(), engine.state().phase());
    assert_eq!(restored.winner(), engine.state().winner());
    assert_eq!(
        restored.chosen_city_history(),
        engine.state().chosen_city_history()
    );
    assert_eq!(restored.round_counter(), engine.state().round_counter());
    for (restored_player, original) in restored.players().iter().zip(engine.state().players()) {
        assert_eq!(restored_player.credits(), original.credits());
    }
}

/// A human seat answered from another thread through the rendezvous
/// channel: confirms every build window without building, sits out every
/// race, and picks cities by cycling through the possible pairs.
#[test]
fn human_seat_is_served_through_the_rendezvous_channel() {
    let tiles: Vec<Tile> = (0..5)
        .map(|q| Tile {
            position: TilePosition::new(q, 0),
            terrain: Terrain::Plain,
        })
        .collect();
    let cities = vec![
        City {
            name: "Aachen".to_string(),
            position: TilePosition::new(0, 0),
            is_starting_city: true,
        },
        City {
            name: "Bremen".to_string(),
            position: TilePosition::new(2, 0),
            is_starting_city: true,
        },
        City {
            name: "Cottbus".to_string(),
            position: TilePosition::new(4, 0),
            is_starting_city: true,
        },
    ];
    let grid = HexGrid::from_parts(tiles, cities).expect("valid grid");
    let state = GameState::new(
        GameConfig::default(),
        grid,
        vec![Player::ai("Bot", "RANDOM"), Player::human("Ada")],
    );
    let registry = PolicyRegistry::with_builtins();
    let mut engine = GameController::new(state, &registry);

    let handle = engine
        .player_handles()
        .remove(&1)
        .expect("handle for the human seat");
    let finished = Arc::new(AtomicBool::new(false));
    let finished_flag = Arc::clone(&finished);

    let city_pairs = [
        (TilePosition::new(0, 0), TilePosition::new(2, 0)),
        (TilePosition::new(0, 0), TilePosition::new(4, 0)),
        (TilePosition::new(2, 0), TilePosition::new(4, 0)),
    ];

    let responder = std::thread::spawn(move || {
        let mut next_pair = 0usize;
        while !finished_flag.load(Ordering::SeqCst) {
            let action = match handle.objective() {
                PlayerObjective::PlaceRail | PlayerObjective::ConfirmBuild => {
                    Some(PlayerAction::ConfirmBuild)
                }
                PlayerObjective::ChooseCities => {
                    let (start, target) = city_pairs[next_pair % city_pairs.len()];
                    next_pair += 1;
                    Some(PlayerAction::ChooseCities { start, target })
                }
                PlayerObjective::ChoosePath => Some(PlayerAction::ChoosePath { edges: Vec::new() }),
                PlayerObjective::ConfirmPath => Some(PlayerAction::ConfirmPath),
                PlayerObjective::RollDice => Some(PlayerAction::RollDice),
                PlayerObjective::Drive => Some(PlayerAction::Drive),
                PlayerObjective::Idle => None,
            };
            if let Some(action) = action {
                // Rejected submissions just mean the objective moved on.
                let _ = handle.submit_action(action);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    });

    let winner = engine.start().expect("game completes");
    finished.store(true, Ordering::SeqCst);
    responder.join().expect("responder exits");

    // The abstaining human never built or raced, so the bot wins.
    assert_eq!(winner, 0);
    assert_eq!(engine.state().phase(), GamePhase::Finished);
    assert!(engine.state().grid().rails(1).is_empty());
    assert_eq!(
        engine.state().chosen_city_history().len(),
        engine.state().grid().city_count()
    );
}
