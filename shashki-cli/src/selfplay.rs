//! Selfplay command - learning AI against a fixed-weights opponent
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_session(), play_series(), report_results()
//! - Level 3: play_single_game(), compute_statistics()
//! - Level 4: rng and formatting utilities

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use shashki_core::{
    AiPlayer, Delivery, Difficulty, EvaluationModel, GameResult, GameSession, MemoryStore, Move, Player,
    RuleConfig, WeightStore, Weights,
};

use crate::store::JsonFileStore;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SelfplayArgs {
    /// Number of games to play (learner alternates colors)
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Learner difficulty
    #[arg(long, default_value = "normal")]
    pub difficulty: Difficulty,

    /// Fixed opponent difficulty
    #[arg(long, default_value = "normal")]
    pub opponent: Difficulty,

    /// JSON file the learner's weights are loaded from and saved to
    #[arg(long, value_name = "FILE")]
    pub weights: Option<PathBuf>,

    /// Keep the learner's weights fixed
    #[arg(long)]
    pub no_learning: bool,

    /// Plies before a game is abandoned as unfinished
    #[arg(long, default_value = "300")]
    pub max_plies: usize,

    /// Rule variant JSON file (Russian rules if omitted)
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: usize,
    learner_side: Player,
    result: GameResult,
    plies: usize,
    /// Background results that arrived after the position moved on
    discarded: usize,
}

impl GameRecord {
    fn learner_won(&self) -> bool {
        matches!(
            (self.learner_side, self.result),
            (Player::White, GameResult::WhiteWins) | (Player::Black, GameResult::BlackWins)
        )
    }
}

/// Aggregated series results
#[derive(Clone, Debug)]
struct SeriesResults {
    games: Vec<GameRecord>,
    learner_wins: usize,
    learner_losses: usize,
    unfinished: usize,
    avg_plies: f32,
    final_weights: Weights,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run selfplay command
///
/// This function reads like a table of contents:
/// 1. Load rules and build the learner's session
/// 2. Play the series against the fixed opponent
/// 3. Report results
pub fn run(args: SelfplayArgs, seed: Option<u64>) -> Result<()> {
    let rules = crate::load_rules(args.rules.as_deref())?;
    let mut rng = create_rng(seed);

    let store = open_store(&args)?;
    let mut session = build_session(rules, store, &args, &mut rng)?;
    let mut opponent = AiPlayer::with_seed(args.opponent, fixed_model(), rng.gen());

    tracing::info!(
        "Starting selfplay: {} learner vs {} opponent ({} games, learning={})",
        args.difficulty,
        args.opponent,
        args.games,
        !args.no_learning
    );

    let results = play_series(&mut session, &mut opponent, &args);

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn open_store(args: &SelfplayArgs) -> Result<Box<dyn WeightStore>> {
    Ok(match &args.weights {
        Some(path) => Box::new(JsonFileStore::open(path)?),
        None => Box::new(MemoryStore::new()),
    })
}

/// Session whose AI is the learner
fn build_session(
    rules: Arc<RuleConfig>,
    store: Box<dyn WeightStore>,
    args: &SelfplayArgs,
    rng: &mut ChaCha8Rng,
) -> Result<GameSession> {
    let mut model = EvaluationModel::load(store);
    model.set_learning(!args.no_learning);
    tracing::debug!(weights = ?model.weights(), "loaded learner weights");

    let learner = AiPlayer::with_seed(args.difficulty, model, rng.gen());
    let session = GameSession::new(rules, learner)?;
    Ok(session)
}

/// Play all games in the series
fn play_series(session: &mut GameSession, opponent: &mut AiPlayer, args: &SelfplayArgs) -> SeriesResults {
    let mut games = Vec::with_capacity(args.games);

    for game_num in 0..args.games {
        // Alternate colors for fairness
        let learner_side = if game_num % 2 == 0 { Player::White } else { Player::Black };

        let record = play_single_game(session, opponent, learner_side, game_num + 1, args.max_plies);

        tracing::info!(
            "Game {}: learner as {:?}, {:?} ({} plies)",
            record.game_number,
            record.learner_side,
            record.result,
            record.plies
        );

        games.push(record);
    }

    compute_statistics(games, session.ai().model().weights())
}

/// Report series results
fn report_results(results: &SeriesResults, args: &SelfplayArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game. The learner searches in the background and its result is
/// re-validated on delivery; finished games feed the learner through the session.
fn play_single_game(
    session: &mut GameSession,
    opponent: &mut AiPlayer,
    learner_side: Player,
    game_number: usize,
    max_plies: usize,
) -> GameRecord {
    session.reset();
    session.set_ai_side(Some(learner_side));

    let mut plies = 0;
    let mut discarded = 0;

    while !session.state().is_game_over() && plies < max_plies {
        let played: Option<Move> = if session.is_ai_turn() {
            let pending = session.spawn_search();
            match session.deliver(pending) {
                Delivery::Applied(mv) => Some(mv),
                Delivery::Discarded(_) => {
                    discarded += 1;
                    None
                }
                Delivery::NoMove => None,
            }
        } else {
            opponent
                .pick_move(session.state())
                .and_then(|mv| session.apply_move(mv).ok())
        };

        if played.is_none() {
            break;
        }
        plies += 1;
    }

    GameRecord {
        game_number,
        learner_side,
        result: session.result(),
        plies,
        discarded,
    }
}

/// Compute aggregate statistics from game records
fn compute_statistics(games: Vec<GameRecord>, final_weights: Weights) -> SeriesResults {
    let learner_wins = games.iter().filter(|g| g.learner_won()).count();
    let unfinished = games.iter().filter(|g| g.result == GameResult::Ongoing).count();
    let learner_losses = games.len() - learner_wins - unfinished;

    let total_plies: usize = games.iter().map(|g| g.plies).sum();
    let avg_plies = if games.is_empty() {
        0.0
    } else {
        total_plies as f32 / games.len() as f32
    };

    SeriesResults {
        games,
        learner_wins,
        learner_losses,
        unfinished,
        avg_plies,
        final_weights,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Default weights that never adapt
fn fixed_model() -> EvaluationModel {
    let mut model = EvaluationModel::in_memory();
    model.set_learning(false);
    model
}

fn percent(count: usize, total: usize) -> f32 {
    if total > 0 {
        count as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

/// Print results as JSON
fn print_json_results(results: &SeriesResults) {
    #[derive(Serialize)]
    struct JsonGame {
        game_number: usize,
        learner_side: String,
        result: String,
        plies: usize,
        discarded: usize,
    }

    #[derive(Serialize)]
    struct JsonOutput {
        total_games: usize,
        learner_wins: usize,
        learner_losses: usize,
        unfinished: usize,
        avg_plies: f32,
        final_weights: Weights,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        total_games: results.games.len(),
        learner_wins: results.learner_wins,
        learner_losses: results.learner_losses,
        unfinished: results.unfinished,
        avg_plies: results.avg_plies,
        final_weights: results.final_weights,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                learner_side: format!("{:?}", g.learner_side),
                result: format!("{:?}", g.result),
                plies: g.plies,
                discarded: g.discarded,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &SeriesResults) {
    let total = results.games.len();

    println!("\n=== Selfplay Results ===");
    println!("Total games:    {}", total);
    println!(
        "Learner wins:   {} ({:.1}%)",
        results.learner_wins,
        percent(results.learner_wins, total)
    );
    println!(
        "Learner losses: {} ({:.1}%)",
        results.learner_losses,
        percent(results.learner_losses, total)
    );
    println!(
        "Unfinished:     {} ({:.1}%)",
        results.unfinished,
        percent(results.unfinished, total)
    );
    println!("Avg plies:      {:.1}", results.avg_plies);
    println!(
        "Weights:        man={:.3} king={:.3} mobility={:.4}",
        results.final_weights.man, results.final_weights.king, results.final_weights.mobility
    );

    println!("\nGame details:");
    for game in &results.games {
        println!(
            "  Game {}: learner {:?}, {:?} in {} plies",
            game.game_number, game.learner_side, game.result, game.plies
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize, learner_side: Player, result: GameResult, plies: usize) -> GameRecord {
        GameRecord {
            game_number: n,
            learner_side,
            result,
            plies,
            discarded: 0,
        }
    }

    fn args(games: usize) -> SelfplayArgs {
        SelfplayArgs {
            games,
            difficulty: Difficulty::Easy,
            opponent: Difficulty::Easy,
            weights: None,
            no_learning: false,
            max_plies: 400,
            rules: None,
            json: true,
        }
    }

    #[test]
    fn test_compute_statistics_empty() {
        let results = compute_statistics(vec![], Weights::default());
        assert_eq!(results.learner_wins, 0);
        assert_eq!(results.learner_losses, 0);
        assert_eq!(results.unfinished, 0);
        assert_eq!(results.avg_plies, 0.0);
    }

    #[test]
    fn test_compute_statistics() {
        let games = vec![
            record(1, Player::White, GameResult::WhiteWins, 40),
            record(2, Player::Black, GameResult::WhiteWins, 60),
            record(3, Player::White, GameResult::Ongoing, 80),
            record(4, Player::Black, GameResult::BlackWins, 20),
        ];

        let results = compute_statistics(games, Weights::default());
        assert_eq!(results.learner_wins, 2);
        assert_eq!(results.learner_losses, 1);
        assert_eq!(results.unfinished, 1);
        assert_eq!(results.avg_plies, 50.0);
    }

    #[test]
    fn test_create_rng_deterministic() {
        let mut rng1 = create_rng(Some(42));
        let mut rng2 = create_rng(Some(42));
        assert_eq!(rng1.gen::<u64>(), rng2.gen::<u64>());
    }

    #[test]
    fn test_capped_game_is_unfinished_and_not_learned() {
        let store = MemoryStore::new();
        let mut rng = create_rng(Some(1));
        let mut session = build_session(Arc::new(RuleConfig::russian()), Box::new(store.clone()), &args(1), &mut rng).unwrap();
        let mut opponent = AiPlayer::with_seed(Difficulty::Easy, fixed_model(), 2);

        let record = play_single_game(&mut session, &mut opponent, Player::White, 1, 4);
        assert_eq!(record.plies, 4);
        assert_eq!(record.result, GameResult::Ongoing);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_series_alternates_colors() {
        let mut rng = create_rng(Some(3));
        let mut session = build_session(
            Arc::new(RuleConfig::russian().with_size(6)),
            Box::new(MemoryStore::new()),
            &args(2),
            &mut rng,
        )
        .unwrap();
        let mut opponent = AiPlayer::with_seed(Difficulty::Easy, fixed_model(), 4);

        let results = play_series(&mut session, &mut opponent, &args(2));
        assert_eq!(results.games.len(), 2);
        assert_eq!(results.games[0].learner_side, Player::White);
        assert_eq!(results.games[1].learner_side, Player::Black);
        assert_eq!(results.games.iter().map(|g| g.discarded).sum::<usize>(), 0);
    }
}
