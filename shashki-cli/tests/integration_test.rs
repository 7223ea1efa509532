//! Integration tests for the SHASHKI engine
//!
//! Tests the full stack: rules, move generation, undo, evaluation,
//! search, sessions and the snapshot/move-record codecs

use std::sync::Arc;
use std::time::Instant;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use shashki_core::{
    AiPlayer, BoardSnapshot, Delivery, Difficulty, EvaluationModel, GameResult, GameSession, MemoryStore,
    Move, MoveRecord, Piece, Player, PositionState, RuleConfig, SearchEngine, Square, WeightStore, Weights,
};
use shashki_core::eval::{KEY_KING, KEY_MAN, KEY_MOBILITY};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn sq(x: i8, y: i8) -> Square {
    Square::new(x, y)
}

fn russian() -> Arc<RuleConfig> {
    Arc::new(RuleConfig::russian())
}

/// Play up to `plies` uniformly random moves, checking `check` before each one
fn random_playout(
    state: &mut PositionState,
    plies: usize,
    rng: &mut ChaCha8Rng,
    mut check: impl FnMut(&PositionState, &[Move]),
) -> usize {
    let mut played = 0;
    while played < plies {
        let moves = state.legal_moves();
        check(state, &moves);
        let Some(&mv) = moves.choose(rng) else { break };
        state.apply_move(mv).unwrap();
        played += 1;
    }
    played
}

// ============================================================================
// MOVE GENERATION PROPERTIES
// ============================================================================

#[test]
fn test_start_position() {
    let game = PositionState::russian();
    assert_eq!(game.board().pieces().count(), 24);
    assert_eq!(game.side_to_move(), Player::White);
    assert_eq!(game.legal_moves().len(), 7);
    assert_eq!(game.result(), GameResult::Ongoing);
}

#[test]
fn test_generated_moves_are_well_formed() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..20 {
        let mut game = PositionState::russian();
        random_playout(&mut game, 120, &mut rng, |state, moves| {
            for mv in moves {
                assert!(mv.from.is_playable() && mv.to.is_playable(), "{}", mv);
                assert!(state.board().contains(mv.to));
                assert!(state.piece_at(mv.from).belongs_to(state.side_to_move()));
                assert!(state.piece_at(mv.to).is_empty());
            }
        });
    }
}

#[test]
fn test_mandatory_capture_holds_in_play() {
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    for _ in 0..20 {
        let mut game = PositionState::russian();
        random_playout(&mut game, 120, &mut rng, |_, moves| {
            if moves.iter().any(|m| m.is_capture()) {
                assert!(moves.iter().all(|m| m.is_capture()));
            }
        });
    }
}

#[test]
fn test_max_capture_rule_holds_in_play() {
    let rules = Arc::new(RuleConfig::russian().with_max_capture_rule(true));
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    for _ in 0..20 {
        let mut game = PositionState::new(Arc::clone(&rules)).unwrap();
        random_playout(&mut game, 120, &mut rng, |state, moves| {
            let lengths: Vec<usize> = moves.iter().map(|m| state.chain_length(m)).collect();
            if let Some(first) = lengths.first() {
                assert!(lengths.iter().all(|l| l == first), "{:?}", lengths);
            }
        });
    }
}

#[test]
fn test_kings_never_revert() {
    let mut rng = ChaCha8Rng::seed_from_u64(14);
    for _ in 0..30 {
        let mut game = PositionState::russian();
        for _ in 0..200 {
            let moves = game.legal_moves();
            let Some(&mv) = moves.choose(&mut rng) else { break };
            let before = game.piece_at(mv.from);
            let applied = game.apply_move(mv).unwrap();
            let after = game.piece_at(mv.to);

            if before.is_king() {
                assert_eq!(after, before);
                assert!(!applied.promotes);
            } else if applied.promotes {
                assert!(after.is_king());
            } else {
                assert_eq!(after, before);
            }
        }
    }
}

#[test]
fn test_double_jump_scenario() {
    let pieces = [
        (sq(2, 5), Piece::Man(Player::White)),
        (sq(3, 4), Piece::Man(Player::Black)),
        (sq(5, 2), Piece::Man(Player::Black)),
        (sq(1, 0), Piece::Man(Player::Black)),
    ];
    let mut game = PositionState::with_pieces(russian(), Player::White, &pieces).unwrap();

    // the second jump is not offered until the first lands
    assert!(game.legal_moves().iter().all(|m| m.from == sq(2, 5) && m.to == sq(4, 3)));

    game.apply_move(Move::quiet(sq(2, 5), sq(4, 3))).unwrap();
    assert_eq!(game.side_to_move(), Player::White);
    assert_eq!(game.chain_square(), Some(sq(4, 3)));
    assert_eq!(game.legal_moves(), vec![Move::capture(sq(4, 3), sq(6, 1), sq(5, 2))]);

    game.apply_move(Move::quiet(sq(4, 3), sq(6, 1))).unwrap();
    assert_eq!(game.side_to_move(), Player::Black);
    assert_eq!(game.chain_square(), None);
    assert_eq!(game.board().pieces().count(), 2);
}

#[test]
fn test_perft_start() {
    let game = PositionState::russian();
    assert_eq!(game.perft(1), 7);
    assert_eq!(game.perft(2), 49);
}

// ============================================================================
// UNDO
// ============================================================================

#[test]
fn test_undo_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    for n in [1usize, 5, 17, 60] {
        let mut game = PositionState::russian();
        let start = game.board().clone();

        let played = random_playout(&mut game, n, &mut rng, |_, _| {});
        for _ in 0..played {
            assert!(game.undo());
        }
        assert!(!game.undo());
        assert_eq!(game.board(), &start);
        assert_eq!(game.side_to_move(), Player::White);
        assert_eq!(game.chain_square(), None);
    }
}

// ============================================================================
// EVALUATION AND LEARNING
// ============================================================================

#[test]
fn test_learning_persists_through_store() {
    let store = MemoryStore::new();
    let mut model = EvaluationModel::load(Box::new(store.clone()));
    model.adapt(1).unwrap();
    model.adapt(-1).unwrap();
    assert_eq!(store.writes(), 2);

    let reloaded = EvaluationModel::load(Box::new(store.clone()));
    assert_eq!(reloaded.weights(), model.weights());
    assert!(store.get(KEY_MAN).is_some());
    assert!(store.get(KEY_KING).is_some());
    assert!(store.get(KEY_MOBILITY).is_some());
}

// ============================================================================
// SEARCH AND AI
// ============================================================================

#[test]
fn test_search_prefers_winning_capture() {
    let pieces = [
        (sq(2, 5), Piece::Man(Player::White)),
        (sq(3, 4), Piece::Man(Player::Black)),
        (sq(6, 1), Piece::Man(Player::Black)),
    ];
    let rules = Arc::new(RuleConfig::russian().with_mandatory_capture(false));
    let game = PositionState::with_pieces(rules, Player::White, &pieces).unwrap();

    for depth in 1..=3 {
        let mv = SearchEngine::new(depth, Weights::default()).best_move(&game).unwrap();
        assert!(mv.is_capture(), "depth {} chose {}", depth, mv);
    }
}

#[test]
fn test_ai_plays_full_game() {
    let mut game = PositionState::russian();
    let mut white = AiPlayer::with_seed(Difficulty::Easy, EvaluationModel::in_memory(), 1);
    let mut black = AiPlayer::with_seed(Difficulty::Normal, EvaluationModel::in_memory(), 2);

    let mut plies = 0;
    while plies < 400 {
        let ai = match game.side_to_move() {
            Player::White => &mut white,
            Player::Black => &mut black,
        };
        match ai.pick_move(&game) {
            Some(mv) => {
                game.apply_move(mv).unwrap();
            }
            None => break,
        }
        plies += 1;
    }

    assert!(plies > 0);
    if game.is_game_over() {
        assert_ne!(game.result(), GameResult::Ongoing);
    }
}

#[test]
fn test_search_performance() {
    let game = PositionState::russian();

    let start = Instant::now();
    let _ = SearchEngine::new(2, Weights::default()).best_move(&game);
    let d2_time = start.elapsed();

    let start = Instant::now();
    let _ = SearchEngine::new(4, Weights::default()).best_move(&game);
    let d4_time = start.elapsed();

    println!("Search Performance:");
    println!("  Depth 2: {:?}", d2_time);
    println!("  Depth 4: {:?}", d4_time);

    assert!(d4_time.as_millis() < 30000, "Depth 4 took too long");
}

// ============================================================================
// SESSIONS AND CODECS
// ============================================================================

#[test]
fn test_session_handoff_and_stale_discard() {
    let ai = AiPlayer::with_seed(Difficulty::Hard, EvaluationModel::in_memory(), 8);
    let mut session = GameSession::new(russian(), ai).unwrap().with_ai_side(Player::Black);

    let opening = session.state().legal_moves()[3];
    session.apply_move(opening).unwrap();

    let pending = session.spawn_search();
    assert!(matches!(session.deliver(pending), Delivery::Applied(_)));
    assert_eq!(session.state().side_to_move(), Player::White);

    let reply = session.state().legal_moves()[0];
    session.apply_move(reply).unwrap();
    let pending = session.spawn_search();
    session.reset();
    assert!(matches!(session.deliver(pending), Delivery::Discarded(_)));
    assert_eq!(session.state().board(), PositionState::russian().board());
}

#[test]
fn test_snapshot_transfer_between_positions() {
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let mut game = PositionState::russian();
    random_playout(&mut game, 25, &mut rng, |_, _| {});

    let text = game.export_snapshot().to_string();
    let snapshot: BoardSnapshot = text.parse().unwrap();
    let mut remote = PositionState::russian();
    remote.import_snapshot(&snapshot);

    assert_eq!(remote.board(), game.board());
    assert_eq!(remote.side_to_move(), game.side_to_move());
    assert!(!remote.can_undo());

    // a move sent as a record resolves to the same capture on the other side
    if let Some(&mv) = game.legal_moves().first() {
        let record: MoveRecord = MoveRecord::from(mv).to_string().parse().unwrap();
        let resolved = record.resolve(&remote).unwrap();
        assert_eq!(resolved.captured, mv.captured);
    }
}

#[test]
fn test_variant_rules_from_json() {
    let rules: RuleConfig = serde_json::from_str(r#"{"size": 10, "king_flying": false}"#).unwrap();
    rules.validate().unwrap();
    let game = PositionState::new(Arc::new(rules)).unwrap();
    assert_eq!(game.board().pieces().count(), 40);
    assert_eq!(game.legal_moves().len(), 9);
}
