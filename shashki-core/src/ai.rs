//! Negamax alpha-beta search, difficulty levels and the AI player

use std::fmt;
use std::str::FromStr;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::eval::{evaluate, EvaluationModel, Weights};
use crate::game::{Move, PositionState};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Root-only bonus per captured piece
pub const CAPTURE_BONUS: f32 = 0.35;

/// Search window bound
const INFINITY: f32 = 1e9;

// ============================================================================
// DIFFICULTY
// ============================================================================

/// Difficulty level: random-move probability and search depth
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    /// Probability of playing a uniformly random legal move
    pub fn epsilon(self) -> f32 {
        match self {
            Difficulty::Easy => 0.35,
            Difficulty::Normal => 0.15,
            Difficulty::Hard => 0.05,
        }
    }

    pub fn depth(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 4,
        }
    }

    /// Persisted integer level; unknown values read as Normal
    pub fn from_level(level: i32) -> Self {
        match level {
            0 => Difficulty::Easy,
            2 => Difficulty::Hard,
            _ => Difficulty::Normal,
        }
    }

    pub fn level(self) -> i32 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Normal => 1,
            Difficulty::Hard => 2,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

impl FromStr for Difficulty {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(WireError::UnknownDifficulty(other.to_string())),
        }
    }
}

// ============================================================================
// SEARCH ENGINE
// ============================================================================

/// Depth-bounded negamax over private copies of a position
#[derive(Clone, Copy, Debug)]
pub struct SearchEngine {
    pub depth: u32,
    pub weights: Weights,
}

impl SearchEngine {
    pub fn new(depth: u32, weights: Weights) -> Self {
        Self { depth, weights }
    }

    /// Best move for the side to move, or None when the game is over
    pub fn best_move(&self, state: &PositionState) -> Option<Move> {
        let mut best: Option<(Move, f32)> = None;
        for (mv, score) in self.score_root_moves(state) {
            // strict comparison keeps the first of equal candidates
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((mv, score));
            }
        }
        best.map(|(mv, _)| mv)
    }

    /// Every legal root move with its searched score, capture bonus included
    pub fn score_root_moves(&self, state: &PositionState) -> Vec<(Move, f32)> {
        let depth = self.depth as i32;
        state
            .legal_moves()
            .into_iter()
            .map(|mv| {
                let score = child_score(state, mv, depth, -INFINITY, INFINITY, &self.weights);
                (mv, score + mv.capture_count() as f32 * CAPTURE_BONUS)
            })
            .collect()
    }

    /// Evaluate a position to this engine's depth
    pub fn search(&self, state: &PositionState) -> f32 {
        negamax(state, self.depth as i32, -INFINITY, INFINITY, &self.weights)
    }
}

// ============================================================================
// NEGAMAX WITH ALPHA-BETA
// ============================================================================

fn negamax(state: &PositionState, depth: i32, mut alpha: f32, beta: f32, weights: &Weights) -> f32 {
    if depth <= 0 {
        return evaluate(state, weights);
    }

    let moves = state.legal_moves();
    if moves.is_empty() {
        return evaluate(state, weights);
    }

    let mut best = -INFINITY;
    for mv in moves {
        let score = child_score(state, mv, depth, alpha, beta, weights);

        best = best.max(score);
        alpha = alpha.max(best);

        if alpha >= beta {
            break;
        }
    }

    best
}

/// Score of `mv` from the parent mover's perspective.
///
/// A chain continuation keeps the same mover, so its value is taken as is
/// and it spends no depth: the whole chain is one turn.
fn child_score(
    state: &PositionState,
    mv: Move,
    depth: i32,
    alpha: f32,
    beta: f32,
    weights: &Weights,
) -> f32 {
    let mut child = state.detached();
    child.play(mv);

    if child.side_to_move() != state.side_to_move() {
        -negamax(&child, depth - 1, -beta, -alpha, weights)
    } else {
        negamax(&child, depth, alpha, beta, weights)
    }
}

// ============================================================================
// AI PLAYER
// ============================================================================

/// Difficulty-driven move picker backed by a learning evaluation model
#[derive(Debug)]
pub struct AiPlayer {
    pub difficulty: Difficulty,
    model: EvaluationModel,
    rng: ChaCha8Rng,
}

impl AiPlayer {
    pub fn new(difficulty: Difficulty, model: EvaluationModel) -> Self {
        Self {
            difficulty,
            model,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_seed(difficulty: Difficulty, model: EvaluationModel, seed: u64) -> Self {
        Self {
            difficulty,
            model,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn model(&self) -> &EvaluationModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut EvaluationModel {
        &mut self.model
    }

    /// Search engine configured for the current difficulty and weights
    pub fn engine(&self) -> SearchEngine {
        SearchEngine::new(self.difficulty.depth(), self.model.weights())
    }

    /// Pick a move: random with probability epsilon, otherwise searched
    pub fn pick_move(&mut self, state: &PositionState) -> Option<Move> {
        let roll: f32 = self.rng.gen();
        pick_move_with(state, self.difficulty, self.model.weights(), roll, &mut self.rng)
    }

    /// Adapt weights from a finished game (+1 White won, -1 Black won)
    pub fn learn(&mut self, outcome: i8) -> anyhow::Result<()> {
        self.model.adapt(outcome)
    }

    /// Fresh seed derived from this player's generator
    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen()
    }
}

/// Shared by the player and background searches
pub(crate) fn pick_move_with<R: Rng>(
    state: &PositionState,
    difficulty: Difficulty,
    weights: Weights,
    roll: f32,
    rng: &mut R,
) -> Option<Move> {
    let moves = state.legal_moves();
    if moves.is_empty() {
        return None;
    }

    if roll < difficulty.epsilon() {
        return moves.choose(rng).copied();
    }

    SearchEngine::new(difficulty.depth(), weights).best_move(state)
}

// ============================================================================
// TESTS
// ============================================================================
