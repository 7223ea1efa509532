//! Position evaluation and self-tuning weights

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::game::PositionState;
use crate::pieces::{Piece, Player};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const KEY_MAN: &str = "w_man";
pub const KEY_KING: &str = "w_king";
pub const KEY_MOBILITY: &str = "w_mob";

const MAN_RANGE: (f32, f32) = (0.5, 2.5);
const KING_RANGE: (f32, f32) = (1.5, 6.0);
const MOBILITY_RANGE: (f32, f32) = (0.01, 0.25);

/// Per-game learning rates
const MAN_RATE: f32 = 0.01;
const KING_RATE: f32 = 0.015;
const MOBILITY_RATE: f32 = 0.001;

// ============================================================================
// WEIGHTS
// ============================================================================

/// Evaluation weights
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub man: f32,
    pub king: f32,
    pub mobility: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            man: 1.0,
            king: 3.0,
            mobility: 0.08,
        }
    }
}

impl Weights {
    /// Clamp each weight into its allowed range
    pub fn clamped(self) -> Self {
        Self {
            man: self.man.clamp(MAN_RANGE.0, MAN_RANGE.1),
            king: self.king.clamp(KING_RANGE.0, KING_RANGE.1),
            mobility: self.mobility.clamp(MOBILITY_RANGE.0, MOBILITY_RANGE.1),
        }
    }

    /// Weights nudged toward an outcome (+1, -1 or 0), before clamping
    pub fn nudged(self, outcome: f32) -> Self {
        Self {
            man: self.man + outcome * MAN_RATE,
            king: self.king + outcome * KING_RATE,
            mobility: self.mobility + outcome * MOBILITY_RATE,
        }
    }

    fn value_of(&self, piece: Piece) -> f32 {
        match piece {
            Piece::Empty => 0.0,
            Piece::Man(_) => self.man,
            Piece::King(_) => self.king,
        }
    }
}

// ============================================================================
// STORAGE
// ============================================================================

/// Key-value persistence for weights
pub trait WeightStore: Send {
    fn get(&self, key: &str) -> Option<f32>;

    /// Write all entries in one batch
    fn put_all(&mut self, entries: &[(&str, f32)]) -> anyhow::Result<()>;

    /// Remove every stored entry
    fn clear(&mut self) -> anyhow::Result<()>;
}

/// In-memory store. Clones share the same entries, so a caller can keep a
/// handle to a store it handed to a model.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryEntries>>,
}

#[derive(Debug, Default)]
struct MemoryEntries {
    values: HashMap<String, f32>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put_all` batches written
    pub fn writes(&self) -> usize {
        self.entries().writes
    }

    fn entries(&self) -> MutexGuard<'_, MemoryEntries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WeightStore for MemoryStore {
    fn get(&self, key: &str) -> Option<f32> {
        self.entries().values.get(key).copied()
    }

    fn put_all(&mut self, entries: &[(&str, f32)]) -> anyhow::Result<()> {
        let mut guard = self.entries();
        for &(key, value) in entries {
            guard.values.insert(key.to_string(), value);
        }
        guard.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.entries().values.clear();
        Ok(())
    }
}

// ============================================================================
// EVALUATION MODEL
// ============================================================================

/// Weights plus the store they are persisted to
pub struct EvaluationModel {
    weights: Weights,
    learning: bool,
    store: Box<dyn WeightStore>,
}

impl EvaluationModel {
    /// Read weights from the store; missing keys fall back to defaults
    pub fn load(store: Box<dyn WeightStore>) -> Self {
        let defaults = Weights::default();
        let weights = Weights {
            man: store.get(KEY_MAN).unwrap_or(defaults.man),
            king: store.get(KEY_KING).unwrap_or(defaults.king),
            mobility: store.get(KEY_MOBILITY).unwrap_or(defaults.mobility),
        }
        .clamped();

        Self {
            weights,
            learning: true,
            store,
        }
    }

    /// Default weights, nothing persisted
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn learning(&self) -> bool {
        self.learning
    }

    pub fn set_learning(&mut self, on: bool) {
        self.learning = on;
    }

    pub fn store(&self) -> &dyn WeightStore {
        self.store.as_ref()
    }

    /// Score from the side to move's perspective
    pub fn score(&self, state: &PositionState) -> f32 {
        evaluate(state, &self.weights)
    }

    /// Nudge weights after a finished game (+1 White won, -1 Black won, 0 draw)
    /// and persist them. No-op while learning is disabled.
    pub fn adapt(&mut self, outcome: i8) -> anyhow::Result<()> {
        if !self.learning {
            return Ok(());
        }

        self.weights = self.weights.nudged(outcome as f32).clamped();
        tracing::info!(
            outcome,
            man = self.weights.man,
            king = self.weights.king,
            mobility = self.weights.mobility,
            "adapted evaluation weights"
        );
        self.persist()
    }

    /// Back to defaults, with storage wiped
    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.weights = Weights::default();
        self.store.clear()
    }

    fn persist(&mut self) -> anyhow::Result<()> {
        self.store.put_all(&[
            (KEY_MAN, self.weights.man),
            (KEY_KING, self.weights.king),
            (KEY_MOBILITY, self.weights.mobility),
        ])
    }
}

impl std::fmt::Debug for EvaluationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationModel")
            .field("weights", &self.weights)
            .field("learning", &self.learning)
            .finish()
    }
}

/// Evaluate position from the side to move's perspective:
/// material (White positive) plus signed mobility, negated when Black moves
pub fn evaluate(state: &PositionState, weights: &Weights) -> f32 {
    let mut score = 0.0f32;
    for (_, piece) in state.board().pieces() {
        match piece.owner() {
            Some(Player::White) => score += weights.value_of(piece),
            Some(Player::Black) => score -= weights.value_of(piece),
            None => {}
        }
    }

    let mover = state.side_to_move();
    let sign = if mover == Player::White { 1.0 } else { -1.0 };
    score += sign * state.legal_moves().len() as f32 * weights.mobility;

    score * sign
}
