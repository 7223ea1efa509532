//! SHASHKI Core - Russian draughts engine
//!
//! This crate provides the core game logic for SHASHKI:
//! - Board geometry (square grid, dark squares only)
//! - Configurable rule variants
//! - Move generation with capture chains, undo and terminal detection
//! - Position evaluation with self-tuning weights
//! - Negamax alpha-beta AI with difficulty levels
//! - Game sessions with background search handoff
//! - Board snapshot and move record codecs

pub mod board;
pub mod pieces;
pub mod rules;
pub mod game;
pub mod eval;
pub mod ai;
pub mod session;
pub mod wire;
pub mod error;

// Re-exports for convenient access
pub use board::{Board, Square, DIAGONALS};
pub use pieces::{Piece, Player};
pub use rules::RuleConfig;
pub use game::{GameResult, Move, PositionState, DEFAULT_HISTORY_LIMIT};
pub use eval::{evaluate, EvaluationModel, MemoryStore, WeightStore, Weights};
pub use ai::{AiPlayer, Difficulty, SearchEngine, CAPTURE_BONUS};
pub use session::{Delivery, GameSession, PendingSearch};
pub use wire::{BoardSnapshot, MoveRecord};
pub use error::{ConfigError, MoveError, WireError};
