//! Error types

use thiserror::Error;

use crate::board::Square;

/// Rejected move: not in the freshly generated legal set. State is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move {from} -> {to}")]
    Illegal { from: Square, to: Square },
}

/// Invalid rule configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("board size {0} is not supported (expected an even size in 4..=16)")]
    BadSize(u8),
}

/// Malformed snapshot or move-record text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("snapshot is missing the '|' separator")]
    MissingSeparator,
    #[error("move record needs 4 coordinates, got {0}")]
    MoveArity(usize),
    #[error("bad coordinate '{0}'")]
    BadCoordinate(String),
    #[error("unknown difficulty '{0}' (expected easy, normal or hard)")]
    UnknownDifficulty(String),
}
