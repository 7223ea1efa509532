//! Board snapshots and move records exchanged with collaborators

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::board::{Board, Square};
use crate::error::WireError;
use crate::game::{Move, PositionState};
use crate::pieces::{Piece, Player};

// ============================================================================
// BOARD SNAPSHOT
// ============================================================================

/// Row-major piece indices (empty, white man, white king, black man,
/// black king) plus the side to move
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    #[serde(deserialize_with = "sanitized_cells")]
    pub cells: Vec<u8>,
    pub white_to_move: bool,
}

/// Any integer is accepted; unknown indices become empty squares
fn sanitized_cells<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<i64>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|idx| Piece::from_index(idx).index()).collect())
}

impl BoardSnapshot {
    /// Build a board of `size`; short input is padded with empty squares,
    /// extra values and unknown indices are ignored
    pub fn decode(&self, size: u8) -> Board {
        let n = size as usize;
        let mut board = Board::empty(size);
        for (i, &idx) in self.cells.iter().take(n * n).enumerate() {
            let sq = Square::new((i % n) as i8, (i / n) as i8);
            board.set(sq, Piece::from_index(idx as i64));
        }
        board
    }

    pub fn side_to_move(&self) -> Player {
        if self.white_to_move {
            Player::White
        } else {
            Player::Black
        }
    }
}

impl fmt::Display for BoardSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", if self.white_to_move { 1 } else { 0 })?;
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}

impl FromStr for BoardSnapshot {
    type Err = WireError;

    /// `"<1|0>|c0,c1,..."`; values that fail to parse decode to empty
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (side, cells) = s.trim().split_once('|').ok_or(WireError::MissingSeparator)?;
        let cells = cells
            .split(',')
            .filter(|c| !c.trim().is_empty())
            .map(|c| {
                let idx = c.trim().parse::<i64>().unwrap_or(0);
                Piece::from_index(idx).index()
            })
            .collect();

        Ok(Self {
            cells,
            white_to_move: side.trim() == "1",
        })
    }
}

impl PositionState {
    pub fn export_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cells: self.board().cells().iter().map(|p| p.index()).collect(),
            white_to_move: self.side_to_move() == Player::White,
        }
    }

    /// Replace the position; chain marker and undo history are always reset
    pub fn import_snapshot(&mut self, snapshot: &BoardSnapshot) {
        let board = snapshot.decode(self.rules().size);
        self.load_board(board, snapshot.side_to_move());
    }
}

// ============================================================================
// MOVE RECORD
// ============================================================================

/// Source and destination only; the receiver re-derives captures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveRecord {
    pub from_x: i8,
    pub from_y: i8,
    pub to_x: i8,
    pub to_y: i8,
}

impl MoveRecord {
    pub fn from_square(&self) -> Square {
        Square::new(self.from_x, self.from_y)
    }

    pub fn to_square(&self) -> Square {
        Square::new(self.to_x, self.to_y)
    }

    /// Match against the local legal set, recovering the capture
    pub fn resolve(&self, state: &PositionState) -> Option<Move> {
        let (from, to) = (self.from_square(), self.to_square());
        state
            .legal_moves()
            .into_iter()
            .find(|m| m.from == from && m.to == to)
    }
}

impl From<Move> for MoveRecord {
    fn from(mv: Move) -> Self {
        Self {
            from_x: mv.from.x,
            from_y: mv.from.y,
            to_x: mv.to.x,
            to_y: mv.to.y,
        }
    }
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.from_x, self.from_y, self.to_x, self.to_y)
    }
}

impl FromStr for MoveRecord {
    type Err = WireError;

    /// `"fx fy tx ty"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() != 4 {
            return Err(WireError::MoveArity(parts.len()));
        }
        let mut coords = [0i8; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| WireError::BadCoordinate(part.to_string()))?;
        }
        Ok(Self {
            from_x: coords[0],
            from_y: coords[1],
            to_x: coords[2],
            to_y: coords[3],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_text_form() {
        let game = PositionState::russian();
        let snap = game.export_snapshot();
        assert_eq!(snap.cells.len(), 64);
        let text = snap.to_string();
        assert!(text.starts_with("1|0,3,0,3"));
        assert_eq!(text.parse::<BoardSnapshot>().unwrap(), snap);
    }

    #[test]
    fn test_import_sanitizes() {
        let mut game = PositionState::russian();
        let snap: BoardSnapshot = "0|0,9,-1,x,0,0,0,0,0,0,0,1".parse().unwrap();
        game.import_snapshot(&snap);

        assert_eq!(game.side_to_move(), Player::Black);
        assert_eq!(game.piece_at(Square::new(1, 0)), Piece::Empty);
        assert_eq!(game.piece_at(Square::new(3, 0)), Piece::Empty);
        // index 11 is (3,1): even square, cleared
        assert_eq!(game.board().pieces().count(), 0);
        assert!(!game.can_undo());
        assert_eq!(game.chain_square(), None);
    }

    #[test]
    fn test_import_resets_history_and_chain() {
        let mut game = PositionState::russian();
        let mv = game.legal_moves()[0];
        game.apply_move(mv).unwrap();
        let snap = game.export_snapshot();

        let mut other = PositionState::russian();
        other.import_snapshot(&snap);
        assert_eq!(other.board(), game.board());
        assert_eq!(other.side_to_move(), Player::Black);
        assert!(!other.can_undo());
    }

    #[test]
    fn test_json_snapshot_sanitizes_out_of_range() {
        let snap: BoardSnapshot =
            serde_json::from_str(r#"{"cells":[0,-1,0,300,0,0,0,2],"white_to_move":true}"#).unwrap();
        assert_eq!(snap.cells, vec![0, 0, 0, 0, 0, 0, 0, 2]);

        let mut game = PositionState::russian();
        game.import_snapshot(&snap);
        assert_eq!(game.piece_at(Square::new(1, 0)), Piece::Empty);
        assert_eq!(game.piece_at(Square::new(3, 0)), Piece::Empty);
        assert_eq!(game.piece_at(Square::new(7, 0)), Piece::King(Player::White));
        assert_eq!(game.board().pieces().count(), 1);
    }

    #[test]
    fn test_snapshot_missing_separator() {
        assert_eq!("1,0,0".parse::<BoardSnapshot>(), Err(WireError::MissingSeparator));
    }

    #[test]
    fn test_move_record_resolves_capture() {
        let mut game = PositionState::russian();
        let snap: BoardSnapshot = {
            let mut cells = vec![0u8; 64];
            cells[5 * 8 + 2] = 1; // white man (2,5)
            cells[4 * 8 + 3] = 3; // black man (3,4)
            cells[8] = 3; // black man (0,1)
            BoardSnapshot { cells, white_to_move: true }
        };
        game.import_snapshot(&snap);

        let record: MoveRecord = "2 5 4 3".parse().unwrap();
        let mv = record.resolve(&game).unwrap();
        assert_eq!(mv.captured, Some(Square::new(3, 4)));
        assert_eq!(MoveRecord::from(mv), record);
        assert_eq!(record.to_string(), "2 5 4 3");

        let stale: MoveRecord = "2 5 1 4".parse().unwrap();
        assert!(stale.resolve(&game).is_none());
    }

    #[test]
    fn test_move_record_errors() {
        assert_eq!("1 2 3".parse::<MoveRecord>(), Err(WireError::MoveArity(3)));
        assert!(matches!("1 2 3 z".parse::<MoveRecord>(), Err(WireError::BadCoordinate(_))));
    }
}
