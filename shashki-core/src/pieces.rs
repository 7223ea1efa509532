//! Piece and color definitions

use serde::{Deserialize, Serialize};

/// Player color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    White = 0,
    Black = 1,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::White => Player::Black,
            Player::Black => Player::White,
        }
    }

    /// Vertical direction of this side's men (White moves toward y = 0)
    pub fn forward(self) -> i8 {
        match self {
            Player::White => -1,
            Player::Black => 1,
        }
    }

    /// Row on which this side's men are crowned
    pub fn promotion_row(self, size: u8) -> i8 {
        match self {
            Player::White => 0,
            Player::Black => size as i8 - 1,
        }
    }
}

/// Contents of a square
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    #[default]
    Empty,
    Man(Player),
    King(Player),
}

/// Snapshot index order: empty, white man, white king, black man, black king
pub const PIECE_KINDS: [Piece; 5] = [
    Piece::Empty,
    Piece::Man(Player::White),
    Piece::King(Player::White),
    Piece::Man(Player::Black),
    Piece::King(Player::Black),
];

impl Piece {
    pub fn owner(self) -> Option<Player> {
        match self {
            Piece::Empty => None,
            Piece::Man(p) | Piece::King(p) => Some(p),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Piece::Empty
    }

    pub fn is_king(self) -> bool {
        matches!(self, Piece::King(_))
    }

    pub fn is_man(self) -> bool {
        matches!(self, Piece::Man(_))
    }

    pub fn belongs_to(self, player: Player) -> bool {
        self.owner() == Some(player)
    }

    /// Crowned version of this piece (kings and empty squares are unchanged)
    pub fn promoted(self) -> Self {
        match self {
            Piece::Man(p) => Piece::King(p),
            other => other,
        }
    }

    /// Index into [`PIECE_KINDS`]
    pub fn index(self) -> u8 {
        match self {
            Piece::Empty => 0,
            Piece::Man(Player::White) => 1,
            Piece::King(Player::White) => 2,
            Piece::Man(Player::Black) => 3,
            Piece::King(Player::Black) => 4,
        }
    }

    /// Decode a snapshot index; unknown values become empty
    pub fn from_index(idx: i64) -> Self {
        usize::try_from(idx)
            .ok()
            .and_then(|i| PIECE_KINDS.get(i).copied())
            .unwrap_or(Piece::Empty)
    }

    pub fn symbol(self) -> char {
        match self {
            Piece::Empty => '.',
            Piece::Man(Player::White) => 'w',
            Piece::King(Player::White) => 'W',
            Piece::Man(Player::Black) => 'b',
            Piece::King(Player::Black) => 'B',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order() {
        for (i, kind) in PIECE_KINDS.iter().enumerate() {
            assert_eq!(kind.index() as usize, i);
            assert_eq!(Piece::from_index(i as i64), *kind);
        }
    }

    #[test]
    fn test_out_of_range_decodes_empty() {
        assert_eq!(Piece::from_index(-1), Piece::Empty);
        assert_eq!(Piece::from_index(5), Piece::Empty);
        assert_eq!(Piece::from_index(i64::MAX), Piece::Empty);
    }

    #[test]
    fn test_promotion() {
        assert_eq!(Piece::Man(Player::Black).promoted(), Piece::King(Player::Black));
        assert_eq!(Piece::King(Player::White).promoted(), Piece::King(Player::White));
        assert_eq!(Piece::Empty.promoted(), Piece::Empty);
    }
}
