//! Board geometry: squares, diagonals and the value-type grid

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pieces::Piece;

/// Board square in (x, y) coordinates, y = 0 is Black's home edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub x: i8,
    pub y: i8,
}

impl Square {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Dark square check; only these ever hold pieces
    pub fn is_playable(&self) -> bool {
        (self.x + self.y).rem_euclid(2) == 1
    }

    /// Step `distance` squares along a diagonal
    pub fn offset(&self, (dx, dy): (i8, i8), distance: i8) -> Square {
        Square::new(self.x + dx * distance, self.y + dy * distance)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Diagonal direction vectors (dx, dy)
/// Index: 0=up-left, 1=up-right, 2=down-left, 3=down-right
pub const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// N×N grid of pieces, row-major. Cloning yields an independent copy.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    size: u8,
    cells: Vec<Piece>,
}

impl Board {
    /// Empty board of the given size
    pub fn empty(size: u8) -> Self {
        let n = size as usize;
        Self {
            size,
            cells: vec![Piece::Empty; n * n],
        }
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    /// Check if a square lies inside the grid
    pub fn contains(&self, sq: Square) -> bool {
        let n = self.size as i8;
        sq.x >= 0 && sq.y >= 0 && sq.x < n && sq.y < n
    }

    /// On the grid and on a dark square
    pub fn is_usable(&self, sq: Square) -> bool {
        self.contains(sq) && sq.is_playable()
    }

    fn index(&self, sq: Square) -> usize {
        sq.y as usize * self.size as usize + sq.x as usize
    }

    /// Piece at a square; anything off the grid reads as empty
    pub fn get(&self, sq: Square) -> Piece {
        if self.contains(sq) {
            self.cells[self.index(sq)]
        } else {
            Piece::Empty
        }
    }

    pub fn set(&mut self, sq: Square, piece: Piece) {
        if self.contains(sq) {
            let idx = self.index(sq);
            self.cells[idx] = piece;
        }
    }

    /// Remove and return the piece at a square
    pub fn take(&mut self, sq: Square) -> Piece {
        let piece = self.get(sq);
        self.set(sq, Piece::Empty);
        piece
    }

    /// Iterate occupied squares in row-major order
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        let n = self.size as usize;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty())
            .map(move |(i, &p)| (Square::new((i % n) as i8, (i / n) as i8), p))
    }

    /// Raw cells in row-major order
    pub fn cells(&self) -> &[Piece] {
        &self.cells
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.size as i8;
        write!(f, "   ")?;
        for x in 0..n {
            write!(f, "{:>2}", x)?;
        }
        writeln!(f)?;
        for y in 0..n {
            write!(f, "{:>2} ", y)?;
            for x in 0..n {
                let sq = Square::new(x, y);
                let c = match self.get(sq) {
                    Piece::Empty if sq.is_playable() => '.',
                    Piece::Empty => ' ',
                    piece => piece.symbol(),
                };
                write!(f, " {}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
