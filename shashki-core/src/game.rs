//! Position state, move generation and state transition

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Square, DIAGONALS};
use crate::error::{ConfigError, MoveError};
use crate::pieces::{Piece, Player};
use crate::rules::RuleConfig;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default number of snapshots kept for undo
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Game result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Ongoing,
    WhiteWins,
    BlackWins,
}

/// A single step: quiet move or one jump of a capture chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub captured: Option<Square>,
    /// Set when the move is applied, never by generation
    pub promotes: bool,
}

impl Move {
    pub fn quiet(from: Square, to: Square) -> Self {
        Self { from, to, captured: None, promotes: false }
    }

    pub fn capture(from: Square, to: Square, captured: Square) -> Self {
        Self { from, to, captured: Some(captured), promotes: false }
    }

    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    pub fn capture_count(&self) -> usize {
        usize::from(self.captured.is_some())
    }

    /// Same source and destination; captures are derived from these
    pub fn same_path(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.is_capture() { 'x' } else { '-' };
        write!(f, "{}{}{}", self.from, sep, self.to)?;
        if self.promotes {
            write!(f, "=K")?;
        }
        Ok(())
    }
}

/// Everything undo has to put back
#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    board: Board,
    side_to_move: Player,
    chain: Option<Square>,
    pending: Vec<Square>,
}

// ============================================================================
// POSITION STATE
// ============================================================================

/// Board, side to move, capture-chain marker and undo history
#[derive(Clone, Debug)]
pub struct PositionState {
    rules: Arc<RuleConfig>,
    board: Board,
    side_to_move: Player,
    /// Square of the piece that must continue capturing
    chain: Option<Square>,
    /// Captured pieces awaiting removal (deferred-removal variant only)
    pending: Vec<Square>,
    history: VecDeque<Snapshot>,
    history_limit: usize,
}

impl PositionState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// New game in the starting layout, White to move
    pub fn new(rules: Arc<RuleConfig>) -> Result<Self, ConfigError> {
        rules.validate()?;
        let board = Self::starting_board(&rules);
        Ok(Self::assemble(rules, board, Player::White))
    }

    /// Russian draughts starting position
    pub fn russian() -> Self {
        let rules = Arc::new(RuleConfig::russian());
        let board = Self::starting_board(&rules);
        Self::assemble(rules, board, Player::White)
    }

    /// Arbitrary board; non-playable squares are cleared
    pub fn from_board(rules: Arc<RuleConfig>, board: Board, side_to_move: Player) -> Result<Self, ConfigError> {
        rules.validate()?;
        Ok(Self::assemble(rules, board, side_to_move))
    }

    /// Position from a piece list, e.g. for puzzles and tests
    pub fn with_pieces(
        rules: Arc<RuleConfig>,
        side_to_move: Player,
        pieces: &[(Square, Piece)],
    ) -> Result<Self, ConfigError> {
        rules.validate()?;
        let mut board = Board::empty(rules.size);
        for &(sq, piece) in pieces {
            board.set(sq, piece);
        }
        Ok(Self::assemble(rules, board, side_to_move))
    }

    /// Rules must already be validated: coordinates are `i8`
    fn assemble(rules: Arc<RuleConfig>, board: Board, side_to_move: Player) -> Self {
        let mut state = Self {
            board: Board::empty(rules.size),
            rules,
            side_to_move,
            chain: None,
            pending: Vec::new(),
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        };
        state.load_board(board, side_to_move);
        state
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.trim_history();
        self
    }

    fn starting_board(rules: &RuleConfig) -> Board {
        let n = rules.size as i8;
        let rows = rules.home_rows() as i8;
        let mut board = Board::empty(rules.size);
        for y in 0..n {
            for x in 0..n {
                let sq = Square::new(x, y);
                if !sq.is_playable() {
                    continue;
                }
                if y < rows {
                    board.set(sq, Piece::Man(Player::Black));
                } else if y >= n - rows {
                    board.set(sq, Piece::Man(Player::White));
                }
            }
        }
        board
    }

    /// Restore the starting layout and forget history
    pub fn reset(&mut self) {
        let board = Self::starting_board(&self.rules);
        self.load_board(board, Player::White);
    }

    /// Replace the board wholesale; chain, pending and history are reset
    pub(crate) fn load_board(&mut self, board: Board, side_to_move: Player) {
        let mut clean = Board::empty(self.rules.size);
        for (sq, piece) in board.pieces() {
            if clean.is_usable(sq) {
                clean.set(sq, piece);
            }
        }
        self.board = clean;
        self.side_to_move = side_to_move;
        self.chain = None;
        self.pending.clear();
        self.history.clear();
    }

    /// Copy for speculative play: same position, no undo history
    pub fn detached(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            board: self.board.clone(),
            side_to_move: self.side_to_move,
            chain: self.chain,
            pending: self.pending.clone(),
            history: VecDeque::new(),
            history_limit: self.history_limit,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn rules(&self) -> &Arc<RuleConfig> {
        &self.rules
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    /// Square that must continue capturing, if a chain is in progress
    pub fn chain_square(&self) -> Option<Square> {
        self.chain
    }

    /// Captured pieces still on the board (deferred-removal variant)
    pub fn pending_captures(&self) -> &[Square] {
        &self.pending
    }

    pub fn piece_at(&self, sq: Square) -> Piece {
        self.board.get(sq)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // ========================================================================
    // MOVE GENERATION
    // ========================================================================

    /// Complete legal-move set for the side to move
    pub fn legal_moves(&self) -> Vec<Move> {
        if let Some(sq) = self.chain {
            let continuations = self.captures_from(sq);
            if !continuations.is_empty() {
                return self.apply_max_capture(continuations);
            }
        }

        let mut captures = Vec::new();
        for (sq, piece) in self.board.pieces() {
            if piece.belongs_to(self.side_to_move) {
                self.generate_captures(sq, piece, &mut captures);
            }
        }

        if self.rules.mandatory_capture && !captures.is_empty() {
            return self.apply_max_capture(captures);
        }

        let mut moves = captures;
        for (sq, piece) in self.board.pieces() {
            if piece.belongs_to(self.side_to_move) {
                self.generate_quiet_moves(sq, piece, &mut moves);
            }
        }
        moves
    }

    /// Legal moves starting on one square
    pub fn legal_moves_from(&self, sq: Square) -> Vec<Move> {
        self.legal_moves()
            .into_iter()
            .filter(|m| m.from == sq)
            .collect()
    }

    /// Captures available to the piece on `sq`
    pub fn captures_from(&self, sq: Square) -> Vec<Move> {
        let mut out = Vec::new();
        self.generate_captures(sq, self.board.get(sq), &mut out);
        out
    }

    fn apply_max_capture(&self, captures: Vec<Move>) -> Vec<Move> {
        if !self.rules.max_capture_rule || captures.len() < 2 {
            return captures;
        }
        let lengths: Vec<usize> = captures.iter().map(|m| self.chain_length(m)).collect();
        let longest = lengths.iter().copied().max().unwrap_or(0);
        captures
            .into_iter()
            .zip(lengths)
            .filter(|&(_, len)| len == longest)
            .map(|(m, _)| m)
            .collect()
    }

    /// Number of captures in the longest chain that starts with `mv`
    pub fn chain_length(&self, mv: &Move) -> usize {
        if !mv.is_capture() {
            return 0;
        }
        let mut probe = self.detached();
        probe.play(*mv);
        match probe.chain {
            Some(sq) if probe.side_to_move == self.side_to_move => {
                1 + probe
                    .captures_from(sq)
                    .iter()
                    .map(|next| probe.chain_length(next))
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        }
    }

    /// Enemy piece that may still be jumped
    fn is_capturable(&self, sq: Square, mover: Player) -> bool {
        self.board.get(sq).belongs_to(mover.opponent()) && !self.pending.contains(&sq)
    }

    fn is_open(&self, sq: Square) -> bool {
        self.board.is_usable(sq) && self.board.get(sq).is_empty()
    }

    fn man_may_capture_toward(&self, owner: Player, dy: i8) -> bool {
        dy == owner.forward()
            || self.rules.man_captures_backward
            || !self.rules.man_moves_forward_only
    }

    fn generate_captures(&self, from: Square, piece: Piece, out: &mut Vec<Move>) {
        let owner = match piece.owner() {
            Some(p) => p,
            None => return,
        };

        for &dir in &DIAGONALS {
            if piece.is_king() && self.rules.flying_king_capture() {
                self.generate_flying_capture(from, owner, dir, out);
                continue;
            }
            if piece.is_man() && !self.man_may_capture_toward(owner, dir.1) {
                continue;
            }
            let victim = from.offset(dir, 1);
            let landing = from.offset(dir, 2);
            if self.is_open(landing) && self.is_capturable(victim, owner) {
                out.push(Move::capture(from, landing, victim));
            }
        }
    }

    fn generate_flying_capture(&self, from: Square, owner: Player, dir: (i8, i8), out: &mut Vec<Move>) {
        let mut victim = from.offset(dir, 1);
        while self.is_open(victim) {
            victim = victim.offset(dir, 1);
        }
        if !self.board.is_usable(victim) || !self.is_capturable(victim, owner) {
            return;
        }

        let mut landing = victim.offset(dir, 1);
        while self.is_open(landing) {
            out.push(Move::capture(from, landing, victim));
            landing = landing.offset(dir, 1);
        }
    }

    fn generate_quiet_moves(&self, from: Square, piece: Piece, out: &mut Vec<Move>) {
        let owner = match piece.owner() {
            Some(p) => p,
            None => return,
        };

        for &dir in &DIAGONALS {
            if piece.is_man() {
                if self.rules.man_moves_forward_only && dir.1 != owner.forward() {
                    continue;
                }
                let to = from.offset(dir, 1);
                if self.is_open(to) {
                    out.push(Move::quiet(from, to));
                }
                continue;
            }

            let mut to = from.offset(dir, 1);
            while self.is_open(to) {
                out.push(Move::quiet(from, to));
                if !self.rules.king_flying {
                    break;
                }
                to = to.offset(dir, 1);
            }
        }
    }

    // ========================================================================
    // APPLY MOVE
    // ========================================================================

    /// Validate against the current legal set and apply.
    ///
    /// Only source and destination of `mv` are consulted; the capture is
    /// taken from the matching generated move. Returns the applied move with
    /// its promotion flag set.
    pub fn apply_move(&mut self, mv: Move) -> Result<Move, MoveError> {
        let chosen = match self.legal_moves().into_iter().find(|m| m.same_path(&mv)) {
            Some(m) => m,
            None => {
                tracing::debug!(from = %mv.from, to = %mv.to, "rejected illegal move");
                return Err(MoveError::Illegal { from: mv.from, to: mv.to });
            }
        };

        self.record();
        Ok(self.play(chosen))
    }

    /// Apply a move known to be legal, without recording history
    pub(crate) fn play(&mut self, mut mv: Move) -> Move {
        let mover = self.side_to_move;
        let piece = self.board.take(mv.from);
        self.board.set(mv.to, piece);

        if let Some(victim) = mv.captured {
            if self.rules.remove_captured_at_end_of_chain {
                self.pending.push(victim);
            } else {
                self.board.take(victim);
            }
        }

        let reached_far_row = piece.is_man() && mv.to.y == mover.promotion_row(self.rules.size);
        let crowned_now = reached_far_row && (self.rules.promote_immediate || !mv.is_capture());
        if crowned_now {
            self.board.set(mv.to, piece.promoted());
            mv.promotes = true;
        }

        if mv.is_capture() {
            let may_continue = !crowned_now || self.rules.continue_capture_as_king_when_promoted;
            if may_continue && !self.captures_from(mv.to).is_empty() {
                tracing::debug!(at = %mv.to, "capture chain continues");
                self.chain = Some(mv.to);
                return mv;
            }
            if self.chain.is_some() {
                tracing::debug!(at = %mv.to, "capture chain ended");
            }

            if reached_far_row && !crowned_now {
                self.board.set(mv.to, piece.promoted());
                mv.promotes = true;
            }
            for victim in self.pending.drain(..) {
                self.board.take(victim);
            }
        }

        self.chain = None;
        self.side_to_move = mover.opponent();
        mv
    }

    fn record(&mut self) {
        self.history.push_back(Snapshot {
            board: self.board.clone(),
            side_to_move: self.side_to_move,
            chain: self.chain,
            pending: self.pending.clone(),
        });
        self.trim_history();
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// Step back one applied move. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_back() {
            Some(snap) => {
                self.board = snap.board;
                self.side_to_move = snap.side_to_move;
                self.chain = snap.chain;
                self.pending = snap.pending;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // GAME END
    // ========================================================================

    /// The side to move has no legal moves
    pub fn is_game_over(&self) -> bool {
        self.legal_moves().is_empty()
    }

    /// Side to move loses when it cannot move; draws are never detected
    pub fn result(&self) -> GameResult {
        if !self.is_game_over() {
            return GameResult::Ongoing;
        }
        match self.side_to_move {
            Player::White => GameResult::BlackWins,
            Player::Black => GameResult::WhiteWins,
        }
    }

    pub fn winner(&self) -> Option<Player> {
        match self.result() {
            GameResult::WhiteWins => Some(Player::White),
            GameResult::BlackWins => Some(Player::Black),
            GameResult::Ongoing => None,
        }
    }

    /// +1 White won, -1 Black won, 0 otherwise
    pub fn outcome(&self) -> i8 {
        match self.result() {
            GameResult::WhiteWins => 1,
            GameResult::BlackWins => -1,
            GameResult::Ongoing => 0,
        }
    }

    // ========================================================================
    // PERFT
    // ========================================================================

    /// Count leaf nodes of the move tree; every chain step is one ply
    pub fn perft(&self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        moves
            .into_iter()
            .map(|mv| {
                let mut child = self.detached();
                child.play(mv);
                child.perft(depth - 1)
            })
            .sum()
    }
}

// ============================================================================
// TESTS
// ============================================================================
