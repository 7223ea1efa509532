//! Game session: one live position, an optional AI opponent, and
//! background searches whose results are re-validated on delivery

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::ai::{pick_move_with, AiPlayer};
use crate::error::{ConfigError, MoveError};
use crate::game::{GameResult, Move, PositionState};
use crate::pieces::Player;
use crate::rules::RuleConfig;
use crate::wire::BoardSnapshot;

// ============================================================================
// PENDING SEARCH
// ============================================================================

/// A search running on a worker thread against a private copy of the position
#[derive(Debug)]
pub struct PendingSearch {
    rx: Receiver<Option<Move>>,
    handle: Option<JoinHandle<()>>,
}

impl PendingSearch {
    /// Block until the worker answers; a dead worker reads as no move
    pub fn wait(mut self) -> Option<Move> {
        let result = self.rx.recv().ok().flatten();
        self.join();
        result
    }

    /// Non-blocking poll: `None` while the worker is still thinking
    pub fn poll(&mut self) -> Option<Option<Move>> {
        match self.rx.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(None)
            }
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("search worker panicked");
            }
        }
    }
}

/// What happened to a delivered search result
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The move was still legal and has been played
    Applied(Move),
    /// The position changed while searching; nothing was played
    Discarded(Move),
    /// The search found nothing to play
    NoMove,
}

// ============================================================================
// GAME SESSION
// ============================================================================

#[derive(Debug)]
pub struct GameSession {
    state: PositionState,
    ai: AiPlayer,
    /// Side the AI plays; None for two local players
    ai_side: Option<Player>,
}

impl GameSession {
    pub fn new(rules: Arc<RuleConfig>, ai: AiPlayer) -> Result<Self, ConfigError> {
        Ok(Self {
            state: PositionState::new(rules)?,
            ai,
            ai_side: None,
        })
    }

    pub fn with_ai_side(mut self, side: Player) -> Self {
        self.ai_side = Some(side);
        self
    }

    pub fn set_ai_side(&mut self, side: Option<Player>) {
        self.ai_side = side;
    }

    pub fn ai_side(&self) -> Option<Player> {
        self.ai_side
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn ai(&self) -> &AiPlayer {
        &self.ai
    }

    pub fn ai_mut(&mut self) -> &mut AiPlayer {
        &mut self.ai
    }

    pub fn result(&self) -> GameResult {
        self.state.result()
    }

    /// True while the game runs and the AI owns the side to move
    pub fn is_ai_turn(&self) -> bool {
        !self.state.is_game_over() && self.ai_side == Some(self.state.side_to_move())
    }

    /// Play a move; a finished game against the AI feeds the learner
    pub fn apply_move(&mut self, mv: Move) -> Result<Move, MoveError> {
        let played = self.state.apply_move(mv)?;
        if self.ai_side.is_some() && self.state.is_game_over() {
            let outcome = self.state.outcome();
            if let Err(e) = self.ai.learn(outcome) {
                tracing::warn!(error = %e, "failed to persist adapted weights");
            }
        }
        Ok(played)
    }

    pub fn undo(&mut self) -> bool {
        self.state.undo()
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    pub fn export_snapshot(&self) -> BoardSnapshot {
        self.state.export_snapshot()
    }

    pub fn import_snapshot(&mut self, snapshot: &BoardSnapshot) {
        self.state.import_snapshot(snapshot);
    }

    /// Pick and play the AI's move on this thread
    pub fn play_ai_move(&mut self) -> Option<Move> {
        let mv = self.ai.pick_move(&self.state)?;
        self.apply_move(mv).ok()
    }

    /// Start searching the current position on a worker thread.
    /// The session stays usable; the result is checked again on delivery.
    pub fn spawn_search(&mut self) -> PendingSearch {
        let snapshot = self.state.detached();
        let difficulty = self.ai.difficulty;
        let weights = self.ai.model().weights();
        let seed = self.ai.next_seed();

        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::spawn(move || {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let roll: f32 = rng.gen();
            let result = pick_move_with(&snapshot, difficulty, weights, roll, &mut rng);
            // receiver may be gone if the caller abandoned the search
            let _ = tx.send(result);
        });

        tracing::debug!(%difficulty, "spawned background search");
        PendingSearch {
            rx,
            handle: Some(handle),
        }
    }

    /// Wait for a search and play its move if still legal here
    pub fn deliver(&mut self, pending: PendingSearch) -> Delivery {
        let result = pending.wait();
        self.accept(result)
    }

    /// Like `deliver`, but returns None if the search has not finished
    pub fn try_deliver(&mut self, pending: &mut PendingSearch) -> Option<Delivery> {
        pending.poll().map(|result| self.accept(result))
    }

    fn accept(&mut self, result: Option<Move>) -> Delivery {
        let Some(mv) = result else {
            return Delivery::NoMove;
        };
        match self.apply_move(mv) {
            Ok(played) => Delivery::Applied(played),
            Err(_) => {
                tracing::debug!(%mv, "discarded stale search result");
                Delivery::Discarded(mv)
            }
        }
    }
}
