//! The game session state machine.
//!
//! A `GameSession` owns its board and mediates every player action through
//! the move generator. Dark always moves first. Inputs that are rejected
//! leave the session exactly as it was.

use crate::board::{Board, Position};
use crate::config::{Config, PromotionPolicy};
use crate::constants::{Rank, Side};
use crate::error::RuleError;
use crate::events::{Event, EventBus};
use crate::move_apply;
use crate::move_gen;
use crate::movelist::MoveList;
use crate::r#move::Move;
use crate::zobrist;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    /// Too many consecutive plies without a capture or a man moving.
    QuietMoves,
    /// The same position with the same side to move recurred too often.
    Repetition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Won(Side),
    Drawn(DrawReason),
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Won(_) | GameStatus::Drawn(_))
    }

    pub fn winner(self) -> Option<Side> {
        match self {
            GameStatus::Won(side) => Some(side),
            _ => None,
        }
    }
}

/// What happened after a successful `move_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// The same piece must jump again from `from`.
    Continues { from: Position },
    Passed { side_to_move: Side },
    Finished(GameStatus),
}

#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    side_to_move: Side,
    selection: Option<Position>,
    forced_continuation: Option<Position>,
    status: GameStatus,

    promotion_policy: PromotionPolicy,
    quiet_move_limit: u32,
    repetition_limit: u32,

    quiet_plies: u32,
    turn_made_progress: bool,
    repetitions: HashMap<u64, u32>,
    history: Vec<Move>,
    events: EventBus,
}

impl GameSession {
    /// A session in `NotStarted` holding the configured initial board.
    pub fn new(config: &Config) -> Result<Self, RuleError> {
        config.validate()?;
        Ok(Self {
            board: Board::initial(config.board_size)?,
            side_to_move: Side::Dark,
            selection: None,
            forced_continuation: None,
            status: GameStatus::NotStarted,
            promotion_policy: config.promotion_policy,
            quiet_move_limit: config.quiet_move_limit,
            repetition_limit: config.repetition_limit,
            quiet_plies: 0,
            turn_made_progress: false,
            repetitions: HashMap::new(),
            history: Vec::new(),
            events: EventBus::new(config.event_capacity),
        })
    }

    /// `NotStarted -> InProgress` with Dark to move.
    ///
    /// A board on which Dark cannot move is decided immediately.
    #[instrument(level = "debug", skip_all)]
    pub fn start(&mut self, board: Board) -> Result<GameStatus, RuleError> {
        if self.status != GameStatus::NotStarted {
            return Err(RuleError::AlreadyStarted);
        }
        board.check_piece_counts()?;
        self.board = board;
        self.side_to_move = Side::Dark;
        self.selection = None;
        self.forced_continuation = None;
        self.status = GameStatus::InProgress;
        self.quiet_plies = 0;
        self.turn_made_progress = false;
        self.repetitions.clear();
        self.history.clear();
        self.repetitions.insert(self.position_key(), 1);

        debug!(layout = %self.board.to_layout(), "game started");
        self.events.publish(Event::TurnChanged {
            side_to_move: self.side_to_move,
        });
        self.update_status();
        Ok(self.status)
    }

    /// Starts from the standard opening position.
    pub fn start_standard(&mut self) -> Result<GameStatus, RuleError> {
        let board = Board::initial(self.board.size())?;
        self.start(board)
    }

    /// Selects a piece of the side to move and returns its legal moves.
    ///
    /// Not allowed while a capture chain is pending. The returned list may be
    /// empty when another piece has a mandatory capture.
    #[instrument(level = "debug", skip(self))]
    pub fn select(&mut self, position: Position) -> Result<MoveList, RuleError> {
        self.require_in_progress()?;
        if self.forced_continuation.is_some() {
            return Err(RuleError::InvalidSelection {
                position,
                reason: "a capture chain must be continued",
            });
        }
        match self.board.piece_at(position)? {
            Some(piece) if piece.side == self.side_to_move => {}
            Some(_) => {
                return Err(RuleError::InvalidSelection {
                    position,
                    reason: "piece belongs to the opponent",
                });
            }
            None => {
                return Err(RuleError::InvalidSelection {
                    position,
                    reason: "square is empty",
                });
            }
        }
        self.selection = Some(position);
        Ok(self.legal_moves().from_square(position))
    }

    /// Drops the current selection. A pending capture chain keeps its piece selected.
    pub fn clear_selection(&mut self) {
        if self.forced_continuation.is_none() {
            self.selection = None;
        }
    }

    /// Moves the selected piece to `to`.
    #[instrument(level = "debug", skip(self))]
    pub fn move_to(&mut self, to: Position) -> Result<Turn, RuleError> {
        self.require_in_progress()?;
        let from = self.selection.ok_or(RuleError::NoSelection)?;
        let mv = self
            .legal_moves()
            .find(from, to)
            .ok_or(RuleError::IllegalMove { from, to })?;
        let moving_rank = self.board.cell(from).map(|piece| piece.rank);
        let crowned = move_apply::promotes(&self.board, mv);
        let next = move_apply::apply_move(&self.board, self.side_to_move, self.forced_continuation, mv)?;

        self.board = next;
        self.history.push(mv);
        if mv.is_capture() || moving_rank == Some(Rank::Man) {
            self.turn_made_progress = true;
        }
        debug!(side = %self.side_to_move, %mv, crowned, "move applied");
        self.events.publish(Event::BoardChanged { last_move: mv });

        let further = if !mv.is_capture() {
            MoveList::new()
        } else if crowned && self.promotion_policy == PromotionPolicy::EndTurn {
            move_gen::captures_from(&self.board, mv.to, Rank::Man)
        } else {
            move_gen::legal_moves(&self.board, self.side_to_move, Some(mv.to))
        };
        if !further.is_empty() {
            self.forced_continuation = Some(mv.to);
            self.selection = Some(mv.to);
            self.events
                .publish(Event::CaptureChainContinues { from: mv.to });
            return Ok(Turn::Continues { from: mv.to });
        }

        Ok(self.end_turn())
    }

    /// Plays a complete `Move` value: selection and destination in one step.
    ///
    /// Rejects anything not in `legal_moves()`, so a computer opponent can
    /// never push the session into an illegal state.
    pub fn play(&mut self, mv: Move) -> Result<Turn, RuleError> {
        self.require_in_progress()?;
        if !self.legal_moves().contains(&mv) {
            return Err(RuleError::IllegalMove {
                from: mv.from,
                to: mv.to,
            });
        }
        if self.forced_continuation.is_none() {
            self.select(mv.from)?;
        }
        self.move_to(mv.to)
    }

    /// `side` resigns; the opponent wins at once. There is no undo.
    #[instrument(level = "debug", skip(self))]
    pub fn forfeit(&mut self, side: Side) -> Result<GameStatus, RuleError> {
        self.require_in_progress()?;
        self.finish(GameStatus::Won(side.opponent()));
        Ok(self.status)
    }

    /// Current legal moves, restricted to the chaining piece when a chain is pending.
    pub fn legal_moves(&self) -> MoveList {
        if self.status != GameStatus::InProgress {
            return MoveList::new();
        }
        move_gen::legal_moves(&self.board, self.side_to_move, self.forced_continuation)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    pub fn selection(&self) -> Option<Position> {
        self.selection
    }

    pub fn forced_continuation(&self) -> Option<Position> {
        self.forced_continuation
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Every move applied so far, jumps of a chain listed one by one.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn quiet_plies(&self) -> u32 {
        self.quiet_plies
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn require_in_progress(&self) -> Result<(), RuleError> {
        if self.status != GameStatus::InProgress {
            return Err(RuleError::NotInProgress);
        }
        Ok(())
    }

    fn position_key(&self) -> u64 {
        self.board.hash_key() ^ zobrist::side_key(self.side_to_move)
    }

    fn end_turn(&mut self) -> Turn {
        self.selection = None;
        self.forced_continuation = None;
        self.side_to_move = self.side_to_move.opponent();

        if self.turn_made_progress {
            // Positions before a capture or a man move can never recur.
            self.quiet_plies = 0;
            self.repetitions.clear();
        } else {
            self.quiet_plies += 1;
        }
        self.turn_made_progress = false;
        *self.repetitions.entry(self.position_key()).or_insert(0) += 1;

        self.events.publish(Event::TurnChanged {
            side_to_move: self.side_to_move,
        });
        self.update_status();

        if self.status.is_terminal() {
            Turn::Finished(self.status)
        } else {
            Turn::Passed {
                side_to_move: self.side_to_move,
            }
        }
    }

    fn update_status(&mut self) {
        if !move_gen::has_legal_move(&self.board, self.side_to_move) {
            self.finish(GameStatus::Won(self.side_to_move.opponent()));
            return;
        }
        if self.quiet_move_limit > 0 && self.quiet_plies >= self.quiet_move_limit {
            self.finish(GameStatus::Drawn(DrawReason::QuietMoves));
            return;
        }
        let seen = self.repetitions.get(&self.position_key()).copied().unwrap_or(0);
        if self.repetition_limit > 0 && seen >= self.repetition_limit {
            self.finish(GameStatus::Drawn(DrawReason::Repetition));
        }
    }

    fn finish(&mut self, status: GameStatus) {
        self.status = status;
        self.selection = None;
        self.forced_continuation = None;
        info!(?status, plies = self.history.len(), "game over");
        self.events.publish(Event::GameOver { status });
    }
}
