//! Computer opponents.
//!
//! A strategy only ever picks from the list it is handed, and the session
//! re-validates whatever it picks, so a bad strategy can lose but never cheat.

use crate::board::Board;
use crate::constants::Side;
use crate::error::RuleError;
use crate::movelist::MoveList;
use crate::r#move::Move;
use crate::session::{GameSession, Turn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub trait Strategy {
    /// Picks one of `moves`, or `None` to pass on the decision.
    fn choose(&mut self, board: &Board, side: Side, moves: &MoveList) -> Option<Move>;
}

/// Picks uniformly among the legal moves.
#[derive(Debug, Clone)]
pub struct RandomBot {
    rng: StdRng,
}

impl RandomBot {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomBot {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomBot {
    fn choose(&mut self, _board: &Board, _side: Side, moves: &MoveList) -> Option<Move> {
        moves.as_slice().choose(&mut self.rng).copied()
    }
}

/// Asks `strategy` for the next move of the side to move.
pub fn next_move<S: Strategy + ?Sized>(session: &GameSession, strategy: &mut S) -> Option<Move> {
    let moves = session.legal_moves();
    if moves.is_empty() {
        return None;
    }
    strategy.choose(session.board(), session.side_to_move(), &moves)
}

/// Plays a whole turn for the side to move, following any capture chain.
///
/// Returns the moves played; empty if the game is over or the strategy passed.
pub fn play_turn<S: Strategy + ?Sized>(
    session: &mut GameSession,
    strategy: &mut S,
) -> Result<Vec<Move>, RuleError> {
    let mut played = Vec::new();
    while let Some(mv) = next_move(session, strategy) {
        let turn = session.play(mv)?;
        played.push(mv);
        if !matches!(turn, Turn::Continues { .. }) {
            break;
        }
    }
    Ok(played)
}
