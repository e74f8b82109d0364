//! Legal move generation.
//!
//! Captures are mandatory: whenever any piece of the side to move can jump,
//! only jumps are legal. Kings step and jump one diagonal at a time; there
//! are no long-range ("flying") kings.

use crate::board::{Board, Position};
use crate::constants::{Rank, Side};
use crate::movelist::MoveList;
use crate::r#move::Move;

/// Legal moves for `side`.
///
/// With `forced_from` set, only jumps by the piece on that square are
/// returned (the continuation of a multi-jump); an empty list means the
/// chain is over. Output order is row-major by origin, then by direction.
pub fn legal_moves(board: &Board, side: Side, forced_from: Option<Position>) -> MoveList {
    if let Some(from) = forced_from {
        let mut moves = MoveList::new();
        if let Some(piece) = own_piece(board, side, from) {
            add_captures_from(board, from, piece.rank, &mut moves);
        }
        return moves;
    }

    let captures = capture_moves(board, side);
    if !captures.is_empty() {
        return captures;
    }
    simple_moves(board, side)
}

/// Every jump available to `side`, ignoring the mandatory-capture filter.
pub fn capture_moves(board: &Board, side: Side) -> MoveList {
    let mut moves = MoveList::new();
    for (from, piece) in board.pieces(side) {
        add_captures_from(board, from, piece.rank, &mut moves);
    }
    moves
}

/// Every one-step diagonal move available to `side`.
pub fn simple_moves(board: &Board, side: Side) -> MoveList {
    let mut moves = MoveList::new();
    for (from, piece) in board.pieces(side) {
        for &(dr, dc) in piece.steps() {
            if let Some(to) = from.offset(dr, dc, board.size()) {
                if board.cell(to).is_none() {
                    moves.add(Move::simple(from, to));
                }
            }
        }
    }
    moves
}

/// Jumps from `from` for the piece there, treating it as `moving_as`.
///
/// Used for capture chains where the piece was just crowned but keeps its
/// man pattern until the next turn.
pub fn captures_from(board: &Board, from: Position, moving_as: Rank) -> MoveList {
    let mut moves = MoveList::new();
    if board.contains(from) && board.cell(from).is_some() {
        add_captures_from(board, from, moving_as, &mut moves);
    }
    moves
}

/// Whether `side` has at least one legal move, without building the full list.
pub fn has_legal_move(board: &Board, side: Side) -> bool {
    let size = board.size();
    board.pieces(side).any(|(from, piece)| {
        piece.steps().iter().any(|&(dr, dc)| {
            let Some(over) = from.offset(dr, dc, size) else {
                return false;
            };
            match board.cell(over) {
                None => true,
                Some(victim) if victim.side != side => from
                    .offset(dr * 2, dc * 2, size)
                    .is_some_and(|to| board.cell(to).is_none()),
                Some(_) => false,
            }
        })
    })
}

fn own_piece(board: &Board, side: Side, pos: Position) -> Option<crate::constants::Piece> {
    if !board.contains(pos) {
        return None;
    }
    board.cell(pos).filter(|piece| piece.side == side)
}

fn add_captures_from(board: &Board, from: Position, moving_as: Rank, moves: &mut MoveList) {
    let Some(piece) = board.cell(from) else {
        return;
    };
    let size = board.size();
    for &(dr, dc) in piece.steps_as(moving_as) {
        let Some(over) = from.offset(dr, dc, size) else {
            continue;
        };
        let Some(to) = from.offset(dr * 2, dc * 2, size) else {
            continue;
        };
        let jumps_opponent = matches!(board.cell(over), Some(victim) if victim.side != piece.side);
        if jumps_opponent && board.cell(to).is_none() {
            moves.add(Move::capture(from, over, to));
        }
    }
}
