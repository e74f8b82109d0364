//! Applies validated moves to a board.

use crate::board::Board;
use crate::board::Position;
use crate::constants::{Rank, Side, initial_piece_count};
use crate::error::RuleError;
use crate::move_gen;
use crate::r#move::Move;

/// Returns the board after `mv`, leaving `board` untouched.
///
/// The move is checked against `legal_moves(board, side, forced_from)` first;
/// anything else is rejected with `IllegalMove`. A man reaching its
/// promotion row is crowned before this returns.
pub fn apply_move(
    board: &Board,
    side: Side,
    forced_from: Option<Position>,
    mv: Move,
) -> Result<Board, RuleError> {
    if !move_gen::legal_moves(board, side, forced_from).contains(&mv) {
        return Err(RuleError::IllegalMove {
            from: mv.from,
            to: mv.to,
        });
    }
    Ok(apply_unchecked(board, mv))
}

/// Whether playing `mv` on `board` crowns the moving piece.
pub fn promotes(board: &Board, mv: Move) -> bool {
    match board.piece_at(mv.from) {
        Ok(Some(piece)) => {
            piece.rank == Rank::Man && mv.to.row as usize == piece.side.promotion_row(board.size())
        }
        _ => false,
    }
}

/// Relocation, capture removal and promotion without legality checks.
pub(crate) fn apply_unchecked(board: &Board, mv: Move) -> Board {
    let mut next = board.clone();
    let Some(mut piece) = next.cell(mv.from) else {
        panic!("apply_unchecked called with empty origin {}", mv.from);
    };

    next.set_piece(mv.from, None);
    if let Some(captured) = mv.captured {
        next.set_piece(captured, None);
    }
    if mv.to.row as usize == piece.side.promotion_row(next.size()) {
        piece = piece.promoted();
    }
    next.set_piece(mv.to, Some(piece));

    debug_assert!(next.count(piece.side.opponent()) <= initial_piece_count(next.size()));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Piece;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    #[test]
    fn test_capture_removes_jumped_piece() {
        let board = Board::from_layout("8/8/8/8/3l4/2d5/8/8").unwrap();
        let mv = Move::capture(Position::new(5, 2), Position::new(4, 3), Position::new(3, 4));
        let next = apply_move(&board, Side::Dark, None, mv).unwrap();

        assert_eq!(next.piece_at(Position::new(5, 2)).unwrap(), None);
        assert_eq!(next.piece_at(Position::new(4, 3)).unwrap(), None);
        assert_eq!(
            next.piece_at(Position::new(3, 4)).unwrap(),
            Some(Piece::man(Side::Dark))
        );
        assert_eq!(next.count(Side::Light), 0);
        // Input board is not mutated.
        assert_eq!(board.count(Side::Light), 1);
    }

    #[test]
    fn test_rejects_simple_move_when_capture_exists() {
        let board = Board::from_layout("8/8/8/8/3l4/2d5/8/8").unwrap();
        let mv = Move::simple(Position::new(5, 2), Position::new(4, 1));
        assert_eq!(
            apply_move(&board, Side::Dark, None, mv),
            Err(RuleError::IllegalMove {
                from: Position::new(5, 2),
                to: Position::new(4, 1)
            })
        );
    }

    #[test]
    fn test_rejects_moves_for_wrong_side_and_fabricated_captures() {
        let board = Board::initial(8).unwrap();
        let light_move = Move::simple(Position::new(2, 1), Position::new(3, 0));
        assert!(apply_move(&board, Side::Dark, None, light_move).is_err());

        let fake = Move::capture(Position::new(5, 0), Position::new(4, 1), Position::new(3, 2));
        assert!(apply_move(&board, Side::Dark, None, fake).is_err());
    }

    #[test]
    fn test_promotion_on_far_row() {
        let board = Board::from_layout("8/2d5/8/8/8/8/8/8").unwrap();
        let mv = Move::simple(Position::new(1, 2), Position::new(0, 1));
        assert!(promotes(&board, mv));
        let next = apply_move(&board, Side::Dark, None, mv).unwrap();
        assert_eq!(
            next.piece_at(Position::new(0, 1)).unwrap(),
            Some(Piece::king(Side::Dark))
        );

        let light = Board::from_layout("8/8/8/8/8/8/3l4/8").unwrap();
        let mv = Move::simple(Position::new(6, 3), Position::new(7, 4));
        let next = apply_move(&light, Side::Light, None, mv).unwrap();
        assert_eq!(
            next.piece_at(Position::new(7, 4)).unwrap(),
            Some(Piece::king(Side::Light))
        );
    }

    #[test]
    fn test_king_is_never_demoted() {
        let board = Board::from_layout("1D6/8/8/8/8/8/8/8").unwrap();
        let mv = Move::simple(Position::new(0, 1), Position::new(1, 2));
        assert!(!promotes(&board, mv));
        let next = apply_move(&board, Side::Dark, None, mv).unwrap();
        assert_eq!(
            next.piece_at(Position::new(1, 2)).unwrap(),
            Some(Piece::king(Side::Dark))
        );
    }

    #[test]
    fn test_every_legal_move_relocates_own_piece() {
        let mut rng = StdRng::seed_from_u64(7);
        for _game in 0..20 {
            let mut board = Board::initial(8).unwrap();
            let mut side = Side::Dark;
            for _ply in 0..120 {
                let moves = move_gen::legal_moves(&board, side, None);
                let captures = move_gen::capture_moves(&board, side);
                if !captures.is_empty() {
                    assert_eq!(moves.as_slice(), captures.as_slice());
                }
                let Some(&mv) = moves.as_slice().choose(&mut rng) else {
                    break;
                };
                let next = apply_move(&board, side, None, mv).unwrap();
                let landed = next.piece_at(mv.to).unwrap().unwrap();
                assert_eq!(landed.side, side);
                assert_eq!(next.piece_at(mv.from).unwrap(), None);
                board = next;
                side = side.opponent();
            }
        }
    }
}
