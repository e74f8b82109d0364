//! The board representation for the draughts engine.
//!
//! Cells are stored row-major in a fixed array sized for the largest
//! supported board. Row 0 is Light's back rank, row `size - 1` is Dark's.

use crate::constants::{
    MAX_BOARD_SIZE, MAX_CELLS, MIN_BOARD_SIZE, Piece, Side, initial_piece_count,
};
use crate::error::RuleError;
use crate::zobrist;
use std::fmt;

/// Contents of a single cell: `None` when empty.
pub type Cell = Option<Piece>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn is_playable(self) -> bool {
        is_playable_square(self)
    }

    /// Steps `(dr, dc)` away, or `None` if that leaves a `size`x`size` board.
    pub fn offset(self, dr: i8, dc: i8, size: usize) -> Option<Position> {
        let row = self.row as isize + dr as isize;
        let col = self.col as isize + dc as isize;
        if row < 0 || col < 0 || row >= size as isize || col >= size as isize {
            return None;
        }
        Some(Position::new(row as u8, col as u8))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Only dark squares, where `row + col` is odd, ever hold pieces.
pub fn is_playable_square(position: Position) -> bool {
    (position.row as usize + position.col as usize) % 2 == 1
}

fn check_size(size: usize) -> Result<(), RuleError> {
    if size % 2 != 0 || size < MIN_BOARD_SIZE || size > MAX_BOARD_SIZE {
        return Err(RuleError::Configuration(format!(
            "board size must be even and within {MIN_BOARD_SIZE}..={MAX_BOARD_SIZE}, got {size}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: [Cell; MAX_CELLS],
    hash_key: u64,
}

impl Board {
    /// An empty board. Fails with `Configuration` on an odd or out-of-range size.
    pub fn empty(size: usize) -> Result<Self, RuleError> {
        check_size(size)?;
        Ok(Self {
            size,
            cells: [None; MAX_CELLS],
            hash_key: 0,
        })
    }

    /// The standard starting position: each side fills its home rows' dark squares.
    pub fn initial(size: usize) -> Result<Self, RuleError> {
        let mut board = Board::empty(size)?;
        for row in 0..size {
            for col in 0..size {
                let pos = Position::new(row as u8, col as u8);
                if !pos.is_playable() {
                    continue;
                }
                if Side::Dark.is_home_row(row, size) {
                    board.set_piece(pos, Some(Piece::man(Side::Dark)));
                } else if Side::Light.is_home_row(row, size) {
                    board.set_piece(pos, Some(Piece::man(Side::Light)));
                }
            }
        }
        Ok(board)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hash of the piece placement only; combine with `zobrist::side_key` for a full position key.
    pub fn hash_key(&self) -> u64 {
        self.hash_key
    }

    pub fn contains(&self, position: Position) -> bool {
        (position.row as usize) < self.size && (position.col as usize) < self.size
    }

    pub fn piece_at(&self, position: Position) -> Result<Cell, RuleError> {
        if !self.contains(position) {
            return Err(RuleError::OutOfBounds {
                position,
                size: self.size,
            });
        }
        Ok(self.cell(position))
    }

    /// Unchecked read for positions already known to be on the board.
    #[inline]
    pub(crate) fn cell(&self, position: Position) -> Cell {
        self.cells[self.idx(position)]
    }

    #[inline]
    fn idx(&self, position: Position) -> usize {
        position.row as usize * self.size + position.col as usize
    }

    /// Places (or clears, with `None`) a cell. Pieces may only go on playable squares.
    pub fn place(&mut self, position: Position, cell: Cell) -> Result<(), RuleError> {
        if !self.contains(position) {
            return Err(RuleError::OutOfBounds {
                position,
                size: self.size,
            });
        }
        if cell.is_some() && !position.is_playable() {
            return Err(RuleError::InvalidLayout(format!(
                "{position} is not a playable square"
            )));
        }
        self.set_piece(position, cell);
        Ok(())
    }

    pub(crate) fn set_piece(&mut self, position: Position, cell: Cell) {
        let idx = self.idx(position);
        if let Some(old) = self.cells[idx] {
            self.hash_key ^= zobrist::piece_key(old, idx);
        }
        if let Some(new) = cell {
            self.hash_key ^= zobrist::piece_key(new, idx);
        }
        self.cells[idx] = cell;
    }

    /// All pieces of `side` in row-major order.
    pub fn pieces(&self, side: Side) -> impl Iterator<Item = (Position, Piece)> + '_ {
        (0..self.size * self.size).filter_map(move |idx| {
            let piece = self.cells[idx]?;
            if piece.side != side {
                return None;
            }
            Some((
                Position::new((idx / self.size) as u8, (idx % self.size) as u8),
                piece,
            ))
        })
    }

    pub fn count(&self, side: Side) -> usize {
        self.pieces(side).count()
    }

    /// Parses a layout such as `"1l1l/4/4/d1d1"`.
    ///
    /// Rows are listed from row 0, separated by `/`; digits are runs of empty
    /// cells, `d`/`D` are Dark men/kings and `l`/`L` Light men/kings.
    pub fn from_layout(layout: &str) -> Result<Self, RuleError> {
        let rows: Vec<&str> = layout.trim().split('/').collect();
        let size = rows.len();
        let mut board = Board::empty(size)
            .map_err(|_| RuleError::InvalidLayout(format!("unsupported row count {size}")))?;

        for (r, row) in rows.iter().enumerate() {
            let mut col = 0usize;
            let mut run = 0usize;
            for ch in row.chars() {
                if let Some(digit) = ch.to_digit(10) {
                    run = run
                        .checked_mul(10)
                        .and_then(|run| run.checked_add(digit as usize))
                        .filter(|run| col + run <= size)
                        .ok_or_else(|| RuleError::InvalidLayout(format!("row {r} is too long")))?;
                    continue;
                }
                col += run;
                run = 0;
                let piece = Piece::from_layout_char(ch)
                    .ok_or_else(|| RuleError::InvalidLayout(format!("unknown piece '{ch}'")))?;
                if col >= size {
                    return Err(RuleError::InvalidLayout(format!("row {r} is too long")));
                }
                board.place(Position::new(r as u8, col as u8), Some(piece))?;
                col += 1;
            }
            col += run;
            if col != size {
                return Err(RuleError::InvalidLayout(format!(
                    "row {r} has {col} cells, expected {size}"
                )));
            }
        }

        board.check_piece_counts()?;
        Ok(board)
    }

    /// Neither side may have more pieces than it starts with.
    pub fn check_piece_counts(&self) -> Result<(), RuleError> {
        let limit = initial_piece_count(self.size);
        for side in [Side::Dark, Side::Light] {
            if self.count(side) > limit {
                return Err(RuleError::InvalidLayout(format!(
                    "{side} has more than {limit} pieces"
                )));
            }
        }
        Ok(())
    }

    pub fn to_layout(&self) -> String {
        let mut layout = String::with_capacity(self.size * (self.size + 1));
        for r in 0..self.size {
            let mut empty_count = 0;
            for c in 0..self.size {
                match self.cell(Position::new(r as u8, c as u8)) {
                    None => empty_count += 1,
                    Some(piece) => {
                        if empty_count > 0 {
                            layout.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        layout.push(piece.to_layout_char());
                    }
                }
            }
            if empty_count > 0 {
                layout.push_str(&empty_count.to_string());
            }
            if r + 1 < self.size {
                layout.push('/');
            }
        }
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Rank;

    #[test]
    fn test_initial_board_layout() {
        let board = Board::initial(8).unwrap();
        assert_eq!(board.count(Side::Dark), 12);
        assert_eq!(board.count(Side::Light), 12);
        assert!(board.pieces(Side::Dark).all(|(pos, piece)| {
            pos.is_playable() && pos.row >= 5 && piece.rank == Rank::Man
        }));
        assert!(board.pieces(Side::Light).all(|(pos, _)| pos.is_playable() && pos.row <= 2));
        assert_eq!(board.piece_at(Position::new(3, 0)).unwrap(), None);
    }

    #[test]
    fn test_invalid_sizes_are_configuration_errors() {
        for size in [0, 2, 7, 14] {
            assert!(matches!(Board::initial(size), Err(RuleError::Configuration(_))));
        }
        assert_eq!(Board::initial(10).unwrap().count(Side::Light), 20);
    }

    #[test]
    fn test_piece_at_out_of_bounds() {
        let board = Board::initial(8).unwrap();
        assert_eq!(
            board.piece_at(Position::new(8, 1)),
            Err(RuleError::OutOfBounds {
                position: Position::new(8, 1),
                size: 8
            })
        );
    }

    #[test]
    fn test_playable_parity() {
        assert!(is_playable_square(Position::new(0, 1)));
        assert!(is_playable_square(Position::new(5, 2)));
        assert!(!is_playable_square(Position::new(4, 4)));
    }

    #[test]
    fn test_layout_matches_initial() {
        let board = Board::initial(8).unwrap();
        let layout = board.to_layout();
        assert_eq!(
            layout,
            "1l1l1l1l/l1l1l1l1/1l1l1l1l/8/8/d1d1d1d1/1d1d1d1d/d1d1d1d1"
        );
        assert_eq!(Board::from_layout(&layout).unwrap(), board);
    }

    #[test]
    fn test_layout_rejects_light_squares_and_overfull_sides() {
        assert!(matches!(
            Board::from_layout("l3/4/4/4"),
            Err(RuleError::InvalidLayout(_))
        ));
        assert!(matches!(
            Board::from_layout("1l1l/l3/4/4"),
            Err(RuleError::InvalidLayout(_))
        ));
        assert!(matches!(
            Board::from_layout("1l1l/4/4"),
            Err(RuleError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_layout_rejects_oversized_empty_runs() {
        for layout in [
            "99999999999999999999/8/8/8/8/8/8/8",
            "9/8/8/8/8/8/8/8",
            "1l7/8/8/8/8/8/8/8",
        ] {
            assert!(matches!(
                Board::from_layout(layout),
                Err(RuleError::InvalidLayout(_))
            ));
        }
        assert!(Board::from_layout("8/8/8/8/8/8/8/8").is_ok());
    }

    #[test]
    fn test_piece_counts_on_placed_board() {
        let mut board = Board::empty(4).unwrap();
        assert!(board.check_piece_counts().is_ok());
        for pos in [(0, 1), (0, 3), (1, 0)] {
            board
                .place(Position::new(pos.0, pos.1), Some(Piece::man(Side::Light)))
                .unwrap();
        }
        assert!(matches!(
            board.check_piece_counts(),
            Err(RuleError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_hash_tracks_placement() {
        let mut board = Board::empty(8).unwrap();
        let empty_hash = board.hash_key();
        board.place(Position::new(5, 2), Some(Piece::man(Side::Dark))).unwrap();
        assert_ne!(board.hash_key(), empty_hash);
        board.place(Position::new(5, 2), None).unwrap();
        assert_eq!(board.hash_key(), empty_hash);
    }
}
