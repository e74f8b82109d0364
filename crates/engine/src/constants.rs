//! Constants used in the draughts engine.

// --- Board Geometry ---
pub const DEFAULT_BOARD_SIZE: usize = 8;
pub const MIN_BOARD_SIZE: usize = 4;
pub const MAX_BOARD_SIZE: usize = 12;
pub const MAX_CELLS: usize = MAX_BOARD_SIZE * MAX_BOARD_SIZE;

/// The four diagonal steps as (row delta, col delta).
pub const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

const DARK_MAN_STEPS: [(i8, i8); 2] = [(-1, -1), (-1, 1)];
const LIGHT_MAN_STEPS: [(i8, i8); 2] = [(1, -1), (1, 1)];

/// Rows each side fills at the start: 3 on 8x8, 4 on 10x10.
pub const fn rows_per_side(size: usize) -> usize {
    size / 2 - 1
}

/// Starting piece count per side. No side may ever hold more than this.
pub const fn initial_piece_count(size: usize) -> usize {
    rows_per_side(size) * (size / 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Man,
    King,
}

/// The content of an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub side: Side,
    pub rank: Rank,
}

impl Side {
    /// Get the opponent of the current side.
    pub fn opponent(self) -> Side {
        match self {
            Side::Dark => Side::Light,
            Side::Light => Side::Dark,
        }
    }

    /// Dark starts on the bottom rows and moves toward row 0; Light the reverse.
    pub fn promotion_row(self, size: usize) -> usize {
        match self {
            Side::Dark => 0,
            Side::Light => size - 1,
        }
    }

    /// Whether `row` belongs to this side's starting block.
    pub fn is_home_row(self, row: usize, size: usize) -> bool {
        match self {
            Side::Dark => row >= size - rows_per_side(size),
            Side::Light => row < rows_per_side(size),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Dark => 0,
            Side::Light => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Dark => write!(f, "Dark"),
            Side::Light => write!(f, "Light"),
        }
    }
}

impl Piece {
    pub const fn new(side: Side, rank: Rank) -> Self {
        Self { side, rank }
    }

    pub const fn man(side: Side) -> Self {
        Self::new(side, Rank::Man)
    }

    pub const fn king(side: Side) -> Self {
        Self::new(side, Rank::King)
    }

    pub fn is_king(self) -> bool {
        self.rank == Rank::King
    }

    /// The same piece with the king rank. Kings stay kings.
    pub fn promoted(self) -> Self {
        Self::king(self.side)
    }

    /// Diagonal steps the piece may take when moving or jumping as `rank`.
    pub fn steps_as(self, rank: Rank) -> &'static [(i8, i8)] {
        match (rank, self.side) {
            (Rank::King, _) => &DIAGONALS,
            (Rank::Man, Side::Dark) => &DARK_MAN_STEPS,
            (Rank::Man, Side::Light) => &LIGHT_MAN_STEPS,
        }
    }

    pub fn steps(self) -> &'static [(i8, i8)] {
        self.steps_as(self.rank)
    }

    /// Gets the index into the Zobrist key table for a given piece.
    pub fn zobrist_idx(self) -> usize {
        let rank_idx = match self.rank {
            Rank::Man => 0,
            Rank::King => 1,
        };
        self.side.index() * 2 + rank_idx
    }

    pub fn to_layout_char(self) -> char {
        match (self.side, self.rank) {
            (Side::Dark, Rank::Man) => 'd',
            (Side::Dark, Rank::King) => 'D',
            (Side::Light, Rank::Man) => 'l',
            (Side::Light, Rank::King) => 'L',
        }
    }

    pub fn from_layout_char(c: char) -> Option<Piece> {
        match c {
            'd' => Some(Piece::man(Side::Dark)),
            'D' => Some(Piece::king(Side::Dark)),
            'l' => Some(Piece::man(Side::Light)),
            'L' => Some(Piece::king(Side::Light)),
            _ => None,
        }
    }
}
