//! A move list implementation that avoids heap allocations.

use crate::board::Position;
use crate::r#move::Move;
use std::ops::Index;

/// Upper bound on moves in one position: at most 30 pieces per side on the
/// largest board, each with at most four options.
const MAX_MOVES: usize = 128;

const NULL_MOVE: Move = Move::simple(Position::new(0, 0), Position::new(0, 0));

#[derive(Debug, Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    count: usize,
}

impl PartialEq for MoveList {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for MoveList {}

impl MoveList {
    pub fn new() -> Self {
        Self {
            moves: [NULL_MOVE; MAX_MOVES],
            count: 0,
        }
    }

    pub fn add(&mut self, mv: Move) {
        debug_assert!(self.count < MAX_MOVES, "move list overflow");
        if self.count < MAX_MOVES {
            self.moves[self.count] = mv;
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_slice(&self) -> &[Move] {
        &self.moves[0..self.count]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }

    pub fn contains(&self, mv: &Move) -> bool {
        self.as_slice().contains(mv)
    }

    /// The move from `from` landing on `to`, if listed.
    pub fn find(&self, from: Position, to: Position) -> Option<Move> {
        self.iter().copied().find(|mv| mv.from == from && mv.to == to)
    }

    /// Moves whose origin is `from`.
    pub fn from_square(&self, from: Position) -> MoveList {
        let mut filtered = MoveList::new();
        for mv in self.iter().filter(|mv| mv.from == from) {
            filtered.add(*mv);
        }
        filtered
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for MoveList {
    type Output = Move;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
