//! Defines the representation of a move in the engine.

use crate::board::Position;
use std::fmt;

/// A single step or a single jump.
///
/// A multi-jump is played as a sequence of capture moves by the same piece;
/// further jumps are never embedded in the move itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub captured: Option<Position>,
}

impl Move {
    /// Creates a non-capturing diagonal step.
    pub const fn simple(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            captured: None,
        }
    }

    /// Creates a jump from `from` over `captured` to `to`.
    pub const fn capture(from: Position, captured: Position, to: Position) -> Self {
        Self {
            from,
            to,
            captured: Some(captured),
        }
    }

    /// Checks if the move is a capture.
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.is_capture() { 'x' } else { '-' };
        write!(f, "{}{}{}", self.from, sep, self.to)
    }
}
