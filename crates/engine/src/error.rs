//! Error types for the rule engine and the wager controller.

use crate::board::Position;
use crate::services::EscrowId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the board, move generator and game session.
///
/// Apart from `Configuration`, these are recoverable input errors: the
/// operation that returned them left the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("position {position} is outside the {size}x{size} board")]
    OutOfBounds { position: Position, size: usize },
    #[error("cannot select {position}: {reason}")]
    InvalidSelection {
        position: Position,
        reason: &'static str,
    },
    #[error("no piece selected")]
    NoSelection,
    #[error("illegal move {from} -> {to}")]
    IllegalMove { from: Position, to: Position },
    #[error("game is not in progress")]
    NotInProgress,
    #[error("game has already started")]
    AlreadyStarted,
    #[error("invalid board layout: {0}")]
    InvalidLayout(String),
}

/// Failures reported by the wallet and settlement capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },
    #[error("network error: {0}")]
    Network(String),
    #[error("escrow {0} was already released")]
    AlreadyReleased(EscrowId),
    #[error("unknown escrow {0}")]
    UnknownEscrow(EscrowId),
    #[error("user rejected the request")]
    UserRejected,
    #[error("timed out waiting for the wallet")]
    Timeout,
    #[error("wallet is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WagerError {
    #[error("stake {stake} outside allowed range {min}..={max}")]
    InvalidStake {
        stake: Decimal,
        min: Decimal,
        max: Decimal,
    },
    #[error("escrow creation failed: {0}")]
    EscrowFailure(#[source] ServiceError),
    #[error("settlement failed: {0}")]
    Settlement(#[source] ServiceError),
    #[error("wallet error: {0}")]
    Wallet(#[source] ServiceError),
    #[error("wager has no escrow yet")]
    NotEscrowed,
    #[error("wager is already escrowed")]
    AlreadyEscrowed,
    #[error("game has not finished")]
    NotFinished,
    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl WagerError {
    /// Financial failures come from an external capability and may be retried;
    /// everything else is a rule or input problem.
    pub fn is_financial(&self) -> bool {
        matches!(
            self,
            WagerError::EscrowFailure(_) | WagerError::Settlement(_) | WagerError::Wallet(_)
        )
    }
}
