//! Configuration for the draughts engine and wager controller.

use crate::constants::{DEFAULT_BOARD_SIZE, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::error::RuleError;
use rust_decimal::Decimal;

/// What a man crowned in the middle of a capture chain may do for the rest of that turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromotionPolicy {
    /// The chain is re-examined with king movement straight away.
    #[default]
    ContinueAsKing,
    /// The piece keeps its man pattern until its next turn. A man on the far
    /// row has no forward jumps, so in practice crowning ends the turn.
    EndTurn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Board
    pub board_size: usize,
    pub promotion_policy: PromotionPolicy,

    // Draw rules; 0 disables the rule.
    pub quiet_move_limit: u32,
    pub repetition_limit: u32,

    // Wager bounds, in whole tokens
    pub min_wager: Decimal,
    pub max_wager: Decimal,
    pub fee_basis_points: u32,

    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            promotion_policy: PromotionPolicy::default(),
            quiet_move_limit: 80,
            repetition_limit: 3,
            min_wager: Decimal::from(5),
            max_wager: Decimal::from(1000),
            fee_basis_points: 100,
            event_capacity: 64,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), RuleError> {
        let size = self.board_size;
        if size % 2 != 0 || !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(RuleError::Configuration(format!(
                "board size must be even and within {MIN_BOARD_SIZE}..={MAX_BOARD_SIZE}, got {size}"
            )));
        }
        if self.repetition_limit == 1 {
            return Err(RuleError::Configuration(
                "repetition limit of 1 would draw every position".to_string(),
            ));
        }
        if self.min_wager.is_sign_negative() || self.min_wager > self.max_wager {
            return Err(RuleError::Configuration(format!(
                "wager bounds {}..={} are inconsistent",
                self.min_wager, self.max_wager
            )));
        }
        if self.fee_basis_points > 10_000 {
            return Err(RuleError::Configuration(format!(
                "fee of {} basis points exceeds 100%",
                self.fee_basis_points
            )));
        }
        if self.event_capacity == 0 {
            return Err(RuleError::Configuration(
                "event capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
