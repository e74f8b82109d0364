pub mod board;
pub mod bot;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod mock;
pub mod move_apply;
pub mod move_gen;
pub mod movelist;
pub mod r#move;
pub mod services;
pub mod session;
pub mod wager;
pub mod zobrist;

pub use board::{Board, Position};
pub use config::{Config, PromotionPolicy};
pub use constants::{Piece, Rank, Side};
pub use error::{RuleError, ServiceError, WagerError};
pub use r#move::Move;
pub use session::{DrawReason, GameSession, GameStatus, Turn};
pub use wager::{Escrows, Players, SharedWager, WagerController, WagerSession, WagerState};
