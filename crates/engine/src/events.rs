//! Observation points for a UI shell.
//!
//! The engine publishes; a UI subscribes and re-renders. Publishing with
//! no subscribers is fine, and slow subscribers drop the oldest events.

use crate::board::Position;
use crate::constants::Side;
use crate::r#move::Move;
use crate::session::GameStatus;
use crate::wager::Escrows;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WagerPhase {
    Escrowed,
    Settled,
    Forfeited,
    Refunded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BoardChanged { last_move: Move },
    TurnChanged { side_to_move: Side },
    CaptureChainContinues { from: Position },
    GameOver { status: GameStatus },
    WagerStateChanged { escrows: Escrows, phase: WagerPhase },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) {
        // An error only means nobody is listening right now.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
