//! Wager lifecycle: escrow before play, settlement when the game ends.
//!
//! ```text
//! Pending --escrow--> Escrowed --Won--> Settled
//!                              --forfeit--> Forfeited
//!                              --Drawn--> Refunded
//! ```
//!
//! Each player locks their own stake in a separate escrow. The winner
//! receives both; a draw returns each stake to its payer.
//!
//! Once a wager leaves `Escrowed` it never changes again, so repeated
//! settlement or forfeit requests are answered with the recorded outcome and
//! never reach the settlement service a second time.

use crate::board::{Board, Position};
use crate::config::Config;
use crate::constants::Side;
use crate::error::{ServiceError, WagerError};
use crate::events::{Event, WagerPhase};
use crate::movelist::MoveList;
use crate::r#move::Move;
use crate::services::{Address, EscrowId, Receipt, SettlementService, WalletSession};
use crate::session::{GameSession, GameStatus, Turn};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Players {
    pub dark: Address,
    pub light: Address,
}

impl Players {
    pub fn new(dark: Address, light: Address) -> Self {
        Self { dark, light }
    }

    pub fn address_of(&self, side: Side) -> &Address {
        match side {
            Side::Dark => &self.dark,
            Side::Light => &self.light,
        }
    }
}

/// The two escrows backing a wager, one per player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escrows {
    pub dark: EscrowId,
    pub light: EscrowId,
}

impl Escrows {
    pub fn of(&self, side: Side) -> &EscrowId {
        match side {
            Side::Dark => &self.dark,
            Side::Light => &self.light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WagerState {
    Pending,
    Escrowed {
        escrows: Escrows,
    },
    Settled {
        escrows: Escrows,
        winner: Side,
        receipts: Vec<Receipt>,
    },
    Forfeited {
        escrows: Escrows,
        loser: Side,
        receipts: Vec<Receipt>,
    },
    Refunded {
        escrows: Escrows,
        receipts: Vec<Receipt>,
    },
}

impl WagerState {
    /// True once both escrows have been paid out or refunded.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            WagerState::Settled { .. } | WagerState::Forfeited { .. } | WagerState::Refunded { .. }
        )
    }

    pub fn escrows(&self) -> Option<&Escrows> {
        match self {
            WagerState::Pending => None,
            WagerState::Escrowed { escrows }
            | WagerState::Settled { escrows, .. }
            | WagerState::Forfeited { escrows, .. }
            | WagerState::Refunded { escrows, .. } => Some(escrows),
        }
    }

    /// Receipts of a closed wager. Escrows the service reported as already
    /// paid out have none.
    pub fn receipts(&self) -> &[Receipt] {
        match self {
            WagerState::Settled { receipts, .. }
            | WagerState::Forfeited { receipts, .. }
            | WagerState::Refunded { receipts, .. } => receipts,
            WagerState::Pending | WagerState::Escrowed { .. } => &[],
        }
    }
}

/// One wagered match: stake, players, the game and where the money stands.
#[derive(Debug)]
pub struct WagerSession {
    stake: Decimal,
    players: Players,
    opening: Board,
    game: GameSession,
    state: WagerState,
    forfeited_by: Option<Side>,
    // Escrows closed so far, indexed by payer side; survives a failed settlement.
    closed: [bool; 2],
    receipts: Vec<Receipt>,
}

impl WagerSession {
    /// Each player's stake.
    pub fn stake(&self) -> Decimal {
        self.stake
    }

    /// Total locked across both escrows.
    pub fn pot(&self) -> Decimal {
        self.stake * Decimal::TWO
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    pub fn state(&self) -> &WagerState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.game.subscribe()
    }

    /// Selects a piece. Only allowed once the stakes are escrowed.
    pub fn select(&mut self, position: Position) -> Result<MoveList, WagerError> {
        self.require_escrowed()?;
        Ok(self.game.select(position)?)
    }

    fn require_escrowed(&self) -> Result<(), WagerError> {
        match self.state {
            WagerState::Pending => Err(WagerError::NotEscrowed),
            _ => Ok(()),
        }
    }

    fn publish(&self, escrows: &Escrows, phase: WagerPhase) {
        self.game.events().publish(Event::WagerStateChanged {
            escrows: escrows.clone(),
            phase,
        });
    }
}

/// Drives wagers against a settlement service.
#[derive(Debug)]
pub struct WagerController<S> {
    config: Config,
    settlement: S,
}

impl<S: SettlementService> WagerController<S> {
    pub fn new(config: Config, settlement: S) -> Result<Self, WagerError> {
        config.validate()?;
        Ok(Self { config, settlement })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    /// Has the wallet sign a challenge for its current address.
    #[instrument(skip_all)]
    pub async fn authenticate<W: WalletSession>(&self, wallet: &W) -> Result<Address, WagerError> {
        let address = wallet
            .current_address()
            .ok_or(WagerError::Wallet(ServiceError::NotConnected))?;
        let challenge = format!("draughts-wager login {address}");
        wallet.sign(challenge.as_bytes()).await.map_err(|err| {
            warn!(%address, %err, "wallet refused to sign");
            WagerError::Wallet(err)
        })?;
        info!(%address, "wallet authenticated");
        Ok(address)
    }

    fn check_stake(&self, stake: Decimal) -> Result<(), WagerError> {
        if stake < self.config.min_wager || stake > self.config.max_wager {
            return Err(WagerError::InvalidStake {
                stake,
                min: self.config.min_wager,
                max: self.config.max_wager,
            });
        }
        Ok(())
    }

    /// A `Pending` wager on the standard opening. Nothing is escrowed yet.
    pub fn open(&self, stake: Decimal, players: Players) -> Result<WagerSession, WagerError> {
        let opening = Board::initial(self.config.board_size)?;
        self.open_with_board(stake, players, opening)
    }

    /// Like `open`, but the game will start from `opening`.
    pub fn open_with_board(
        &self,
        stake: Decimal,
        players: Players,
        opening: Board,
    ) -> Result<WagerSession, WagerError> {
        self.check_stake(stake)?;
        Ok(WagerSession {
            stake,
            players,
            opening,
            game: GameSession::new(&self.config)?,
            state: WagerState::Pending,
            forfeited_by: None,
            closed: [false; 2],
            receipts: Vec::new(),
        })
    }

    /// Locks each player's stake, Dark first, and starts the game.
    ///
    /// If Light's escrow fails, Dark's is refunded before the error is returned.
    #[instrument(skip_all, fields(stake = %wager.stake))]
    pub async fn escrow(&self, wager: &mut WagerSession) -> Result<Escrows, WagerError> {
        if wager.state != WagerState::Pending {
            return Err(WagerError::AlreadyEscrowed);
        }
        let dark = self.lock_stake(wager, Side::Dark).await?;
        let light = match self.lock_stake(wager, Side::Light).await {
            Ok(id) => id,
            Err(err) => {
                if let Err(refund) = self.settlement.refund_escrow(&dark).await {
                    warn!(escrow_id = %dark, %refund, "could not return Dark's stake");
                }
                return Err(err);
            }
        };

        let escrows = Escrows { dark, light };
        info!(dark = %escrows.dark, light = %escrows.light, pot = %wager.pot(), "stakes escrowed");
        wager.state = WagerState::Escrowed {
            escrows: escrows.clone(),
        };
        wager.publish(&escrows, WagerPhase::Escrowed);

        let status = wager.game.start(wager.opening.clone())?;
        if status.is_terminal() {
            self.settle(wager).await?;
        }
        Ok(escrows)
    }

    async fn lock_stake(&self, wager: &WagerSession, side: Side) -> Result<EscrowId, WagerError> {
        let payer = wager.players.address_of(side);
        self.settlement
            .create_escrow(wager.stake, payer)
            .await
            .map_err(|err| {
                warn!(%side, %payer, %err, "escrow creation failed");
                WagerError::EscrowFailure(err)
            })
    }

    /// Validates the stake, escrows it and starts a fresh game.
    ///
    /// An out-of-range stake fails before the settlement service is contacted.
    pub async fn create_wager(
        &self,
        stake: Decimal,
        players: Players,
    ) -> Result<WagerSession, WagerError> {
        let mut wager = self.open(stake, players)?;
        self.escrow(&mut wager).await?;
        Ok(wager)
    }

    /// Moves the selected piece, settling the wager if the game ends.
    ///
    /// If the move ends the game but settlement fails, the move stands and
    /// `WagerError::Settlement` is returned; call `settle` to retry.
    pub async fn move_to(&self, wager: &mut WagerSession, to: Position) -> Result<Turn, WagerError> {
        wager.require_escrowed()?;
        let turn = wager.game.move_to(to)?;
        if let Turn::Finished(_) = turn {
            self.settle(wager).await?;
        }
        Ok(turn)
    }

    /// Plays a complete move, for computer opponents and replays.
    pub async fn play(&self, wager: &mut WagerSession, mv: Move) -> Result<Turn, WagerError> {
        wager.require_escrowed()?;
        let turn = wager.game.play(mv)?;
        if let Turn::Finished(_) = turn {
            self.settle(wager).await?;
        }
        Ok(turn)
    }

    /// `side` resigns and both stakes go to its opponent.
    ///
    /// A duplicate forfeit after the wager closed returns the recorded outcome.
    #[instrument(skip(self, wager))]
    pub async fn forfeit(&self, wager: &mut WagerSession, side: Side) -> Result<WagerState, WagerError> {
        if wager.state.is_closed() {
            debug!("forfeit on closed wager ignored");
            return Ok(wager.state.clone());
        }
        wager.require_escrowed()?;
        if wager.game.status() == GameStatus::InProgress {
            wager.game.forfeit(side)?;
            wager.forfeited_by = Some(side);
        }
        self.settle(wager).await
    }

    /// Pays out a finished game: the winner gets both stakes, a draw is refunded.
    ///
    /// Safe to call again after a failure: escrows already closed are not
    /// touched again. Once closed, further calls return the recorded state
    /// without contacting the settlement service.
    #[instrument(skip_all)]
    pub async fn settle(&self, wager: &mut WagerSession) -> Result<WagerState, WagerError> {
        let escrows = match &wager.state {
            WagerState::Pending => return Err(WagerError::NotEscrowed),
            WagerState::Escrowed { escrows } => escrows.clone(),
            closed => {
                debug!(state = ?closed, "wager already closed");
                return Ok(closed.clone());
            }
        };
        let status = wager.game.status();
        if !status.is_terminal() {
            return Err(WagerError::NotFinished);
        }

        for payer in [Side::Dark, Side::Light] {
            if wager.closed[payer.index()] {
                continue;
            }
            let escrow_id = escrows.of(payer);
            let outcome = match status {
                GameStatus::Won(winner) => {
                    let recipient = wager.players.address_of(winner);
                    self.settlement.release_escrow(escrow_id, recipient).await
                }
                _ => self.settlement.refund_escrow(escrow_id).await,
            };
            match outcome {
                Ok(receipt) => wager.receipts.push(receipt),
                Err(ServiceError::AlreadyReleased(id)) => {
                    warn!(escrow_id = %id, "escrow already paid out, marking it closed");
                }
                Err(err) => {
                    warn!(%escrow_id, %err, "settlement failed");
                    return Err(WagerError::Settlement(err));
                }
            }
            wager.closed[payer.index()] = true;
        }

        let receipts = wager.receipts.clone();
        let (state, phase) = match (status, wager.forfeited_by) {
            (GameStatus::Won(_), Some(loser)) => (
                WagerState::Forfeited {
                    escrows: escrows.clone(),
                    loser,
                    receipts,
                },
                WagerPhase::Forfeited,
            ),
            (GameStatus::Won(winner), None) => (
                WagerState::Settled {
                    escrows: escrows.clone(),
                    winner,
                    receipts,
                },
                WagerPhase::Settled,
            ),
            _ => (
                WagerState::Refunded {
                    escrows: escrows.clone(),
                    receipts,
                },
                WagerPhase::Refunded,
            ),
        };
        info!(?phase, "wager closed");
        wager.state = state;
        wager.publish(&escrows, phase);
        Ok(wager.state.clone())
    }
}

/// A wager behind a single async lock, so concurrent callers are serialized.
pub struct SharedWager<S> {
    controller: Arc<WagerController<S>>,
    session: Arc<Mutex<WagerSession>>,
}

impl<S> Clone for SharedWager<S> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            session: Arc::clone(&self.session),
        }
    }
}

impl<S: SettlementService> SharedWager<S> {
    pub fn new(controller: Arc<WagerController<S>>, session: WagerSession) -> Self {
        Self {
            controller,
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn controller(&self) -> &WagerController<S> {
        &self.controller
    }

    pub async fn select(&self, position: Position) -> Result<MoveList, WagerError> {
        self.session.lock().await.select(position)
    }

    pub async fn move_to(&self, to: Position) -> Result<Turn, WagerError> {
        let mut session = self.session.lock().await;
        self.controller.move_to(&mut session, to).await
    }

    pub async fn play(&self, mv: Move) -> Result<Turn, WagerError> {
        let mut session = self.session.lock().await;
        self.controller.play(&mut session, mv).await
    }

    pub async fn forfeit(&self, side: Side) -> Result<WagerState, WagerError> {
        let mut session = self.session.lock().await;
        self.controller.forfeit(&mut session, side).await
    }

    pub async fn settle(&self) -> Result<WagerState, WagerError> {
        let mut session = self.session.lock().await;
        self.controller.settle(&mut session).await
    }

    pub async fn state(&self) -> WagerState {
        self.session.lock().await.state.clone()
    }

    /// A copy of the game for rendering or for a bot to think on.
    pub async fn game(&self) -> GameSession {
        self.session.lock().await.game.clone()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.session.lock().await.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryLedger, MemoryWallet};
    use crate::services::FeeSchedule;
    use crate::session::DrawReason;

    fn dark() -> Address {
        Address::new("dark")
    }

    fn light() -> Address {
        Address::new("light")
    }

    fn ledger(fee_bps: u32) -> Arc<MemoryLedger> {
        Arc::new(
            MemoryLedger::new(FeeSchedule::new(fee_bps), Address::new("treasury"))
                .with_balance(dark(), Decimal::from(100))
                .with_balance(light(), Decimal::from(100)),
        )
    }

    fn controller(config: Config, ledger: &Arc<MemoryLedger>) -> WagerController<Arc<MemoryLedger>> {
        WagerController::new(config, Arc::clone(ledger)).unwrap()
    }

    fn players() -> Players {
        Players::new(dark(), light())
    }

    fn pos(row: u8, col: u8) -> Position {
        Position::new(row, col)
    }

    // Dark's man on (5,2) takes Light's last piece.
    const LAST_CAPTURE: &str = "8/8/8/8/3l4/2d5/8/8";

    async fn escrowed_on(
        controller: &WagerController<Arc<MemoryLedger>>,
        layout: &str,
    ) -> WagerSession {
        let board = Board::from_layout(layout).unwrap();
        let mut wager = controller
            .open_with_board(Decimal::from(10), players(), board)
            .unwrap();
        controller.escrow(&mut wager).await.unwrap();
        wager
    }

    #[tokio::test]
    async fn test_stake_below_minimum_is_rejected_without_escrow() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);

        let result = controller.create_wager(Decimal::new(1, 3), players()).await;
        assert!(matches!(result, Err(WagerError::InvalidStake { .. })));
        assert!(!result.unwrap_err().is_financial());
        assert_eq!(ledger.escrow_calls().await, 0);
    }

    #[tokio::test]
    async fn test_create_wager_escrows_both_stakes_and_starts_game() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);

        let wager = controller.create_wager(Decimal::from(10), players()).await.unwrap();
        let escrows = wager.state().escrows().cloned().unwrap();
        assert_ne!(escrows.dark, escrows.light);
        assert_eq!(wager.game().status(), GameStatus::InProgress);
        assert_eq!(wager.pot(), Decimal::from(20));
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(90));
        assert_eq!(ledger.balance_of(&light()).await, Decimal::from(90));
        assert_eq!(ledger.escrow_calls().await, 2);
    }

    #[tokio::test]
    async fn test_escrow_failure_is_financial_and_creates_nothing() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);

        let err = controller
            .create_wager(Decimal::from(200), players())
            .await
            .unwrap_err();
        assert!(matches!(err, WagerError::InvalidStake { .. }));

        let config = Config {
            max_wager: Decimal::from(500),
            ..Config::default()
        };
        let controller = super::WagerController::new(config, Arc::clone(&ledger)).unwrap();
        let err = controller
            .create_wager(Decimal::from(150), players())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WagerError::EscrowFailure(ServiceError::InsufficientBalance { .. })
        ));
        assert!(err.is_financial());
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_failed_second_escrow_returns_first_stake() {
        let ledger = Arc::new(
            MemoryLedger::new(FeeSchedule::new(0), Address::new("treasury"))
                .with_balance(dark(), Decimal::from(100))
                .with_balance(light(), Decimal::from(5)),
        );
        let controller = controller(Config::default(), &ledger);

        let err = controller
            .create_wager(Decimal::from(10), players())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WagerError::EscrowFailure(ServiceError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(100));
        assert_eq!(ledger.balance_of(&light()).await, Decimal::from(5));
        assert_eq!(ledger.refund_calls().await, 1);
    }

    #[tokio::test]
    async fn test_moves_before_escrow_are_refused() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);
        let mut wager = controller.open(Decimal::from(10), players()).unwrap();

        assert_eq!(wager.select(pos(5, 2)), Err(WagerError::NotEscrowed));
        assert_eq!(
            controller.move_to(&mut wager, pos(4, 3)).await,
            Err(WagerError::NotEscrowed)
        );
        assert_eq!(controller.settle(&mut wager).await, Err(WagerError::NotEscrowed));

        controller.escrow(&mut wager).await.unwrap();
        assert_eq!(
            controller.escrow(&mut wager).await,
            Err(WagerError::AlreadyEscrowed)
        );
        assert_eq!(wager.select(pos(5, 2)).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_winner_gains_stake_less_fee_and_loser_loses_stake() {
        let ledger = ledger(100);
        let controller = controller(Config::default(), &ledger);
        let board = Board::from_layout(LAST_CAPTURE).unwrap();
        let mut wager = controller
            .open_with_board(Decimal::from(10), players(), board)
            .unwrap();
        let mut events = wager.subscribe();
        controller.escrow(&mut wager).await.unwrap();

        wager.select(pos(5, 2)).unwrap();
        let turn = controller.move_to(&mut wager, pos(3, 4)).await.unwrap();
        assert_eq!(turn, Turn::Finished(GameStatus::Won(Side::Dark)));

        let WagerState::Settled {
            winner, receipts, ..
        } = wager.state().clone()
        else {
            panic!("expected settled wager, got {:?}", wager.state());
        };
        assert_eq!(winner, Side::Dark);
        assert_eq!(receipts.len(), 2);
        assert!(receipts.iter().all(|receipt| receipt.recipient == dark()));
        let fee: Decimal = receipts.iter().map(|receipt| receipt.fee).sum();
        assert_eq!(fee, Decimal::new(2, 1));

        // 100 - 10 staked + 20 pot - 0.2 fee
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(100) + Decimal::from(10) - fee);
        assert_eq!(ledger.balance_of(&light()).await, Decimal::from(90));
        assert_eq!(ledger.balance_of(&Address::new("treasury")).await, fee);

        let mut phases = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let Event::WagerStateChanged { phase, .. } = event {
                phases.push(phase);
            }
        }
        assert_eq!(phases, vec![WagerPhase::Escrowed, WagerPhase::Settled]);
    }

    #[tokio::test]
    async fn test_forfeit_settles_once() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);
        let mut wager = controller.create_wager(Decimal::from(10), players()).await.unwrap();

        let state = controller.forfeit(&mut wager, Side::Dark).await.unwrap();
        assert!(matches!(
            state,
            WagerState::Forfeited {
                loser: Side::Dark,
                ..
            }
        ));
        assert_eq!(wager.game().status(), GameStatus::Won(Side::Light));
        assert_eq!(ledger.balance_of(&light()).await, Decimal::from(110));
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(90));

        let again = controller.forfeit(&mut wager, Side::Light).await.unwrap();
        assert_eq!(again, state);
        assert_eq!(controller.settle(&mut wager).await.unwrap(), state);
        // One release per escrow, never repeated.
        assert_eq!(ledger.release_calls().await, 2);
    }

    #[tokio::test]
    async fn test_settlement_failure_is_retryable() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);
        let mut wager = escrowed_on(&controller, LAST_CAPTURE).await;
        ledger
            .fail_next_release(ServiceError::Network("connection reset".into()))
            .await;

        let mv = Move::capture(pos(5, 2), pos(4, 3), pos(3, 4));
        let err = controller.play(&mut wager, mv).await.unwrap_err();
        assert!(matches!(err, WagerError::Settlement(ServiceError::Network(_))));
        assert!(err.is_financial());
        assert_eq!(wager.game().status(), GameStatus::Won(Side::Dark));
        assert!(matches!(wager.state(), WagerState::Escrowed { .. }));

        let state = controller.settle(&mut wager).await.unwrap();
        assert!(matches!(state, WagerState::Settled { winner: Side::Dark, .. }));
        assert_eq!(state.receipts().len(), 2);
        controller.settle(&mut wager).await.unwrap();
        assert_eq!(ledger.release_calls().await, 3);
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(110));
    }

    #[tokio::test]
    async fn test_retry_skips_escrow_already_released() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);
        let mut wager = controller.create_wager(Decimal::from(10), players()).await.unwrap();
        wager.game.forfeit(Side::Light).unwrap();
        wager.forfeited_by = Some(Side::Light);
        // As if Dark's escrow was paid out before an earlier attempt failed.
        wager.closed[Side::Dark.index()] = true;

        let state = controller.settle(&mut wager).await.unwrap();
        assert_eq!(ledger.release_calls().await, 1);
        assert_eq!(state.receipts().len(), 1);
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_already_released_counts_as_closed() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);
        let mut wager = controller.create_wager(Decimal::from(10), players()).await.unwrap();
        let escrows = wager.state().escrows().cloned().unwrap();
        ledger
            .fail_next_release(ServiceError::AlreadyReleased(escrows.dark))
            .await;

        let state = controller.forfeit(&mut wager, Side::Light).await.unwrap();
        assert!(matches!(
            state,
            WagerState::Forfeited {
                loser: Side::Light,
                ..
            }
        ));
        assert_eq!(state.receipts().len(), 1);
        assert_eq!(state.receipts()[0].escrow_id, escrows.light);
    }

    #[tokio::test]
    async fn test_draw_refunds_each_payer() {
        let ledger = ledger(100);
        let config = Config {
            quiet_move_limit: 1,
            ..Config::default()
        };
        let controller = controller(config, &ledger);
        let mut wager = escrowed_on(&controller, "7L/8/8/8/8/D7/8/8").await;

        let turn = controller
            .play(&mut wager, Move::simple(pos(5, 0), pos(4, 1)))
            .await
            .unwrap();
        assert_eq!(turn, Turn::Finished(GameStatus::Drawn(DrawReason::QuietMoves)));
        assert!(matches!(wager.state(), WagerState::Refunded { .. }));
        assert_eq!(ledger.balance_of(&dark()).await, Decimal::from(100));
        assert_eq!(ledger.balance_of(&light()).await, Decimal::from(100));
        assert_eq!(ledger.refund_calls().await, 2);
        assert_eq!(ledger.release_calls().await, 0);
    }

    #[tokio::test]
    async fn test_settle_requires_finished_game() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);
        let mut wager = controller.create_wager(Decimal::from(10), players()).await.unwrap();
        assert_eq!(controller.settle(&mut wager).await, Err(WagerError::NotFinished));
        assert_eq!(ledger.release_calls().await, 0);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let ledger = ledger(0);
        let controller = controller(Config::default(), &ledger);

        let wallet = MemoryWallet::connected(dark(), Arc::clone(&ledger));
        assert_eq!(controller.authenticate(&wallet).await, Ok(dark()));

        let rejecting = MemoryWallet::connected(dark(), Arc::clone(&ledger)).rejecting();
        assert_eq!(
            controller.authenticate(&rejecting).await,
            Err(WagerError::Wallet(ServiceError::UserRejected))
        );

        let offline = MemoryWallet::disconnected(Arc::clone(&ledger));
        assert_eq!(
            controller.authenticate(&offline).await,
            Err(WagerError::Wallet(ServiceError::NotConnected))
        );
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let ledger = ledger(0);
        let config = Config {
            board_size: 7,
            ..Config::default()
        };
        assert!(matches!(
            WagerController::new(config, ledger),
            Err(WagerError::Rule(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_forfeits_release_once() {
        let ledger = ledger(0);
        let controller = Arc::new(controller(Config::default(), &ledger));
        let wager = controller.create_wager(Decimal::from(10), players()).await.unwrap();
        let shared = SharedWager::new(controller, wager);

        let a = tokio::spawn({
            let shared = shared.clone();
            async move { shared.forfeit(Side::Dark).await }
        });
        let b = tokio::spawn({
            let shared = shared.clone();
            async move { shared.forfeit(Side::Light).await }
        });
        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        assert_eq!(first, second);
        assert!(shared.state().await.is_closed());
        assert_eq!(ledger.release_calls().await, 2);
    }
}
