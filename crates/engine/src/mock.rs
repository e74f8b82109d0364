//! In-memory wallet and settlement service.
//!
//! Used by the terminal front end and by tests. Balances live in a map
//! behind an async mutex; the fee schedule is applied on release, the way a
//! real payment contract would take its cut.

use crate::error::ServiceError;
use crate::services::{
    Address, EscrowId, FeeSchedule, Receipt, SettlementService, Signature, WalletSession,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug)]
struct Escrow {
    payer: Address,
    amount: Decimal,
    closed: bool,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<Address, Decimal>,
    escrows: HashMap<EscrowId, Escrow>,
    next_id: u64,
    escrow_calls: usize,
    release_calls: usize,
    refund_calls: usize,
    fail_next_escrow: Option<ServiceError>,
    fail_next_release: Option<ServiceError>,
}

#[derive(Debug)]
pub struct MemoryLedger {
    fees: FeeSchedule,
    treasury: Address,
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new(fees: FeeSchedule, treasury: Address) -> Self {
        Self {
            fees,
            treasury,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Funds `address` before the ledger is shared.
    pub fn with_balance(mut self, address: Address, amount: Decimal) -> Self {
        self.state.get_mut().balances.insert(address, amount);
        self
    }

    pub fn treasury(&self) -> &Address {
        &self.treasury
    }

    pub async fn balance_of(&self, address: &Address) -> Decimal {
        let state = self.state.lock().await;
        state.balances.get(address).copied().unwrap_or(Decimal::ZERO)
    }

    pub async fn escrow_calls(&self) -> usize {
        self.state.lock().await.escrow_calls
    }

    pub async fn release_calls(&self) -> usize {
        self.state.lock().await.release_calls
    }

    pub async fn refund_calls(&self) -> usize {
        self.state.lock().await.refund_calls
    }

    /// The next `create_escrow` fails with `err` without touching balances.
    pub async fn fail_next_escrow(&self, err: ServiceError) {
        self.state.lock().await.fail_next_escrow = Some(err);
    }

    /// The next `release_escrow` fails with `err` without touching balances.
    pub async fn fail_next_release(&self, err: ServiceError) {
        self.state.lock().await.fail_next_release = Some(err);
    }
}

impl LedgerState {
    fn credit(&mut self, address: &Address, amount: Decimal) {
        *self.balances.entry(address.clone()).or_insert(Decimal::ZERO) += amount;
    }

    fn open_escrow(&mut self, escrow_id: &EscrowId) -> Result<&mut Escrow, ServiceError> {
        let escrow = self
            .escrows
            .get_mut(escrow_id)
            .ok_or_else(|| ServiceError::UnknownEscrow(escrow_id.clone()))?;
        if escrow.closed {
            return Err(ServiceError::AlreadyReleased(escrow_id.clone()));
        }
        Ok(escrow)
    }
}

impl SettlementService for MemoryLedger {
    async fn create_escrow(&self, amount: Decimal, payer: &Address) -> Result<EscrowId, ServiceError> {
        let mut state = self.state.lock().await;
        state.escrow_calls += 1;
        if let Some(err) = state.fail_next_escrow.take() {
            return Err(err);
        }
        let available = state.balances.get(payer).copied().unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(ServiceError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        state.credit(payer, -amount);

        state.next_id += 1;
        let escrow_id = EscrowId::new(format!("escrow-{}", state.next_id));
        state.escrows.insert(
            escrow_id.clone(),
            Escrow {
                payer: payer.clone(),
                amount,
                closed: false,
            },
        );
        debug!(%escrow_id, %payer, %amount, "escrow created");
        Ok(escrow_id)
    }

    async fn release_escrow(
        &self,
        escrow_id: &EscrowId,
        recipient: &Address,
    ) -> Result<Receipt, ServiceError> {
        let mut state = self.state.lock().await;
        state.release_calls += 1;
        if let Some(err) = state.fail_next_release.take() {
            return Err(err);
        }
        let escrow = state.open_escrow(escrow_id)?;
        escrow.closed = true;
        let amount = escrow.amount;

        let fee = self.fees.fee_for(amount);
        let net = amount - fee;
        state.credit(recipient, net);
        state.credit(&self.treasury, fee);
        debug!(%escrow_id, %recipient, %net, %fee, "escrow released");
        Ok(Receipt {
            escrow_id: escrow_id.clone(),
            recipient: recipient.clone(),
            amount: net,
            fee,
        })
    }

    async fn refund_escrow(&self, escrow_id: &EscrowId) -> Result<Receipt, ServiceError> {
        let mut state = self.state.lock().await;
        state.refund_calls += 1;
        let escrow = state.open_escrow(escrow_id)?;
        escrow.closed = true;
        let amount = escrow.amount;
        let payer = escrow.payer.clone();

        state.credit(&payer, amount);
        debug!(%escrow_id, %payer, %amount, "escrow refunded");
        Ok(Receipt {
            escrow_id: escrow_id.clone(),
            recipient: payer,
            amount,
            fee: Decimal::ZERO,
        })
    }
}

/// A wallet whose balance is whatever the shared ledger says.
#[derive(Debug, Clone)]
pub struct MemoryWallet {
    address: Option<Address>,
    ledger: Arc<MemoryLedger>,
    reject: bool,
}

impl MemoryWallet {
    pub fn connected(address: Address, ledger: Arc<MemoryLedger>) -> Self {
        Self {
            address: Some(address),
            ledger,
            reject: false,
        }
    }

    pub fn disconnected(ledger: Arc<MemoryLedger>) -> Self {
        Self {
            address: None,
            ledger,
            reject: false,
        }
    }

    /// Every signature request is declined, as if the user pressed "reject".
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }
}

impl WalletSession for MemoryWallet {
    fn current_address(&self) -> Option<Address> {
        self.address.clone()
    }

    async fn sign(&self, message: &[u8]) -> Result<Signature, ServiceError> {
        let address = self.address.as_ref().ok_or(ServiceError::NotConnected)?;
        if self.reject {
            return Err(ServiceError::UserRejected);
        }
        let mut bytes = address.as_str().as_bytes().to_vec();
        bytes.extend(message.iter().rev());
        Ok(Signature(bytes))
    }

    async fn balance(&self, address: &Address) -> Result<Decimal, ServiceError> {
        Ok(self.ledger.balance_of(address).await)
    }
}
