//! Capabilities the engine consumes from its host: a wallet session and an
//! escrow settlement service.
//!
//! Both are asynchronous and may suspend on user approval or network
//! confirmation. The rule engine never calls them; only the wager
//! controller does.

use crate::error::ServiceError;
use rust_decimal::Decimal;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier returned by the settlement service. Doubles as the
/// idempotency key for release.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EscrowId(String);

impl EscrowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<u8>);

/// Proof that escrowed funds were paid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub escrow_id: EscrowId,
    pub recipient: Address,
    pub amount: Decimal,
    pub fee: Decimal,
}

pub trait WalletSession: Send + Sync {
    fn current_address(&self) -> Option<Address>;

    /// Suspends until the user approves; fails with `UserRejected` or `Timeout`.
    fn sign(&self, message: &[u8]) -> impl Future<Output = Result<Signature, ServiceError>> + Send;

    fn balance(&self, address: &Address) -> impl Future<Output = Result<Decimal, ServiceError>> + Send;
}

pub trait SettlementService: Send + Sync {
    /// Locks `amount` from `payer`. Fails with `InsufficientBalance` or `Network`.
    fn create_escrow(
        &self,
        amount: Decimal,
        payer: &Address,
    ) -> impl Future<Output = Result<EscrowId, ServiceError>> + Send;

    /// Pays the escrow out to `recipient`. Fails with `Network` or `AlreadyReleased`.
    fn release_escrow(
        &self,
        escrow_id: &EscrowId,
        recipient: &Address,
    ) -> impl Future<Output = Result<Receipt, ServiceError>> + Send;

    /// Returns the escrow to its payer, used when a match is drawn.
    fn refund_escrow(
        &self,
        escrow_id: &EscrowId,
    ) -> impl Future<Output = Result<Receipt, ServiceError>> + Send;
}

impl<S: SettlementService> SettlementService for Arc<S> {
    fn create_escrow(
        &self,
        amount: Decimal,
        payer: &Address,
    ) -> impl Future<Output = Result<EscrowId, ServiceError>> + Send {
        (**self).create_escrow(amount, payer)
    }

    fn release_escrow(
        &self,
        escrow_id: &EscrowId,
        recipient: &Address,
    ) -> impl Future<Output = Result<Receipt, ServiceError>> + Send {
        (**self).release_escrow(escrow_id, recipient)
    }

    fn refund_escrow(
        &self,
        escrow_id: &EscrowId,
    ) -> impl Future<Output = Result<Receipt, ServiceError>> + Send {
        (**self).refund_escrow(escrow_id)
    }
}

/// Flat percentage fee expressed in basis points (1/100 of a percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    basis_points: u32,
}

impl FeeSchedule {
    pub fn new(basis_points: u32) -> Self {
        Self {
            basis_points: basis_points.min(10_000),
        }
    }

    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    pub fn fee_for(&self, gross: Decimal) -> Decimal {
        gross * Decimal::from(self.basis_points) / Decimal::from(10_000)
    }

    pub fn net_of_fee(&self, gross: Decimal) -> Decimal {
        gross - self.fee_for(gross)
    }
}
