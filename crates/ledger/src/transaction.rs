use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tallypay_accounts::Address;
use tallypay_core::{Amount, Entity, TransactionId, WalletError, WalletResult};

/// Outcome of a transfer.
///
/// Only `Completed` records are ever appended; a failed transfer leaves no
/// trace in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

/// One completed transfer (immutable once built).
///
/// `from` and `to` are weak references: they name accounts by address and are
/// resolved through the account store, never owned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    id: TransactionId,
    from: Address,
    to: Address,
    amount: Amount,
    status: TransactionStatus,
    timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Build the record of a transfer that has just been applied.
    pub fn completed(
        id: TransactionId,
        from: Address,
        to: Address,
        amount: Amount,
        timestamp: DateTime<Utc>,
    ) -> WalletResult<Self> {
        if from == to {
            return Err(WalletError::SelfTransfer);
        }
        Ok(Self {
            id,
            from,
            to,
            amount,
            status: TransactionStatus::Completed,
            timestamp,
        })
    }

    pub fn txid(&self) -> TransactionId {
        self.id
    }

    pub fn from(&self) -> &Address {
        &self.from
    }

    pub fn to(&self) -> &Address {
        &self.to
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// True if `address` is the sender or the recipient.
    pub fn involves(&self, address: &Address) -> bool {
        &self.from == address || &self.to == address
    }
}

impl Entity for TransactionRecord {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
