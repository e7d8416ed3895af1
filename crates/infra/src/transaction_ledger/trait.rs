use std::sync::Arc;

use tallypay_accounts::Address;
use tallypay_core::{TransactionId, WalletResult};
use tallypay_ledger::TransactionRecord;

/// Append-only record of completed transfers.
///
/// ## Ordering
///
/// `query` returns records newest first, where "newest" means most recently
/// appended. Append sequence is the only ordering guarantee: transfers touching
/// a common account append while holding that account's lock, so for any one
/// address the sequence matches the order the transfers took effect. Record
/// timestamps come from the wall clock and are informational; they may step
/// backwards.
pub trait TransactionLedger: Send + Sync {
    /// Append a completed record.
    ///
    /// Fails only on a reused transaction id or an unusable store (poisoned
    /// lock); a well-formed record with a fresh id is always accepted.
    fn append(&self, record: TransactionRecord) -> WalletResult<()>;

    /// Records where `from == address` or `to == address`, newest first, at
    /// most `limit` of them.
    fn query(&self, address: &Address, limit: usize) -> WalletResult<Vec<TransactionRecord>>;

    /// Look up a single record by transaction id.
    fn get(&self, id: TransactionId) -> WalletResult<TransactionRecord>;

    /// Number of records appended so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L> TransactionLedger for Arc<L>
where
    L: TransactionLedger + ?Sized,
{
    fn append(&self, record: TransactionRecord) -> WalletResult<()> {
        (**self).append(record)
    }

    fn query(&self, address: &Address, limit: usize) -> WalletResult<Vec<TransactionRecord>> {
        (**self).query(address, limit)
    }

    fn get(&self, id: TransactionId) -> WalletResult<TransactionRecord> {
        (**self).get(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
