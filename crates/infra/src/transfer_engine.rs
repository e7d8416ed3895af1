//! Transfer execution (the only cross-account write path).
//!
//! ## Pipeline
//!
//! ```text
//! TransferRequest
//!   ↓
//! 1. Resolve sender (by id) and recipient (by address)        → NotFound
//!   ↓
//! 2. Reject sender == recipient                                → SelfTransfer
//!   ↓
//! 3. Known idempotency key? return the original receipt
//!   ↓
//! 4. Unlocked balance pre-check                                → InsufficientFunds
//!   ↓
//! 5. Lock both accounts, lower id first
//!      re-check idempotency key and balance,
//!      debit sender, credit recipient, append ledger record
//!   ↓
//! 6. Release both locks, return receipt
//! ```
//!
//! Steps 1-4 have no side effects, so a rejected transfer changes nothing.
//! Step 5 runs to completion once the locks are held: either both balance
//! writes and the record land, or the balances are restored and nothing is
//! recorded. No retries happen here; callers wanting retry safety attach an
//! idempotency key.
//!
//! Idempotency keys are remembered for a retention window (24 hours unless
//! configured). Older entries are dropped as the table is touched, after which
//! the key may name a new transfer.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use tallypay_accounts::{Account, Address};
use tallypay_core::{
    AccountId, Amount, DuplicateField, TransactionId, WalletError, WalletResult,
};
use tallypay_ledger::{IdempotencyKey, TransactionRecord};

use crate::account_store::AccountStore;
use crate::transaction_ledger::TransactionLedger;

/// One requested movement of value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub sender_id: AccountId,
    pub recipient_address: Address,
    pub amount: Amount,
    pub idempotency_key: Option<IdempotencyKey>,
}

impl TransferRequest {
    pub fn new(sender_id: AccountId, recipient_address: Address, amount: Amount) -> Self {
        Self {
            sender_id,
            recipient_address,
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Result of a completed (or replayed) transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub record: TransactionRecord,
    /// Sender balance right after this transfer was applied.
    pub sender_balance: u64,
    /// True when an idempotency key matched an earlier transfer and nothing ran.
    pub replayed: bool,
}

pub const DEFAULT_IDEMPOTENCY_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone)]
struct RememberedTransfer {
    recipient: AccountId,
    amount: Amount,
    receipt: TransferReceipt,
}

type IdempotencySlot = (AccountId, IdempotencyKey);

#[derive(Debug, Default)]
struct IdempotencyTable {
    entries: HashMap<IdempotencySlot, RememberedTransfer>,
    /// Slots in the order they were remembered, stamped with the record time.
    order: VecDeque<(DateTime<Utc>, IdempotencySlot)>,
}

impl IdempotencyTable {
    fn insert(&mut self, slot: IdempotencySlot, transfer: RememberedTransfer) {
        self.order
            .push_back((transfer.receipt.record.timestamp(), slot.clone()));
        self.entries.insert(slot, transfer);
    }

    fn forget_before(&mut self, cutoff: DateTime<Utc>) {
        while let Some(&(at, _)) = self.order.front() {
            if at >= cutoff {
                break;
            }
            let Some((at, slot)) = self.order.pop_front() else {
                break;
            };
            // The slot may have been reused after an earlier expiry.
            if self
                .entries
                .get(&slot)
                .is_some_and(|seen| seen.receipt.record.timestamp() == at)
            {
                self.entries.remove(&slot);
            }
        }
    }
}

/// Executes transfers against an account store and a ledger.
///
/// ## Lock order
///
/// account (lower id) → account (higher id) → ledger → idempotency table.
/// The ledger and idempotency locks are leaves: nothing is acquired while
/// holding them.
pub struct TransferEngine<S, L> {
    accounts: S,
    ledger: L,
    idempotency: Mutex<IdempotencyTable>,
    idempotency_retention: Duration,
}

impl<S, L> TransferEngine<S, L>
where
    S: AccountStore,
    L: TransactionLedger,
{
    pub fn new(accounts: S, ledger: L) -> Self {
        Self {
            accounts,
            ledger,
            idempotency: Mutex::new(IdempotencyTable::default()),
            idempotency_retention: Duration::hours(DEFAULT_IDEMPOTENCY_RETENTION_HOURS),
        }
    }

    /// How long an idempotency key keeps replaying its transfer.
    pub fn with_idempotency_retention(mut self, retention: Duration) -> Self {
        self.idempotency_retention = retention;
        self
    }

    pub fn accounts(&self) -> &S {
        &self.accounts
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Move `amount` from `sender_id` to the account at `recipient_address`.
    pub fn transfer(
        &self,
        sender_id: AccountId,
        recipient_address: &Address,
        amount: Amount,
    ) -> WalletResult<TransferReceipt> {
        self.execute(TransferRequest::new(
            sender_id,
            recipient_address.clone(),
            amount,
        ))
    }

    #[instrument(
        name = "transfer",
        skip_all,
        fields(sender = %request.sender_id, to = %request.recipient_address, amount = %request.amount)
    )]
    pub fn execute(&self, request: TransferRequest) -> WalletResult<TransferReceipt> {
        let result = self.run(&request);
        match &result {
            Ok(receipt) if receipt.replayed => {
                info!(txid = %receipt.record.txid(), "idempotent replay")
            }
            Ok(receipt) => info!(
                txid = %receipt.record.txid(),
                sender_balance = receipt.sender_balance,
                "transfer completed"
            ),
            Err(WalletError::Internal(detail)) => error!(%detail, "transfer failed"),
            Err(e) => warn!(error = %e, "transfer rejected"),
        }
        result
    }

    fn run(&self, request: &TransferRequest) -> WalletResult<TransferReceipt> {
        let sender = self
            .accounts
            .get_by_id(request.sender_id)
            .map_err(|e| relabel_not_found(e, "sender"))?;
        let recipient = self
            .accounts
            .get_by_address(&request.recipient_address)
            .map_err(|e| relabel_not_found(e, "recipient"))?;

        if sender.address() == recipient.address() {
            return Err(WalletError::SelfTransfer);
        }

        if let Some(key) = &request.idempotency_key {
            if let Some(receipt) =
                self.replay(sender.id_typed(), key, recipient.id_typed(), request.amount)?
            {
                return Ok(receipt);
            }
        }

        if sender.balance() < request.amount.get() {
            return Err(WalletError::InsufficientFunds {
                balance: sender.balance(),
                requested: request.amount.get(),
            });
        }

        self.accounts.with_locked_pair(
            sender.id_typed(),
            recipient.id_typed(),
            |sender, recipient| self.apply_locked(request, sender, recipient),
        )
    }

    /// Critical section; both accounts are held exclusively.
    fn apply_locked(
        &self,
        request: &TransferRequest,
        sender: &mut Account,
        recipient: &mut Account,
    ) -> WalletResult<TransferReceipt> {
        let amount = request.amount;

        // A concurrent duplicate may have finished while we waited for the lock.
        if let Some(key) = &request.idempotency_key {
            if let Some(receipt) =
                self.replay(sender.id_typed(), key, recipient.id_typed(), amount)?
            {
                return Ok(receipt);
            }
        }

        if !recipient.can_credit(amount) {
            return Err(WalletError::internal(format!(
                "crediting {amount} would overflow account {}",
                recipient.id_typed()
            )));
        }

        let record = TransactionRecord::completed(
            TransactionId::new(),
            sender.address().clone(),
            recipient.address().clone(),
            amount,
            Utc::now(),
        )?;

        // The balance may have moved since the unlocked pre-check.
        let sender_balance = sender.debit(amount)?;
        recipient.credit(amount)?;

        if let Err(e) = self.ledger.append(record.clone()) {
            recipient.debit(amount)?;
            sender.credit(amount)?;
            return Err(e);
        }

        let receipt = TransferReceipt {
            record,
            sender_balance,
            replayed: false,
        };

        if let Some(key) = &request.idempotency_key {
            self.remember(
                sender.id_typed(),
                key.clone(),
                RememberedTransfer {
                    recipient: recipient.id_typed(),
                    amount,
                    receipt: receipt.clone(),
                },
            );
        }

        Ok(receipt)
    }

    fn replay(
        &self,
        sender: AccountId,
        key: &IdempotencyKey,
        recipient: AccountId,
        amount: Amount,
    ) -> WalletResult<Option<TransferReceipt>> {
        let table = self.idempotency_table(Utc::now());

        match table.entries.get(&(sender, key.clone())) {
            None => Ok(None),
            Some(seen) if seen.recipient == recipient && seen.amount == amount => {
                Ok(Some(TransferReceipt {
                    replayed: true,
                    ..seen.receipt.clone()
                }))
            }
            Some(_) => Err(WalletError::DuplicateKey(DuplicateField::IdempotencyKey)),
        }
    }

    fn remember(&self, sender: AccountId, key: IdempotencyKey, transfer: RememberedTransfer) {
        self.idempotency_table(Utc::now())
            .insert((sender, key), transfer);
    }

    /// Lock the idempotency table with entries older than the retention window dropped.
    fn idempotency_table(&self, now: DateTime<Utc>) -> MutexGuard<'_, IdempotencyTable> {
        // Entries are only ever inserted whole, so a poisoned table is still usable.
        let mut table = self
            .idempotency
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        table.forget_before(now - self.idempotency_retention);
        table
    }
}

fn relabel_not_found(err: WalletError, role: &str) -> WalletError {
    match err {
        WalletError::NotFound(_) => WalletError::not_found(role),
        other => other,
    }
}
