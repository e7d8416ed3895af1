//! Read-only façade over accounts and the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use tallypay_accounts::{AccountProfile, Address};
use tallypay_core::{AccountId, Amount, WalletError, WalletResult};
use tallypay_ledger::TransactionRecord;

use crate::account_store::AccountStore;
use crate::transaction_ledger::TransactionLedger;

/// What an account shares to get paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivePayload {
    pub address: Address,
    /// Amount the recipient asks for. Advisory only; see [`ResolvedPayment`].
    pub amount: Option<Amount>,
    pub issued_at: DateTime<Utc>,
}

/// The parts of a receive payload a payer's device hands back for resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedPayload {
    pub address: Address,
    pub amount: Option<Amount>,
}

impl ScannedPayload {
    /// Interpret a decoded payload.
    ///
    /// `address` must be a non-empty string. `amount` may be absent or null;
    /// anything else must be a valid amount. Other fields are ignored.
    pub fn from_json(value: &JsonValue) -> WalletResult<Self> {
        let JsonValue::Object(fields) = value else {
            return Err(WalletError::invalid_payload("payload must be an object"));
        };

        let address = match fields.get("address") {
            Some(JsonValue::String(s)) if !s.is_empty() => Address::new(s.clone()),
            _ => return Err(WalletError::invalid_payload("payload has no address")),
        };

        let amount = match fields.get("amount") {
            None | Some(JsonValue::Null) => None,
            Some(raw) => Some(Amount::from_json(raw)?),
        };

        Ok(Self { address, amount })
    }
}

impl From<&ReceivePayload> for ScannedPayload {
    fn from(payload: &ReceivePayload) -> Self {
        Self {
            address: payload.address.clone(),
            amount: payload.amount,
        }
    }
}

/// Recipient details for a scanned payload.
///
/// `amount` is a suggestion carried over from the payload. Transfers never
/// take it from here; the payer submits the amount to pay and it is
/// validated on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPayment {
    pub recipient_address: Address,
    pub recipient_display_name: String,
    pub amount: Option<Amount>,
}

/// Stateless read composition over an account store and a ledger.
pub struct QueryService<S, L> {
    accounts: S,
    ledger: L,
    default_limit: usize,
    max_limit: usize,
}

impl<S, L> QueryService<S, L>
where
    S: AccountStore,
    L: TransactionLedger,
{
    pub fn new(accounts: S, ledger: L) -> Self {
        Self::with_limits(accounts, ledger, 50, 50)
    }

    pub fn with_limits(accounts: S, ledger: L, default_limit: usize, max_limit: usize) -> Self {
        Self {
            accounts,
            ledger,
            default_limit: default_limit.min(max_limit),
            max_limit,
        }
    }

    pub fn profile(&self, account_id: AccountId) -> WalletResult<AccountProfile> {
        Ok(self.accounts.get_by_id(account_id)?.profile())
    }

    /// Transfers the account sent or received, newest first.
    ///
    /// `limit` defaults to the configured page size and is capped at the
    /// configured maximum.
    pub fn transaction_history(
        &self,
        account_id: AccountId,
        limit: Option<usize>,
    ) -> WalletResult<Vec<TransactionRecord>> {
        let account = self.accounts.get_by_id(account_id)?;
        let limit = limit.unwrap_or(self.default_limit).min(self.max_limit);
        debug!(account_id = %account_id, limit, "history lookup");
        self.ledger.query(account.address(), limit)
    }

    pub fn receive_payload(
        &self,
        account_id: AccountId,
        amount: Option<Amount>,
    ) -> WalletResult<ReceivePayload> {
        let account = self.accounts.get_by_id(account_id)?;
        Ok(ReceivePayload {
            address: account.address().clone(),
            amount,
            issued_at: Utc::now(),
        })
    }

    pub fn resolve_payload(&self, payload: &ScannedPayload) -> WalletResult<ResolvedPayment> {
        let recipient = self
            .accounts
            .get_by_address(&payload.address)
            .map_err(|e| match e {
                WalletError::NotFound(_) => WalletError::not_found("recipient"),
                other => other,
            })?;

        Ok(ResolvedPayment {
            recipient_address: recipient.address().clone(),
            recipient_display_name: recipient.username().to_string(),
            amount: payload.amount,
        })
    }
}
