//! Account entity and its credential-free projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tallypay_core::{AccountId, Amount, Entity, WalletError, WalletResult};

use crate::address::Address;

/// Opaque password hash owned by the credential collaborator.
///
/// `Debug` is redacted so hashes never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Candidate row for `AccountStore::create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub address: Address,
    pub initial_balance: u64,
}

/// A wallet account.
///
/// # Invariants
/// - `id`, `address`, `username` and `email` never change after opening.
/// - `balance` never goes below zero: `debit` refuses rather than wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    username: String,
    email: String,
    password_hash: PasswordHash,
    address: Address,
    balance: u64,
    created_at: DateTime<Utc>,
}

impl Account {
    pub fn open(id: AccountId, candidate: NewAccount, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username: candidate.username,
            email: candidate.email,
            password_hash: candidate.password_hash,
            address: candidate.address,
            balance: candidate.initial_balance,
            created_at,
        }
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Subtract `amount`, returning the new balance.
    pub fn debit(&mut self, amount: Amount) -> WalletResult<u64> {
        let next = self
            .balance
            .checked_sub(amount.get())
            .ok_or(WalletError::InsufficientFunds {
                balance: self.balance,
                requested: amount.get(),
            })?;
        self.balance = next;
        Ok(next)
    }

    /// Add `amount`, returning the new balance.
    pub fn credit(&mut self, amount: Amount) -> WalletResult<u64> {
        let next = self
            .balance
            .checked_add(amount.get())
            .ok_or_else(|| WalletError::internal(format!("balance overflow on account {}", self.id)))?;
        self.balance = next;
        Ok(next)
    }

    /// Whether `credit(amount)` would succeed.
    pub fn can_credit(&self, amount: Amount) -> bool {
        self.balance.checked_add(amount.get()).is_some()
    }

    /// Apply a signed delta (`balance += delta`), refusing negative results.
    pub fn apply_delta(&mut self, delta: i64) -> WalletResult<u64> {
        let next = i128::from(self.balance) + i128::from(delta);
        if next < 0 {
            return Err(WalletError::InsufficientFunds {
                balance: self.balance,
                requested: delta.unsigned_abs(),
            });
        }
        let next = u64::try_from(next)
            .map_err(|_| WalletError::internal(format!("balance overflow on account {}", self.id)))?;
        self.balance = next;
        Ok(next)
    }

    /// Account view without credential fields.
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            balance: self.balance,
            created_at: self.created_at,
        }
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Account minus credentials; safe to return to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub address: Address,
    pub balance: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn account_with(balance: u64) -> Account {
        Account::open(
            AccountId::new(),
            NewAccount {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: PasswordHash::new("$argon2id$stub"),
                address: Address::from("WALLET_ALICE0001"),
                initial_balance: balance,
            },
            Utc::now(),
        )
    }

    fn amount(v: u64) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn debit_and_credit_move_the_balance() {
        let mut account = account_with(1000);
        assert_eq!(account.debit(amount(300)).unwrap(), 700);
        assert_eq!(account.credit(amount(50)).unwrap(), 750);
    }

    #[test]
    fn overdraft_is_refused_without_mutation() {
        let mut account = account_with(700);
        let err = account.debit(amount(2000)).unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientFunds {
                balance: 700,
                requested: 2000
            }
        );
        assert_eq!(account.balance(), 700);
    }

    #[test]
    fn credit_overflow_is_internal() {
        let mut account = account_with(u64::MAX);
        assert!(!account.can_credit(amount(1)));
        assert!(matches!(account.credit(amount(1)), Err(WalletError::Internal(_))));
        assert_eq!(account.balance(), u64::MAX);
    }

    #[test]
    fn negative_delta_past_zero_is_refused() {
        let mut account = account_with(10);
        assert!(matches!(
            account.apply_delta(-11),
            Err(WalletError::InsufficientFunds { .. })
        ));
        assert_eq!(account.apply_delta(-10).unwrap(), 0);
        assert_eq!(account.apply_delta(25).unwrap(), 25);
    }

    #[test]
    fn profile_omits_credentials() {
        let account = account_with(1000);
        let json = serde_json::to_value(account.profile()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["balance"], 1000);
        assert!(!format!("{account:?}").contains("argon2"));
    }

    proptest! {
        #[test]
        fn balance_never_goes_negative(
            start in 0u64..10_000,
            deltas in prop::collection::vec(-5_000i64..5_000, 1..50)
        ) {
            let mut account = account_with(start);
            let mut expected = start as i128;
            for delta in deltas {
                match account.apply_delta(delta) {
                    Ok(next) => {
                        expected += delta as i128;
                        prop_assert_eq!(next as i128, expected);
                    }
                    Err(_) => prop_assert!(expected + (delta as i128) < 0),
                }
            }
            prop_assert!(account.balance() as i128 == expected);
        }
    }
}
