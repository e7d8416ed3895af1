use std::sync::Arc;

use tallypay_accounts::{Account, Address, NewAccount};
use tallypay_core::{AccountId, WalletResult};

/// Authoritative account table.
///
/// Accounts are keyed by id with unique secondary lookups by username, email
/// and address. Implementations must be safe to share across threads; every
/// method is atomic with respect to other calls touching the same account.
///
/// ## Balance mutation
///
/// `adjust_balance` changes one account. Moving value between two accounts
/// goes through `with_locked_pair`, which holds both accounts exclusively for
/// the duration of the closure so that a debit and its matching credit are
/// never observed separately.
pub trait AccountStore: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with `DuplicateKey` naming the first colliding field, checked in
    /// the order username, email, address.
    fn create(&self, candidate: NewAccount) -> WalletResult<Account>;

    fn get_by_id(&self, id: AccountId) -> WalletResult<Account>;
    fn get_by_username(&self, username: &str) -> WalletResult<Account>;
    fn get_by_email(&self, email: &str) -> WalletResult<Account>;
    fn get_by_address(&self, address: &Address) -> WalletResult<Account>;

    /// `balance += delta`; fails with `InsufficientFunds` if the result would be
    /// negative. Returns the new balance.
    fn adjust_balance(&self, id: AccountId, delta: i64) -> WalletResult<u64>;

    /// Run `f` with exclusive access to two distinct accounts.
    ///
    /// Locks are taken in ascending `AccountId` order no matter which account
    /// is passed first, so two callers locking the same pair in opposite roles
    /// cannot deadlock. The closure receives the accounts in argument order.
    /// Whatever `f` leaves in the accounts is what other callers observe next;
    /// on error it is responsible for restoring them.
    fn with_locked_pair<R, F>(&self, first: AccountId, second: AccountId, f: F) -> WalletResult<R>
    where
        F: FnOnce(&mut Account, &mut Account) -> WalletResult<R>;

    /// Sum of all balances, read as one consistent snapshot.
    fn total_balance(&self) -> WalletResult<u128>;

    /// Number of accounts.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore,
{
    fn create(&self, candidate: NewAccount) -> WalletResult<Account> {
        (**self).create(candidate)
    }

    fn get_by_id(&self, id: AccountId) -> WalletResult<Account> {
        (**self).get_by_id(id)
    }

    fn get_by_username(&self, username: &str) -> WalletResult<Account> {
        (**self).get_by_username(username)
    }

    fn get_by_email(&self, email: &str) -> WalletResult<Account> {
        (**self).get_by_email(email)
    }

    fn get_by_address(&self, address: &Address) -> WalletResult<Account> {
        (**self).get_by_address(address)
    }

    fn adjust_balance(&self, id: AccountId, delta: i64) -> WalletResult<u64> {
        (**self).adjust_balance(id, delta)
    }

    fn with_locked_pair<R, F>(&self, first: AccountId, second: AccountId, f: F) -> WalletResult<R>
    where
        F: FnOnce(&mut Account, &mut Account) -> WalletResult<R>,
    {
        (**self).with_locked_pair(first, second, f)
    }

    fn total_balance(&self) -> WalletResult<u128> {
        (**self).total_balance()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
