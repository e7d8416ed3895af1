use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use chrono::Utc;
use tracing::debug;

use tallypay_accounts::{Account, Address, NewAccount};
use tallypay_core::{AccountId, DuplicateField, WalletError, WalletResult};

use super::r#trait::AccountStore;

type Slot = Arc<Mutex<Account>>;

#[derive(Debug, Default)]
struct Indexes {
    by_id: HashMap<AccountId, Slot>,
    by_username: HashMap<String, AccountId>,
    by_email: HashMap<String, AccountId>,
    by_address: HashMap<Address, AccountId>,
}

impl Indexes {
    fn slot(&self, id: AccountId) -> WalletResult<Slot> {
        self.by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| WalletError::not_found(format!("account {id}")))
    }
}

/// In-memory account table.
///
/// Two levels of locking:
/// - `indexes` (one `RwLock`) guards membership and the secondary indices. It
///   is held only long enough to find an account's slot.
/// - every account sits in its own `Mutex`, which is what balance changes and
///   pair transfers lock. Transfers on disjoint pairs never contend.
///
/// Lock order is always `indexes` before any account, and accounts in
/// ascending id order. Nothing takes `indexes` while holding an account.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    indexes: RwLock<Indexes>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read_indexes(&self) -> WalletResult<RwLockReadGuard<'_, Indexes>> {
        self.indexes
            .read()
            .map_err(|_| WalletError::internal("account index lock poisoned"))
    }

    fn lock(slot: &Slot) -> WalletResult<MutexGuard<'_, Account>> {
        slot.lock()
            .map_err(|_| WalletError::internal("account lock poisoned"))
    }

    fn snapshot(slot: &Slot) -> WalletResult<Account> {
        Ok(Self::lock(slot)?.clone())
    }

    fn lookup(
        &self,
        find: impl FnOnce(&Indexes) -> Option<AccountId>,
        describe: impl FnOnce() -> String,
    ) -> WalletResult<Account> {
        let slot = {
            let indexes = self.read_indexes()?;
            match find(&indexes) {
                Some(id) => indexes.slot(id)?,
                None => return Err(WalletError::not_found(describe())),
            }
        };
        Self::snapshot(&slot)
    }
}

impl AccountStore for InMemoryAccountStore {
    fn create(&self, candidate: NewAccount) -> WalletResult<Account> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| WalletError::internal("account index lock poisoned"))?;

        if indexes.by_username.contains_key(&candidate.username) {
            return Err(WalletError::DuplicateKey(DuplicateField::Username));
        }
        if indexes.by_email.contains_key(&candidate.email) {
            return Err(WalletError::DuplicateKey(DuplicateField::Email));
        }
        if indexes.by_address.contains_key(&candidate.address) {
            return Err(WalletError::DuplicateKey(DuplicateField::Address));
        }

        let id = AccountId::new();
        let account = Account::open(id, candidate, Utc::now());

        indexes
            .by_username
            .insert(account.username().to_string(), id);
        indexes.by_email.insert(account.email().to_string(), id);
        indexes.by_address.insert(account.address().clone(), id);
        indexes
            .by_id
            .insert(id, Arc::new(Mutex::new(account.clone())));

        debug!(account_id = %id, address = %account.address(), "account inserted");
        Ok(account)
    }

    fn get_by_id(&self, id: AccountId) -> WalletResult<Account> {
        let slot = self.read_indexes()?.slot(id)?;
        Self::snapshot(&slot)
    }

    fn get_by_username(&self, username: &str) -> WalletResult<Account> {
        self.lookup(
            |ix| ix.by_username.get(username).copied(),
            || format!("account with username {username:?}"),
        )
    }

    fn get_by_email(&self, email: &str) -> WalletResult<Account> {
        self.lookup(
            |ix| ix.by_email.get(email).copied(),
            || format!("account with email {email:?}"),
        )
    }

    fn get_by_address(&self, address: &Address) -> WalletResult<Account> {
        self.lookup(
            |ix| ix.by_address.get(address).copied(),
            || format!("account with address {address}"),
        )
    }

    fn adjust_balance(&self, id: AccountId, delta: i64) -> WalletResult<u64> {
        let slot = self.read_indexes()?.slot(id)?;
        let mut account = Self::lock(&slot)?;
        account.apply_delta(delta)
    }

    fn with_locked_pair<R, F>(&self, first: AccountId, second: AccountId, f: F) -> WalletResult<R>
    where
        F: FnOnce(&mut Account, &mut Account) -> WalletResult<R>,
    {
        if first == second {
            return Err(WalletError::SelfTransfer);
        }

        let (first_slot, second_slot) = {
            let indexes = self.read_indexes()?;
            (indexes.slot(first)?, indexes.slot(second)?)
        };

        // Canonical order: lower id first.
        if first < second {
            let mut a = Self::lock(&first_slot)?;
            let mut b = Self::lock(&second_slot)?;
            f(&mut *a, &mut *b)
        } else {
            let mut b = Self::lock(&second_slot)?;
            let mut a = Self::lock(&first_slot)?;
            f(&mut *a, &mut *b)
        }
    }

    fn total_balance(&self) -> WalletResult<u128> {
        let indexes = self.read_indexes()?;

        let mut slots: Vec<(&AccountId, &Slot)> = indexes.by_id.iter().collect();
        slots.sort_by_key(|(id, _)| **id);

        // Hold every account at once so no transfer lands mid-sum.
        let guards = slots
            .iter()
            .map(|(_, slot)| Self::lock(slot))
            .collect::<WalletResult<Vec<_>>>()?;

        Ok(guards.iter().map(|a| u128::from(a.balance())).sum())
    }

    fn len(&self) -> usize {
        self.indexes.read().map(|ix| ix.by_id.len()).unwrap_or(0)
    }
}
