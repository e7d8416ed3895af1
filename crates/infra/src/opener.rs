//! Account opening: address allocation with collision retry.

use tracing::{error, info, warn};

use tallypay_accounts::{Account, AddressGenerator, NewAccount, PasswordHash};
use tallypay_core::{WalletError, WalletResult};

use crate::account_store::AccountStore;

/// Registration data, already validated and hashed by the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAccount {
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHash,
}

/// Opens accounts with a freshly generated, unique address.
///
/// The generator only makes collisions unlikely; the store is the authority.
/// On `DuplicateKey(Address)` a new candidate is drawn, up to `max_attempts`
/// times. Username/email collisions are returned to the caller unchanged.
pub struct AccountOpener<S, G> {
    accounts: S,
    addresses: G,
    initial_balance: u64,
    max_attempts: usize,
}

impl<S, G> AccountOpener<S, G>
where
    S: AccountStore,
    G: AddressGenerator,
{
    pub fn new(accounts: S, addresses: G, initial_balance: u64, max_attempts: usize) -> Self {
        Self {
            accounts,
            addresses,
            initial_balance,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn open(&self, request: OpenAccount) -> WalletResult<Account> {
        for attempt in 1..=self.max_attempts {
            let address = self.addresses.generate();
            let candidate = NewAccount {
                username: request.username.clone(),
                email: request.email.clone(),
                password_hash: request.password_hash.clone(),
                address: address.clone(),
                initial_balance: self.initial_balance,
            };

            match self.accounts.create(candidate) {
                Ok(account) => {
                    info!(
                        account_id = %account.id_typed(),
                        address = %account.address(),
                        balance = account.balance(),
                        "account opened"
                    );
                    return Ok(account);
                }
                Err(e) if e.is_address_collision() => {
                    warn!(attempt, address = %address, "address collision; drawing a new one");
                }
                Err(e) => return Err(e),
            }
        }

        error!(attempts = self.max_attempts, "no unique address found");
        Err(WalletError::internal(format!(
            "no unique address after {} attempts",
            self.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::Arc;
    use tallypay_accounts::{Address, RandomAddressGenerator};
    use tallypay_core::DuplicateField;

    use crate::account_store::InMemoryAccountStore;

    /// Hands out a scripted sequence of addresses, repeating the last one.
    struct ScriptedAddresses(Mutex<Vec<&'static str>>);

    impl ScriptedAddresses {
        fn new(mut script: Vec<&'static str>) -> Self {
            script.reverse();
            Self(Mutex::new(script))
        }
    }

    impl AddressGenerator for ScriptedAddresses {
        fn generate(&self) -> Address {
            let mut script = self.0.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script[0]
            };
            Address::from(next)
        }
    }

    fn request(name: &str) -> OpenAccount {
        OpenAccount {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: PasswordHash::new("hash"),
        }
    }

    #[test]
    fn opens_with_initial_balance_and_generated_address() {
        let store = InMemoryAccountStore::arc();
        let opener = AccountOpener::new(store.clone(), RandomAddressGenerator::default(), 1000, 8);

        let account = opener.open(request("alice")).unwrap();
        assert_eq!(account.balance(), 1000);
        assert!(account.address().is_well_formed("WALLET_", 9));
        assert_eq!(store.get_by_username("alice").unwrap(), account);
    }

    #[test]
    fn address_collision_is_retried() {
        let store = InMemoryAccountStore::arc();
        let opener = AccountOpener::new(
            store.clone(),
            ScriptedAddresses::new(vec!["WALLET_TAKEN0001", "WALLET_TAKEN0001", "WALLET_FRESH0001"]),
            1000,
            8,
        );

        let first = opener.open(request("alice")).unwrap();
        assert_eq!(first.address().as_str(), "WALLET_TAKEN0001");

        let second = opener.open(request("bob")).unwrap();
        assert_eq!(second.address().as_str(), "WALLET_FRESH0001");
    }

    #[test]
    fn exhausted_retries_are_internal() {
        let store = InMemoryAccountStore::arc();
        let opener = AccountOpener::new(
            store.clone(),
            ScriptedAddresses::new(vec!["WALLET_TAKEN0001"]),
            1000,
            3,
        );

        opener.open(request("alice")).unwrap();
        let err = opener.open(request("bob")).unwrap_err();
        assert!(matches!(err, WalletError::Internal(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn email_collision_is_not_retried() {
        let store = InMemoryAccountStore::arc();
        let generator = Arc::new(RandomAddressGenerator::default());
        let opener = AccountOpener::new(store.clone(), generator, 1000, 8);

        opener.open(request("alice")).unwrap();
        let mut dup = request("alice2");
        dup.email = "alice@example.com".to_string();

        assert_eq!(
            opener.open(dup).unwrap_err(),
            WalletError::DuplicateKey(DuplicateField::Email)
        );
    }
}
