//! `tallypay-soak`: drive concurrent random transfers against the in-memory
//! stores and check that value is conserved and the ledger agrees with the
//! balances.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, bail};
use rand::Rng;

use tallypay_accounts::{Account, Address, PasswordHash, RandomAddressGenerator};
use tallypay_core::{Amount, WalletError};
use tallypay_infra::config::parse_or;
use tallypay_infra::{
    AccountOpener, AccountStore, InMemoryAccountStore, InMemoryTransactionLedger, OpenAccount,
    TransactionLedger, TransferEngine, WalletConfig,
};

struct SoakConfig {
    accounts: usize,
    workers: usize,
    transfers_per_worker: usize,
    max_amount: u64,
}

impl SoakConfig {
    fn from_env() -> anyhow::Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok();
        Ok(Self {
            accounts: parse_or(&lookup, "TALLYPAY_SOAK_ACCOUNTS", 16)?,
            workers: parse_or(&lookup, "TALLYPAY_SOAK_WORKERS", 8)?,
            transfers_per_worker: parse_or(&lookup, "TALLYPAY_SOAK_TRANSFERS", 2_000)?,
            max_amount: parse_or(&lookup, "TALLYPAY_SOAK_MAX_AMOUNT", 250)?,
        })
    }
}

fn main() -> anyhow::Result<()> {
    tallypay_observability::init();

    let config = WalletConfig::from_env().context("loading wallet config")?;
    let soak = SoakConfig::from_env().context("loading soak config")?;
    if soak.accounts < 2 || soak.max_amount == 0 {
        bail!("soak needs at least two accounts and a positive max amount");
    }

    let accounts = InMemoryAccountStore::arc();
    let ledger = InMemoryTransactionLedger::arc();
    let opener = AccountOpener::new(
        accounts.clone(),
        RandomAddressGenerator::new(config.address_prefix.clone(), config.address_suffix_len),
        config.initial_balance,
        config.max_address_attempts,
    );

    let opened: Vec<Account> = (0..soak.accounts)
        .map(|i| {
            opener.open(OpenAccount {
                username: format!("soak-{i}"),
                email: format!("soak-{i}@tallypay.test"),
                password_hash: PasswordHash::new("soak"),
            })
        })
        .collect::<Result<_, _>>()
        .context("opening soak accounts")?;
    if let Some(bad) = opened
        .iter()
        .find(|a| !a.address().is_well_formed(&config.address_prefix, config.address_suffix_len))
    {
        bail!("generated address {} does not match the configured format", bad.address());
    }

    let engine = TransferEngine::new(accounts.clone(), ledger.clone());
    let succeeded = AtomicU64::new(0);
    let rejected = AtomicU64::new(0);

    tracing::info!(
        accounts = soak.accounts,
        workers = soak.workers,
        transfers_per_worker = soak.transfers_per_worker,
        "soak started"
    );

    std::thread::scope(|scope| {
        for _ in 0..soak.workers {
            scope.spawn(|| {
                let mut rng = rand::thread_rng();
                for _ in 0..soak.transfers_per_worker {
                    let from = &opened[rng.gen_range(0..opened.len())];
                    let to = &opened[rng.gen_range(0..opened.len())];
                    let Ok(amount) = Amount::new(rng.gen_range(1..=soak.max_amount)) else {
                        continue;
                    };
                    match engine.transfer(from.id_typed(), to.address(), amount) {
                        Ok(_) => {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(WalletError::SelfTransfer | WalletError::InsufficientFunds { .. }) => {
                            rejected.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "unexpected transfer failure");
                            rejected.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            });
        }
    });

    let succeeded = succeeded.into_inner();
    let expected_total = u128::from(config.initial_balance) * soak.accounts as u128;
    let total = accounts.total_balance()?;
    if total != expected_total {
        bail!("value not conserved: expected {expected_total}, found {total}");
    }
    if ledger.len() as u64 != succeeded {
        bail!(
            "ledger holds {} records but {succeeded} transfers succeeded",
            ledger.len()
        );
    }

    let mut replayed: HashMap<Address, i128> = opened
        .iter()
        .map(|a| (a.address().clone(), i128::from(config.initial_balance)))
        .collect();
    for account in &opened {
        for record in ledger.query(account.address(), usize::MAX)? {
            if !record.involves(account.address()) {
                bail!(
                    "history of {} returned unrelated transaction {}",
                    account.address(),
                    record.txid()
                );
            }
            if record.from() == account.address() {
                *replayed.entry(account.address().clone()).or_default() -=
                    i128::from(record.amount().get());
            } else {
                *replayed.entry(account.address().clone()).or_default() +=
                    i128::from(record.amount().get());
            }
        }
    }
    for account in &opened {
        let live = accounts.get_by_id(account.id_typed())?.balance();
        let expected = replayed.get(account.address()).copied().unwrap_or_default();
        if i128::from(live) != expected {
            bail!(
                "ledger replay for {} gives {expected}, live balance is {live}",
                account.address()
            );
        }
    }

    tracing::info!(
        succeeded,
        rejected = rejected.into_inner(),
        total = %total,
        "soak finished; value conserved"
    );
    Ok(())
}
