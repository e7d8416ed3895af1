//! Concurrency and conservation tests for the transfer pipeline.
//!
//! Tests: AccountStore + TransactionLedger + TransferEngine under many threads.
//!
//! Verifies:
//! - No lost updates or double spends when transfers race on one sender
//! - No deadlock when transfers cross the same pair in opposite directions
//! - Value is conserved and every success leaves exactly one ledger record
//! - Direct balance adjustments and transfers on one account lose no updates

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use proptest::prelude::*;
    use rand::Rng;

    use tallypay_accounts::{Account, Address, NewAccount, PasswordHash};
    use tallypay_core::{Amount, WalletError};
    use tallypay_ledger::IdempotencyKey;

    use crate::account_store::{AccountStore, InMemoryAccountStore};
    use crate::transaction_ledger::{InMemoryTransactionLedger, TransactionLedger};
    use crate::transfer_engine::{TransferEngine, TransferRequest};

    type Engine = TransferEngine<Arc<InMemoryAccountStore>, Arc<InMemoryTransactionLedger>>;

    fn setup() -> Arc<Engine> {
        Arc::new(TransferEngine::new(
            InMemoryAccountStore::arc(),
            InMemoryTransactionLedger::arc(),
        ))
    }

    fn open(engine: &Engine, idx: usize, balance: u64) -> Account {
        engine
            .accounts()
            .create(NewAccount {
                username: format!("user{idx}"),
                email: format!("user{idx}@example.com"),
                password_hash: PasswordHash::new("hash"),
                address: Address::new(format!("WALLET_{idx:09}")),
                initial_balance: balance,
            })
            .unwrap()
    }

    fn balance(engine: &Engine, account: &Account) -> u64 {
        engine
            .accounts()
            .get_by_id(account.id_typed())
            .unwrap()
            .balance()
    }

    #[test]
    fn racing_spends_from_one_account_never_overdraw() {
        const BALANCE: u64 = 1000;
        const AMOUNT: u64 = 70;
        const THREADS: usize = 32;

        let engine = setup();
        let sender = open(&engine, 0, BALANCE);
        let recipients: Vec<Account> = (1..=4).map(|i| open(&engine, i, 0)).collect();

        let barrier = Arc::new(Barrier::new(THREADS));
        let successes = Arc::new(AtomicU64::new(0));
        let insufficient = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let engine = engine.clone();
                let barrier = barrier.clone();
                let successes = successes.clone();
                let insufficient = insufficient.clone();
                let sender_id = sender.id_typed();
                let to = recipients[t % recipients.len()].address().clone();
                thread::spawn(move || {
                    barrier.wait();
                    match engine.transfer(sender_id, &to, Amount::new(AMOUNT).unwrap()) {
                        Ok(_) => successes.fetch_add(1, Ordering::SeqCst),
                        Err(WalletError::InsufficientFunds { .. }) => {
                            insufficient.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(e) => panic!("unexpected error: {e}"),
                    };
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let expected_successes = BALANCE / AMOUNT;
        assert_eq!(successes.load(Ordering::SeqCst), expected_successes);
        assert_eq!(
            insufficient.load(Ordering::SeqCst),
            THREADS as u64 - expected_successes
        );
        assert_eq!(balance(&engine, &sender), BALANCE - AMOUNT * expected_successes);
        assert_eq!(engine.ledger().len() as u64, expected_successes);
        assert_eq!(engine.accounts().total_balance().unwrap(), u128::from(BALANCE));
    }

    #[test]
    fn opposite_direction_transfers_do_not_deadlock() {
        const ROUNDS: usize = 2_000;

        let engine = setup();
        let a = open(&engine, 0, 1_000_000);
        let b = open(&engine, 1, 1_000_000);

        let spawn_direction = |from: &Account, to: &Account| {
            let engine = engine.clone();
            let from_id = from.id_typed();
            let to_address = to.address().clone();
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    engine
                        .transfer(from_id, &to_address, Amount::new(3).unwrap())
                        .unwrap();
                }
            })
        };

        let forward = spawn_direction(&a, &b);
        let backward = spawn_direction(&b, &a);
        forward.join().unwrap();
        backward.join().unwrap();

        assert_eq!(balance(&engine, &a), 1_000_000);
        assert_eq!(balance(&engine, &b), 1_000_000);
        assert_eq!(engine.ledger().len(), 2 * ROUNDS);
    }

    #[test]
    fn balance_adjustments_interleave_with_transfers_without_lost_updates() {
        const ROUNDS: u64 = 5_000;
        const START: u64 = 100_000;

        let engine = setup();
        let a = open(&engine, 0, START);
        let b = open(&engine, 1, START);
        let barrier = Arc::new(Barrier::new(2));

        let spender = {
            let engine = engine.clone();
            let barrier = barrier.clone();
            let from_id = a.id_typed();
            let to_address = b.address().clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    engine
                        .transfer(from_id, &to_address, Amount::new(1).unwrap())
                        .unwrap();
                }
            })
        };
        let topper = {
            let engine = engine.clone();
            let barrier = barrier.clone();
            let id = a.id_typed();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    engine.accounts().adjust_balance(id, 1).unwrap();
                }
            })
        };
        spender.join().unwrap();
        topper.join().unwrap();

        assert_eq!(balance(&engine, &a), START);
        assert_eq!(balance(&engine, &b), START + ROUNDS);
        assert_eq!(
            engine.accounts().total_balance().unwrap(),
            u128::from(2 * START + ROUNDS)
        );
        assert_eq!(engine.ledger().len() as u64, ROUNDS);
    }

    #[test]
    fn random_concurrent_traffic_conserves_value() {
        const ACCOUNTS: usize = 8;
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;
        const START: u64 = 500;

        let engine = setup();
        let accounts: Arc<Vec<Account>> =
            Arc::new((0..ACCOUNTS).map(|i| open(&engine, i, START)).collect());
        let successes = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = engine.clone();
                let accounts = accounts.clone();
                let successes = successes.clone();
                thread::spawn(move || {
                    let mut rng = rand::thread_rng();
                    for _ in 0..PER_THREAD {
                        let from = rng.gen_range(0..ACCOUNTS);
                        let mut to = rng.gen_range(0..ACCOUNTS);
                        if to == from {
                            to = (to + 1) % ACCOUNTS;
                        }
                        let amount = Amount::new(rng.gen_range(1..=200)).unwrap();
                        match engine.transfer(
                            accounts[from].id_typed(),
                            accounts[to].address(),
                            amount,
                        ) {
                            Ok(_) => {
                                successes.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(WalletError::InsufficientFunds { .. }) => {}
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(
            engine.accounts().total_balance().unwrap(),
            u128::from(START) * ACCOUNTS as u128
        );
        assert_eq!(engine.ledger().len() as u64, successes.load(Ordering::SeqCst));

        // Every balance equals its opening balance replayed through the ledger.
        for account in accounts.iter() {
            let mut replayed = i128::from(START);
            for record in engine.ledger().query(account.address(), usize::MAX).unwrap() {
                assert!(record.involves(account.address()));
                let amount = i128::from(record.amount().get());
                if record.from() == account.address() {
                    replayed -= amount;
                } else {
                    replayed += amount;
                }
            }
            assert_eq!(replayed, i128::from(balance(&engine, account)));
        }
    }

    #[test]
    fn concurrent_duplicates_with_one_key_run_once() {
        const THREADS: usize = 16;

        let engine = setup();
        let sender = open(&engine, 0, 1000);
        let recipient = open(&engine, 1, 0);
        let request = TransferRequest::new(
            sender.id_typed(),
            recipient.address().clone(),
            Amount::new(100).unwrap(),
        )
        .with_idempotency_key(IdempotencyKey::new("checkout-7").unwrap());

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = engine.clone();
                let barrier = barrier.clone();
                let request = request.clone();
                thread::spawn(move || {
                    barrier.wait();
                    engine.execute(request).unwrap()
                })
            })
            .collect();

        let receipts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(receipts.iter().filter(|r| !r.replayed).count(), 1);
        assert!(receipts.iter().all(|r| r.record == receipts[0].record));
        assert_eq!(balance(&engine, &sender), 900);
        assert_eq!(balance(&engine, &recipient), 100);
        assert_eq!(engine.ledger().len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of transfer attempts, each success moves
        /// exactly its amount and appends exactly one record, each failure
        /// changes nothing, and the total never changes.
        #[test]
        fn transfers_conserve_value(
            starts in prop::collection::vec(0u64..5_000, 2..6),
            attempts in prop::collection::vec((0usize..6, 0usize..6, 1u64..3_000), 1..40)
        ) {
            let engine = setup();
            let accounts: Vec<Account> = starts
                .iter()
                .enumerate()
                .map(|(i, &b)| open(&engine, i, b))
                .collect();
            let total: u128 = starts.iter().map(|&b| u128::from(b)).sum();

            for (from, to, amount) in attempts {
                let from = &accounts[from % accounts.len()];
                let to = &accounts[to % accounts.len()];
                let before_from = balance(&engine, from);
                let before_to = balance(&engine, to);
                let before_len = engine.ledger().len();

                let result = engine.transfer(from.id_typed(), to.address(), Amount::new(amount).unwrap());

                match result {
                    Ok(receipt) => {
                        prop_assert_eq!(balance(&engine, from), before_from - amount);
                        prop_assert_eq!(balance(&engine, to), before_to + amount);
                        prop_assert_eq!(receipt.sender_balance, before_from - amount);
                        prop_assert_eq!(engine.ledger().len(), before_len + 1);
                        prop_assert_eq!(receipt.record.amount().get(), amount);
                    }
                    Err(WalletError::SelfTransfer) => {
                        prop_assert_eq!(from.id_typed(), to.id_typed());
                        prop_assert_eq!(engine.ledger().len(), before_len);
                    }
                    Err(WalletError::InsufficientFunds { .. }) => {
                        prop_assert!(before_from < amount);
                        prop_assert_eq!(balance(&engine, from), before_from);
                        prop_assert_eq!(balance(&engine, to), before_to);
                        prop_assert_eq!(engine.ledger().len(), before_len);
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }

                prop_assert_eq!(engine.accounts().total_balance().unwrap(), total);
            }
        }
    }
}
