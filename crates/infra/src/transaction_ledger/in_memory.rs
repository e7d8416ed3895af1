use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tallypay_accounts::Address;
use tallypay_core::{Entity, TransactionId, WalletError, WalletResult};
use tallypay_ledger::TransactionRecord;

use super::r#trait::TransactionLedger;

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<TransactionRecord>,
    /// Positions in `records`, ascending, for every address a record involves.
    by_address: HashMap<Address, Vec<usize>>,
    by_id: HashMap<TransactionId, usize>,
}

/// In-memory append-only ledger with an address index.
///
/// `append` is O(1) amortised; `query` touches only the records of the
/// requested address.
#[derive(Debug, Default)]
pub struct InMemoryTransactionLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryTransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TransactionLedger for InMemoryTransactionLedger {
    fn append(&self, record: TransactionRecord) -> WalletResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| WalletError::internal("ledger lock poisoned"))?;

        let id = *record.id();
        if state.by_id.contains_key(&id) {
            return Err(WalletError::internal(format!(
                "transaction id {id} already recorded"
            )));
        }

        let position = state.records.len();
        state.by_id.insert(id, position);
        state
            .by_address
            .entry(record.from().clone())
            .or_default()
            .push(position);
        state
            .by_address
            .entry(record.to().clone())
            .or_default()
            .push(position);
        state.records.push(record);

        Ok(())
    }

    fn query(&self, address: &Address, limit: usize) -> WalletResult<Vec<TransactionRecord>> {
        let state = self
            .state
            .read()
            .map_err(|_| WalletError::internal("ledger lock poisoned"))?;

        let Some(positions) = state.by_address.get(address) else {
            return Ok(vec![]);
        };

        Ok(positions
            .iter()
            .rev()
            .take(limit)
            .map(|&idx| state.records[idx].clone())
            .collect())
    }

    fn get(&self, id: TransactionId) -> WalletResult<TransactionRecord> {
        let state = self
            .state
            .read()
            .map_err(|_| WalletError::internal("ledger lock poisoned"))?;

        state
            .by_id
            .get(&id)
            .map(|&idx| state.records[idx].clone())
            .ok_or_else(|| WalletError::not_found(format!("transaction {id}")))
    }

    fn len(&self) -> usize {
        self.state.read().map(|s| s.records.len()).unwrap_or(0)
    }
}
