//! Transaction ledger boundary (append-only history of completed transfers).

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryTransactionLedger;
pub use r#trait::TransactionLedger;
