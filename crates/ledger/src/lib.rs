//! Ledger module: immutable records of completed transfers.
//!
//! Pure domain types only; the append-only store lives in `tallypay-infra`.

pub mod idempotency;
pub mod transaction;

pub use idempotency::IdempotencyKey;
pub use transaction::{TransactionRecord, TransactionStatus};
