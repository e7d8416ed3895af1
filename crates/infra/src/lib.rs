//! Infrastructure layer: shared stores, the transfer engine, and config.

pub mod account_store;
pub mod config;
#[cfg(test)]
mod integration_tests;
pub mod opener;
pub mod query_service;
pub mod transaction_ledger;
pub mod transfer_engine;

pub use account_store::{AccountStore, InMemoryAccountStore};
pub use config::{ConfigError, WalletConfig};
pub use opener::{AccountOpener, OpenAccount};
pub use query_service::{QueryService, ReceivePayload, ResolvedPayment, ScannedPayload};
pub use transaction_ledger::{InMemoryTransactionLedger, TransactionLedger};
pub use transfer_engine::{TransferEngine, TransferReceipt, TransferRequest};
