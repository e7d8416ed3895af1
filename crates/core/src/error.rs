//! Wallet error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the wallet domain and engine.
pub type WalletResult<T> = Result<T, WalletError>;

/// Unique key that a write collided with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateField {
    Username,
    Email,
    Address,
    /// A sender reused an idempotency key for a different transfer.
    IdempotencyKey,
}

impl core::fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            DuplicateField::Username => "username",
            DuplicateField::Email => "email",
            DuplicateField::Address => "address",
            DuplicateField::IdempotencyKey => "idempotency key",
        };
        f.write_str(name)
    }
}

/// Wallet-level error.
///
/// Every variant is a typed outcome handed back to the boundary layer. Only
/// `Internal` represents an unexpected failure; its message is meant for logs,
/// not for callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Amount was not a positive integer number of minor units.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// An account (sender, recipient, or lookup target) or record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("duplicate {0}")]
    DuplicateKey(DuplicateField),

    /// Sender and recipient resolve to the same address.
    #[error("cannot transfer to own address")]
    SelfTransfer,

    /// The debit would take the balance below zero.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },

    /// A receive payload could not be interpreted.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Unexpected failure (poisoned lock, exhausted retries, overflow).
    #[error("internal error: {0}")]
    Internal(String),
}

impl WalletError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for `DuplicateKey(Address)`, the only collision account opening retries.
    pub fn is_address_collision(&self) -> bool {
        matches!(self, WalletError::DuplicateKey(DuplicateField::Address))
    }
}
