//! Configuration loading and representation.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tallypay_accounts::{DEFAULT_PREFIX, DEFAULT_SUFFIX_LEN};

use crate::transfer_engine::DEFAULT_IDEMPOTENCY_RETENTION_HOURS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Shortest random address suffix accepted; 36^6 keeps collisions rare.
pub const MIN_ADDRESS_SUFFIX_LEN: usize = 6;

/// Wallet runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Balance every new account opens with, in minor units.
    pub initial_balance: u64,
    /// History page size when the caller does not ask for one.
    pub default_history_limit: usize,
    /// Largest history page a caller may request.
    pub max_history_limit: usize,
    pub address_prefix: String,
    pub address_suffix_len: usize,
    /// Fresh addresses tried before account opening gives up.
    pub max_address_attempts: usize,
    pub session_ttl_hours: i64,
    /// How long an idempotency key keeps replaying its transfer.
    pub idempotency_retention_hours: i64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000,
            default_history_limit: 50,
            max_history_limit: 50,
            address_prefix: DEFAULT_PREFIX.to_string(),
            address_suffix_len: DEFAULT_SUFFIX_LEN,
            max_address_attempts: 8,
            session_ttl_hours: 24,
            idempotency_retention_hours: DEFAULT_IDEMPOTENCY_RETENTION_HOURS,
        }
    }
}

impl WalletConfig {
    /// Read overrides from `TALLYPAY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let default_history_limit = parse_or(
            &lookup,
            "TALLYPAY_HISTORY_LIMIT",
            defaults.default_history_limit,
        )?;

        let address_prefix = lookup("TALLYPAY_ADDRESS_PREFIX").unwrap_or(defaults.address_prefix);
        if address_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "TALLYPAY_ADDRESS_PREFIX",
                value: address_prefix,
            });
        }
        let address_suffix_len = parse_or(
            &lookup,
            "TALLYPAY_ADDRESS_SUFFIX_LEN",
            defaults.address_suffix_len,
        )?;
        if address_suffix_len < MIN_ADDRESS_SUFFIX_LEN {
            return Err(ConfigError::Invalid {
                key: "TALLYPAY_ADDRESS_SUFFIX_LEN",
                value: address_suffix_len.to_string(),
            });
        }

        Ok(Self {
            initial_balance: parse_or(&lookup, "TALLYPAY_INITIAL_BALANCE", defaults.initial_balance)?,
            default_history_limit: default_history_limit.min(defaults.max_history_limit),
            max_history_limit: defaults.max_history_limit,
            address_prefix,
            address_suffix_len,
            max_address_attempts: parse_or(
                &lookup,
                "TALLYPAY_ADDRESS_ATTEMPTS",
                defaults.max_address_attempts,
            )?,
            session_ttl_hours: parse_or(
                &lookup,
                "TALLYPAY_SESSION_TTL_HOURS",
                defaults.session_ttl_hours,
            )?,
            idempotency_retention_hours: parse_or(
                &lookup,
                "TALLYPAY_IDEMPOTENCY_RETENTION_HOURS",
                defaults.idempotency_retention_hours,
            )?,
        })
    }
}

/// Parse `key` from `lookup`, falling back to `default` when unset.
pub fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
