//! Receiving addresses and their generator.

use rand::Rng;
use serde::{Deserialize, Serialize};

use tallypay_core::ValueObject;

/// Default address prefix.
pub const DEFAULT_PREFIX: &str = "WALLET_";
/// Default number of random characters after the prefix.
pub const DEFAULT_SUFFIX_LEN: usize = 9;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Opaque, unique transfer endpoint of an account.
///
/// Distinct from [`tallypay_core::AccountId`]: the id is internal, the address
/// is what payers type, share, or scan. Lookups accept any string; only
/// generated addresses are guaranteed to be well formed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `prefix` followed by exactly `suffix_len` uppercase ASCII alphanumerics.
    pub fn is_well_formed(&self, prefix: &str, suffix_len: usize) -> bool {
        match self.0.strip_prefix(prefix) {
            Some(suffix) => {
                suffix.len() == suffix_len
                    && suffix
                        .bytes()
                        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            }
            None => false,
        }
    }
}

impl ValueObject for Address {}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Source of candidate addresses for new accounts.
///
/// A generator only promises a low collision rate. Uniqueness is enforced by
/// the account store; account opening retries on an address collision.
pub trait AddressGenerator: Send + Sync {
    fn generate(&self) -> Address;
}

/// Random `PREFIX` + `[A-Z0-9]{n}` generator.
///
/// With the default 9-character suffix there are 36^9 (~1.0e14) candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomAddressGenerator {
    prefix: String,
    suffix_len: usize,
}

impl RandomAddressGenerator {
    pub fn new(prefix: impl Into<String>, suffix_len: usize) -> Self {
        Self {
            prefix: prefix.into(),
            suffix_len,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix_len
    }
}

impl Default for RandomAddressGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_SUFFIX_LEN)
    }
}

impl AddressGenerator for RandomAddressGenerator {
    fn generate(&self) -> Address {
        let mut rng = rand::thread_rng();
        let mut value = String::with_capacity(self.prefix.len() + self.suffix_len);
        value.push_str(&self.prefix);
        for _ in 0..self.suffix_len {
            let idx = rng.gen_range(0..SUFFIX_ALPHABET.len());
            value.push(SUFFIX_ALPHABET[idx] as char);
        }
        Address(value)
    }
}

impl<G> AddressGenerator for std::sync::Arc<G>
where
    G: AddressGenerator + ?Sized,
{
    fn generate(&self) -> Address {
        (**self).generate()
    }
}
