use serde::{Deserialize, Serialize};

use tallypay_core::{WalletError, WalletResult};

/// Longest accepted idempotency key, in bytes.
pub const MAX_KEY_LEN: usize = 128;

/// Caller-supplied token identifying one logical transfer.
///
/// Keys are scoped to the sending account: two senders may use the same key
/// without interfering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(value: impl Into<String>) -> WalletResult<Self> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_KEY_LEN {
            return Err(WalletError::invalid_payload(format!(
                "idempotency key must be 1..={MAX_KEY_LEN} bytes"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

impl core::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
