//! Positive amounts in minor currency units.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{WalletError, WalletResult};
use crate::value_object::ValueObject;

/// A strictly positive number of minor currency units (e.g. cents).
///
/// Floating-point never crosses this type: callers either hand in an integer
/// or go through [`Amount::from_json`], which rejects fractional values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    pub fn new(minor_units: u64) -> WalletResult<Self> {
        if minor_units == 0 {
            return Err(WalletError::invalid_amount("amount must be positive"));
        }
        Ok(Self(minor_units))
    }

    /// Accepts a signed value, rejecting zero and negatives.
    pub fn from_i64(minor_units: i64) -> WalletResult<Self> {
        let value = u64::try_from(minor_units)
            .map_err(|_| WalletError::invalid_amount(format!("{minor_units} is negative")))?;
        Self::new(value)
    }

    /// Parse an amount from a boundary JSON value.
    ///
    /// Integers are taken as-is. Floats are accepted only when they carry no
    /// fractional part (`300.0`). Strings, null, fractions, zero, negatives and
    /// values beyond `u64::MAX` fail with `InvalidAmount`.
    pub fn from_json(value: &JsonValue) -> WalletResult<Self> {
        let JsonValue::Number(n) = value else {
            return Err(WalletError::invalid_amount(format!(
                "expected a number, got {value}"
            )));
        };

        if let Some(v) = n.as_u64() {
            return Self::new(v);
        }
        if let Some(v) = n.as_i64() {
            return Self::from_i64(v);
        }

        let f = n
            .as_f64()
            .ok_or_else(|| WalletError::invalid_amount(format!("unrepresentable number {n}")))?;
        if !f.is_finite() || f.fract() != 0.0 {
            return Err(WalletError::invalid_amount(format!(
                "{n} is not a whole number of minor units"
            )));
        }
        if f <= 0.0 {
            return Err(WalletError::invalid_amount("amount must be positive"));
        }
        // u64::MAX as f64 rounds up to 2^64, so the bound is exclusive.
        if f >= u64::MAX as f64 {
            return Err(WalletError::invalid_amount(format!("{n} is out of range")));
        }
        Self::new(f as u64)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl ValueObject for Amount {}

impl TryFrom<u64> for Amount {
    type Error = WalletError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
