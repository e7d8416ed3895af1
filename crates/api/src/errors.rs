//! Mapping of wallet failures onto boundary responses.

use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::error;

use tallypay_auth::SessionError;
use tallypay_core::WalletError;

/// Failure of a boundary operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error(transparent)]
    Wallet(WalletError),

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] SessionError),

    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,
}

impl From<WalletError> for ApiError {
    fn from(value: WalletError) -> Self {
        if let WalletError::Internal(detail) = &value {
            error!(%detail, "internal wallet failure");
        }
        ApiError::Wallet(value)
    }
}

impl ApiError {
    /// HTTP-style status for transports that want one.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Wallet(e) => match e {
                WalletError::InvalidAmount(_) | WalletError::InvalidPayload(_) => 400,
                WalletError::NotFound(_) => 404,
                WalletError::DuplicateKey(_) => 409,
                WalletError::SelfTransfer | WalletError::InsufficientFunds { .. } => 422,
                WalletError::Internal(_) => 500,
            },
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials => 401,
        }
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Wallet(e) => match e {
                WalletError::InvalidAmount(_) => "invalid_amount",
                WalletError::NotFound(_) => "not_found",
                WalletError::DuplicateKey(_) => "duplicate_key",
                WalletError::SelfTransfer => "self_transfer",
                WalletError::InsufficientFunds { .. } => "insufficient_funds",
                WalletError::InvalidPayload(_) => "invalid_payload",
                WalletError::Internal(_) => "internal_error",
            },
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::InvalidCredentials => "invalid_credentials",
        }
    }

    /// `{ "error": code, "message": text }`. Internal details never leave here.
    pub fn body(&self) -> JsonValue {
        let message = match self {
            ApiError::Wallet(WalletError::Internal(_)) => "internal error".to_string(),
            other => other.to_string(),
        };
        json!({
            "error": self.error_code(),
            "message": message,
        })
    }
}
