//! Request/response DTOs for the boundary operations.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tallypay_accounts::AccountProfile;
use tallypay_auth::SessionToken;
use tallypay_core::TransactionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub account: AccountProfile,
    pub session_token: SessionToken,
}

/// A payment as submitted by the payer.
///
/// `amount` stays raw JSON until the service parses it, so a fractional or
/// non-numeric amount is reported as `InvalidAmount` rather than as a
/// deserialisation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayRequest {
    pub to: String,
    pub amount: JsonValue,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayResponse {
    pub txid: TransactionId,
    pub new_balance: u64,
    pub replayed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiveRequest {
    #[serde(default)]
    pub amount: Option<JsonValue>,
}
