//! Wallet boundary façade.
//!
//! `WalletService` is what a transport (HTTP handler, RPC, CLI) calls. It
//! composes the credential/session collaborators with the account opener,
//! transfer engine and query service, and converts every failure into an
//! [`ApiError`]. Authentication is explicit: a transport resolves the bearer
//! token with [`WalletService::authenticate`] and passes the resulting
//! `AccountId` to the caller-scoped operations.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use tallypay_accounts::{AccountProfile, Address, RandomAddressGenerator};
use tallypay_auth::{
    Argon2Hasher, CredentialHasher, InMemorySessionIssuer, SessionIssuer, SessionToken,
};
use tallypay_core::{AccountId, Amount};
use tallypay_infra::{
    AccountOpener, AccountStore, InMemoryAccountStore, InMemoryTransactionLedger, OpenAccount,
    QueryService, ReceivePayload, ResolvedPayment, ScannedPayload, TransferEngine,
    TransferRequest, WalletConfig,
};
use tallypay_ledger::{IdempotencyKey, TransactionRecord};

use crate::dto::{
    LoginRequest, PayRequest, PayResponse, ReceiveRequest, RegisterRequest, SessionResponse,
};
use crate::errors::ApiError;

pub type SharedAccounts = Arc<InMemoryAccountStore>;
pub type SharedLedger = Arc<InMemoryTransactionLedger>;

pub struct WalletService {
    config: WalletConfig,
    accounts: SharedAccounts,
    opener: AccountOpener<SharedAccounts, RandomAddressGenerator>,
    engine: TransferEngine<SharedAccounts, SharedLedger>,
    queries: QueryService<SharedAccounts, SharedLedger>,
    hasher: Arc<dyn CredentialHasher>,
    sessions: Arc<dyn SessionIssuer>,
}

impl WalletService {
    /// Service with Argon2 hashing and in-memory sessions.
    pub fn new(config: WalletConfig) -> Self {
        let sessions = InMemorySessionIssuer::new(Duration::hours(config.session_ttl_hours));
        Self::with_collaborators(config, Arc::new(Argon2Hasher::new()), Arc::new(sessions))
    }

    pub fn with_collaborators(
        config: WalletConfig,
        hasher: Arc<dyn CredentialHasher>,
        sessions: Arc<dyn SessionIssuer>,
    ) -> Self {
        let accounts = InMemoryAccountStore::arc();
        let ledger = InMemoryTransactionLedger::arc();

        let opener = AccountOpener::new(
            accounts.clone(),
            RandomAddressGenerator::new(config.address_prefix.clone(), config.address_suffix_len),
            config.initial_balance,
            config.max_address_attempts,
        );
        let engine = TransferEngine::new(accounts.clone(), ledger.clone()).with_idempotency_retention(
            Duration::hours(config.idempotency_retention_hours),
        );
        let queries = QueryService::with_limits(
            accounts.clone(),
            ledger,
            config.default_history_limit,
            config.max_history_limit,
        );

        Self {
            config,
            accounts,
            opener,
            engine,
            queries,
            hasher,
            sessions,
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// `DuplicateKey` when the username or email is taken.
    pub fn register(&self, request: RegisterRequest) -> Result<SessionResponse, ApiError> {
        let password_hash = self.hasher.hash(&request.password)?;
        let account = self.opener.open(OpenAccount {
            username: request.username,
            email: request.email,
            password_hash,
        })?;

        let session_token = self.sessions.issue(account.id_typed(), Utc::now());
        Ok(SessionResponse {
            account: account.profile(),
            session_token,
        })
    }

    pub fn login(&self, request: LoginRequest) -> Result<SessionResponse, ApiError> {
        let account = self
            .accounts
            .get_by_email(&request.email)
            .map_err(|_| ApiError::InvalidCredentials)?;

        if !self.hasher.verify(&request.password, account.password_hash()) {
            info!(account_id = %account.id_typed(), "login rejected");
            return Err(ApiError::InvalidCredentials);
        }

        let session_token = self.sessions.issue(account.id_typed(), Utc::now());
        info!(account_id = %account.id_typed(), "login succeeded");
        Ok(SessionResponse {
            account: account.profile(),
            session_token,
        })
    }

    /// Resolve a bearer token to the calling account.
    pub fn authenticate(&self, token: &SessionToken) -> Result<AccountId, ApiError> {
        Ok(self.sessions.authenticate(token, Utc::now())?.account_id)
    }

    pub fn logout(&self, token: &SessionToken) {
        self.sessions.revoke(token);
    }

    pub fn profile(&self, caller: AccountId) -> Result<AccountProfile, ApiError> {
        Ok(self.queries.profile(caller)?)
    }

    pub fn pay(&self, caller: AccountId, request: PayRequest) -> Result<PayResponse, ApiError> {
        let amount = Amount::from_json(&request.amount)?;
        let mut transfer = TransferRequest::new(caller, Address::new(request.to), amount);
        if let Some(key) = request.idempotency_key {
            transfer = transfer.with_idempotency_key(IdempotencyKey::new(key)?);
        }

        let receipt = self.engine.execute(transfer)?;
        Ok(PayResponse {
            txid: receipt.record.txid(),
            new_balance: receipt.sender_balance,
            replayed: receipt.replayed,
        })
    }

    /// Newest first; `limit` defaults to and is capped by the configured page size.
    pub fn list_transactions(
        &self,
        caller: AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, ApiError> {
        Ok(self.queries.transaction_history(caller, limit)?)
    }

    pub fn generate_receive_payload(
        &self,
        caller: AccountId,
        request: ReceiveRequest,
    ) -> Result<ReceivePayload, ApiError> {
        let amount = match request.amount {
            None | Some(JsonValue::Null) => None,
            Some(raw) => Some(Amount::from_json(&raw)?),
        };
        Ok(self.queries.receive_payload(caller, amount)?)
    }

    /// The returned amount is only a suggestion; `pay` takes its own.
    pub fn resolve_receive_payload(&self, payload: &JsonValue) -> Result<ResolvedPayment, ApiError> {
        let scanned = ScannedPayload::from_json(payload)?;
        Ok(self.queries.resolve_payload(&scanned)?)
    }
}
