//! `tallypay-auth` - credential and session boundary.
//!
//! The wallet core never sees passwords or tokens; this crate gives the
//! boundary layer a default implementation of both. It is decoupled from HTTP
//! and storage.

pub mod credentials;
pub mod session;

pub use credentials::{Argon2Hasher, CredentialHasher};
pub use session::{
    validate_claims, InMemorySessionIssuer, SessionClaims, SessionError, SessionIssuer,
    SessionToken,
};
