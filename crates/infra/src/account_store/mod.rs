//! Account storage boundary.
//!
//! The trait describes what the transfer engine and query service need from
//! an account table; the in-memory implementation is the process-wide
//! authoritative store.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryAccountStore;
pub use r#trait::AccountStore;
