//! Accounts module: wallet accounts and receiving addresses.
//!
//! Pure domain logic only: no locking, no storage, no IO.

pub mod account;
pub mod address;

pub use account::{Account, AccountProfile, NewAccount, PasswordHash};
pub use address::{
    Address, AddressGenerator, RandomAddressGenerator, DEFAULT_PREFIX, DEFAULT_SUFFIX_LEN,
};
