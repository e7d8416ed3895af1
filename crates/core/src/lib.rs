//! `tallypay-core` - wallet foundation building blocks.
//!
//! Pure domain primitives shared by every other crate: identifiers, amounts,
//! and the error taxonomy. No locking, storage, or IO lives here.

pub mod amount;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use amount::Amount;
pub use entity::Entity;
pub use error::{DuplicateField, WalletError, WalletResult};
pub use id::{AccountId, TransactionId};
pub use value_object::ValueObject;
