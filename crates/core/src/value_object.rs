//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values:
/// `Amount(300) == Amount(300)` regardless of where either came from. Wallet
/// addresses and amounts are value objects; accounts are entities.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
