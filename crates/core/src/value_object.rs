//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// A column selection or an artifact reference carries no identity of its own;
/// two instances holding the same values are interchangeable. Implementors are
/// treated as immutable once constructed.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
