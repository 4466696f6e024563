//! Value object trait: equality by value, not identity.

/// Marker trait for immutable domain values compared by their attributes
/// (invoice lines, certificate numbers). "Modifying" a value object means
/// constructing a new one; construction is the validation boundary.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
