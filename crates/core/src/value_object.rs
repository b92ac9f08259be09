//! Value object trait: equality by value, not identity.

/// Marker for small immutable values compared by value.
///
/// To "modify" one, build a new one. [`crate::CurrencyValue`] is the main
/// example in this crate; entities, by contrast, compare by id.
pub trait ValueObject: Copy + Eq + core::fmt::Debug + core::fmt::Display {}
