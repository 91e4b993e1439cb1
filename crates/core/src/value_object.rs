//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are immutable: a GPS point or a risk
/// score is defined entirely by its attributes, so two instances with the same
/// attributes are interchangeable. To "change" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
