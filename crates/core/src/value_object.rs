//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their
//! attribute values. A storage location `A-1-3` is a value object: two
//! locations with the same section, sub-section and bin are the same place.

/// Marker trait for value objects.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: no identity (`Location { section: "A", .. }`)
/// - **Entity**: has identity (a source line keyed by document + line id)
///
/// Value objects are immutable. To "modify" one, build a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Location {
///     section: String,
///     sub_section: String,
///     bin: String,
/// }
///
/// impl ValueObject for Location {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
