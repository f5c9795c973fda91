//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Source lines are entities: a line keeps its identity while its issued
/// quantity grows, so two snapshots of the same line compare by `id()`,
/// not by value.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether `other` denotes the same entity (possibly in a different state).
    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
