//! Entity trait: identity that survives state changes.

/// Entity marker + minimal interface.
///
/// Catalog definitions and inventory lots are entities: two lots with the same
/// remaining quantity are still different purchases.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
