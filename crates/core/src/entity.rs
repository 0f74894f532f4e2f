//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every row the store owns (products, sales, inventory records) is an entity
/// with a store-assigned, strictly increasing identifier.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
