//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Read-model stores key their tables by `Entity::Id`, so identifiers must be
/// totally ordered (deterministic iteration for hashing, listing and replay).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
