//! Entity identity.
//!
//! Entities read from the database carry the identity the database gave
//! them. Entities created during an edit session carry a pending id that is
//! unique within that session, so an original and a current version of the
//! same column, index, foreign key or check can be paired by id alone.

use std::fmt;

/// Identity of a table, column, index, foreign key or check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    /// Identity assigned by the database.
    Persisted(u64),
    /// Session-local identity of an entity that does not exist yet.
    /// Always negative.
    Pending(i64),
}

impl EntityId {
    /// Returns `true` if the entity has not been created in the database.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Returns `true` if the entity was read from the database.
    #[must_use]
    pub const fn is_persisted(self) -> bool {
        matches!(self, Self::Persisted(_))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => write!(f, "{id}"),
            Self::Pending(id) => write!(f, "pending({id})"),
        }
    }
}

/// Anything with a stable identity that the diff engine can pair.
pub trait Identified {
    /// Returns the entity's identity.
    fn id(&self) -> EntityId;
}

/// Hands out pending ids that never collide with ids already in use.
///
/// The next id is `min(0, smallest pending id in use) - 1`, so repeated
/// inserts in the same session keep counting down.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdAllocator {
    lowest: i64,
}

impl IdAllocator {
    /// Creates an allocator that starts below every pending id in `existing`.
    pub fn from_existing<'a>(existing: impl IntoIterator<Item = &'a EntityId>) -> Self {
        let lowest = existing
            .into_iter()
            .filter_map(|id| match id {
                EntityId::Pending(v) => Some(*v),
                EntityId::Persisted(_) => None,
            })
            .fold(0, i64::min);
        Self { lowest }
    }

    /// Returns the next pending id.
    pub fn next_pending(&mut self) -> EntityId {
        self.lowest -= 1;
        EntityId::Pending(self.lowest)
    }
}

/// Returns the next pending id for a collection of identified entities.
pub fn next_pending_id<T: Identified>(existing: &[T]) -> EntityId {
    let ids: Vec<EntityId> = existing.iter().map(Identified::id).collect();
    IdAllocator::from_existing(&ids).next_pending()
}
