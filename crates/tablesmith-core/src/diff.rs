//! Identity-keyed reconciliation of two entity collections.
//!
//! [`reconcile`] pairs every entity of an original collection with the
//! entity of the current collection that has the same id. It knows nothing
//! about what the entities mean; dependencies between collections (an index
//! naming a dropped column, say) are handled by the dialect when it orders
//! statements.

use std::collections::HashMap;

use crate::id::{EntityId, Identified};

/// How the two sides of a [`Pair`] relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Only in the current collection.
    Added,
    /// Only in the original collection.
    Removed,
    /// In both, with different values.
    Modified,
    /// In both, with equal values.
    Unchanged,
}

/// One original entity and its current counterpart.
#[derive(Debug, PartialEq, Eq)]
pub struct Pair<'a, T> {
    /// The entity as it was.
    pub original: Option<&'a T>,
    /// The entity as it is now.
    pub current: Option<&'a T>,
}

impl<T> Clone for Pair<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Pair<'_, T> {}

impl<'a, T: PartialEq> Pair<'a, T> {
    /// Classifies the pair.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match (self.original, self.current) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            (Some(o), Some(c)) if o == c => ChangeKind::Unchanged,
            _ => ChangeKind::Modified,
        }
    }

    /// Returns both sides when the entity exists in both collections and
    /// differs.
    #[must_use]
    pub fn modified(&self) -> Option<(&'a T, &'a T)> {
        match (self.original, self.current) {
            (Some(o), Some(c)) if o != c => Some((o, c)),
            _ => None,
        }
    }
}

/// Pairs `original` and `current` by id.
///
/// Pairs come out in `current` order, each with the original of the same id
/// (if any); originals that have no current counterpart follow in their
/// original order. Every id of either input appears in exactly one pair.
pub fn reconcile<'a, T: Identified>(original: &'a [T], current: &'a [T]) -> Vec<Pair<'a, T>> {
    let by_id: HashMap<EntityId, usize> = original
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id(), i))
        .collect();
    let mut matched = vec![false; original.len()];
    let mut pairs = Vec::with_capacity(original.len().max(current.len()));

    for entity in current {
        let partner = match by_id.get(&entity.id()) {
            Some(&i) if !matched[i] => {
                matched[i] = true;
                Some(&original[i])
            }
            _ => None,
        };
        pairs.push(Pair {
            original: partner,
            current: Some(entity),
        });
    }

    for (entity, _) in original.iter().zip(&matched).filter(|(_, m)| !**m) {
        pairs.push(Pair {
            original: Some(entity),
            current: None,
        });
    }
    pairs
}

/// Returns `true` if any pair is not [`ChangeKind::Unchanged`].
pub fn has_changes<T: PartialEq>(pairs: &[Pair<'_, T>]) -> bool {
    pairs.iter().any(|p| p.kind() != ChangeKind::Unchanged)
}
