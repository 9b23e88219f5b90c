//! Per-dialect registries of datatypes and index types.
//!
//! A catalog is an immutable, ordered table built once when a dialect
//! context is created. Entries are looked up by name or alias, ignoring
//! case. Building a catalog from several sources keeps the first entry for
//! any given name, so a dialect can list its own variants before the shared
//! ones and the shared duplicates are dropped.

mod datatype;
mod index_type;

pub use datatype::{
    BooleanStyle, Datatype, DatatypeCategory, DatatypeFlags, Value, quote_literal,
    standard_datatypes,
};
pub use index_type::{IndexType, standard_index_types};

use crate::error::{Error, Result};

/// An entry that can live in a [`Catalog`].
pub trait CatalogEntry: Clone {
    /// Human-readable kind used in error messages.
    const KIND: &'static str;

    /// Canonical name.
    fn name(&self) -> &'static str;

    /// Alternative names accepted by [`Catalog::get_by_name`].
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Grouping key; entries are stably ordered by it.
    fn group(&self) -> u8 {
        0
    }

    /// Returns `true` if `name` is this entry's name or one of its aliases.
    fn answers_to(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
            || self.aliases().iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// An ordered, deduplicated registry.
#[derive(Debug, Clone)]
pub struct Catalog<T> {
    entries: Vec<T>,
}

impl<T: CatalogEntry> Catalog<T> {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> CatalogBuilder<T> {
        CatalogBuilder {
            entries: Vec::new(),
        }
    }

    /// Looks an entry up by name or alias, ignoring case.
    pub fn get_by_name(&self, name: &str) -> Result<T> {
        let name = name.trim();
        self.entries
            .iter()
            .find(|e| e.answers_to(name))
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: T::KIND,
                name: name.to_string(),
            })
    }

    /// Returns every entry in catalog order.
    #[must_use]
    pub fn get_all(&self) -> &[T] {
        &self.entries
    }

    /// Returns `true` if an entry answers to `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.answers_to(name))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Accumulates catalog entries in declaration order.
#[derive(Debug)]
pub struct CatalogBuilder<T> {
    entries: Vec<T>,
}

impl<T: CatalogEntry> CatalogBuilder<T> {
    /// Appends an entry unless one with the same name is already present.
    #[must_use]
    pub fn entry(mut self, entry: T) -> Self {
        let duplicate = self
            .entries
            .iter()
            .any(|e| e.answers_to(entry.name()) || entry.answers_to(e.name()));
        if !duplicate {
            self.entries.push(entry);
        }
        self
    }

    /// Appends several entries, skipping duplicates.
    #[must_use]
    pub fn extend(self, entries: impl IntoIterator<Item = T>) -> Self {
        entries.into_iter().fold(self, Self::entry)
    }

    /// Freezes the catalog, grouping entries while keeping declaration order
    /// within each group.
    #[must_use]
    pub fn build(mut self) -> Catalog<T> {
        self.entries.sort_by_key(|e| e.group());
        Catalog {
            entries: self.entries,
        }
    }
}
