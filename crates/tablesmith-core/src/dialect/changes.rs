//! What differs between an original and a current table.

use std::collections::HashSet;

use crate::diff::{ChangeKind, Pair, reconcile};
use crate::id::EntityId;
use crate::schema::{Check, Column, ForeignKey, Index, Table};

/// The four reconciled collections of one table plus derived facts the
/// dialects need to order their statements.
///
/// Indexes and foreign keys name their columns, so renaming a column
/// changes them textually. They are compared by the ids of the columns they
/// cover instead, which keeps a rename from dropping and recreating every
/// index on the column.
#[derive(Debug)]
pub struct TableChanges<'a> {
    /// Table as last read from the database.
    pub original: &'a Table,
    /// Table as edited.
    pub current: &'a Table,
    /// Column pairs in current order, removed columns last.
    pub columns: Vec<Pair<'a, Column>>,
    /// Index pairs.
    pub indexes: Vec<Pair<'a, Index>>,
    /// Foreign key pairs.
    pub foreign_keys: Vec<Pair<'a, ForeignKey>>,
    /// Check pairs.
    pub checks: Vec<Pair<'a, Check>>,
    moved: HashSet<EntityId>,
}

impl<'a> TableChanges<'a> {
    /// Reconciles every collection of `original` and `current`.
    #[must_use]
    pub fn new(original: &'a Table, current: &'a Table) -> Self {
        Self {
            original,
            current,
            columns: reconcile(&original.columns, &current.columns),
            indexes: reconcile(&original.indexes, &current.indexes),
            foreign_keys: reconcile(&original.foreign_keys, &current.foreign_keys),
            checks: reconcile(&original.checks, &current.checks),
            moved: moved_columns(original, current),
        }
    }

    /// Returns `true` if there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.is_renamed()
            && !self.properties_changed()
            && self.moved.is_empty()
            && self.columns.iter().all(|p| p.kind() == ChangeKind::Unchanged)
            && self.dropped_indexes().is_empty()
            && self.created_indexes().is_empty()
            && self.dropped_foreign_keys().is_empty()
            && self.created_foreign_keys().is_empty()
            && self.checks.iter().all(|p| p.kind() == ChangeKind::Unchanged)
    }

    /// Returns `true` if the table name changed.
    #[must_use]
    pub fn is_renamed(&self) -> bool {
        self.original.name != self.current.name
    }

    /// Returns `true` if any table option changed.
    #[must_use]
    pub fn properties_changed(&self) -> bool {
        self.original.engine != self.current.engine
            || self.original.collation != self.current.collation
            || self.original.comment != self.current.comment
            || self.original.auto_increment != self.current.auto_increment
    }

    /// Columns only in the current table, in table order.
    pub fn added_columns(&self) -> impl Iterator<Item = &'a Column> + '_ {
        self.columns
            .iter()
            .filter(|p| p.original.is_none())
            .filter_map(|p| p.current)
    }

    /// Columns only in the original table.
    pub fn removed_columns(&self) -> impl Iterator<Item = &'a Column> + '_ {
        self.columns
            .iter()
            .filter(|p| p.current.is_none())
            .filter_map(|p| p.original)
    }

    /// Columns in both tables that differ or moved, in current order.
    pub fn changed_columns(&self) -> impl Iterator<Item = (&'a Column, &'a Column)> + '_ {
        self.columns.iter().filter_map(|p| match (p.original, p.current) {
            (Some(o), Some(c)) if o != c || self.moved.contains(&c.id) => Some((o, c)),
            _ => None,
        })
    }

    /// Columns in both tables whose definition differs, position aside.
    pub fn modified_columns(&self) -> impl Iterator<Item = (&'a Column, &'a Column)> + '_ {
        self.columns.iter().filter_map(Pair::modified)
    }

    /// Returns `true` if the column's neighbour changed.
    #[must_use]
    pub fn is_moved(&self, column: &Column) -> bool {
        self.moved.contains(&column.id)
    }

    /// Returns `true` if any surviving column changed position.
    #[must_use]
    pub fn has_moves(&self) -> bool {
        !self.moved.is_empty()
    }

    /// The column right before `column` in the current table.
    #[must_use]
    pub fn predecessor(&self, column: &Column) -> Option<&'a Column> {
        let at = self.current.columns.iter().position(|c| c.id == column.id)?;
        at.checked_sub(1).map(|i| &self.current.columns[i])
    }

    /// Returns `true` if a column follows `column` in the current table
    /// that already existed, so appending `column` would misplace it.
    #[must_use]
    pub fn needs_position(&self, column: &Column) -> bool {
        let Some(at) = self.current.columns.iter().position(|c| c.id == column.id) else {
            return false;
        };
        self.current.columns[at + 1..]
            .iter()
            .any(|c| self.original.column_by_id(c.id).is_some())
    }

    /// The name `column` had in the original table, if it existed.
    #[must_use]
    pub fn original_name(&self, column: &Column) -> Option<&'a str> {
        self.original
            .column_by_id(column.id)
            .map(|c| c.name.as_str())
    }

    /// Returns `true` if the primary key covers different columns.
    #[must_use]
    pub fn primary_key_changed(&self) -> bool {
        let before = self.original.primary_key_columns();
        let after = self.current.primary_key_columns();
        column_keys(self.original, &before) != column_keys(self.current, &after)
    }

    /// Original indexes that must go: removed ones and changed ones.
    #[must_use]
    pub fn dropped_indexes(&self) -> Vec<&'a Index> {
        self.indexes
            .iter()
            .filter_map(|p| match (p.original, p.current) {
                (Some(o), None) => Some(o),
                (Some(o), Some(c)) if !self.same_index(o, c) => Some(o),
                _ => None,
            })
            .collect()
    }

    /// Current indexes that must be created: new ones and changed ones.
    #[must_use]
    pub fn created_indexes(&self) -> Vec<&'a Index> {
        self.indexes
            .iter()
            .filter_map(|p| match (p.original, p.current) {
                (None, Some(c)) => Some(c),
                (Some(o), Some(c)) if !self.same_index(o, c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Original foreign keys that must go.
    #[must_use]
    pub fn dropped_foreign_keys(&self) -> Vec<&'a ForeignKey> {
        self.foreign_keys
            .iter()
            .filter_map(|p| match (p.original, p.current) {
                (Some(o), None) => Some(o),
                (Some(o), Some(c)) if !self.same_foreign_key(o, c) => Some(o),
                _ => None,
            })
            .collect()
    }

    /// Current foreign keys that must be created.
    #[must_use]
    pub fn created_foreign_keys(&self) -> Vec<&'a ForeignKey> {
        self.foreign_keys
            .iter()
            .filter_map(|p| match (p.original, p.current) {
                (None, Some(c)) => Some(c),
                (Some(o), Some(c)) if !self.same_foreign_key(o, c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Original checks that must go.
    #[must_use]
    pub fn dropped_checks(&self) -> Vec<&'a Check> {
        self.checks
            .iter()
            .filter(|p| matches!(p.kind(), ChangeKind::Removed | ChangeKind::Modified))
            .filter_map(|p| p.original)
            .collect()
    }

    /// Current checks that must be added.
    #[must_use]
    pub fn created_checks(&self) -> Vec<&'a Check> {
        self.checks
            .iter()
            .filter(|p| matches!(p.kind(), ChangeKind::Added | ChangeKind::Modified))
            .filter_map(|p| p.current)
            .collect()
    }

    fn same_index(&self, o: &Index, c: &Index) -> bool {
        o.name == c.name
            && o.index_type == c.index_type
            && o.condition == c.condition
            && o.expression == c.expression
            && o.origin == c.origin
            && column_keys(self.original, &o.columns) == column_keys(self.current, &c.columns)
    }

    fn same_foreign_key(&self, o: &ForeignKey, c: &ForeignKey) -> bool {
        o.name == c.name
            && o.reference_table == c.reference_table
            && o.reference_columns == c.reference_columns
            && o.on_update == c.on_update
            && o.on_delete == c.on_delete
            && column_keys(self.original, &o.columns) == column_keys(self.current, &c.columns)
    }
}

/// Column names resolved to ids where possible.
fn column_keys<'n, S: AsRef<str>>(table: &Table, names: &'n [S]) -> Vec<Result<EntityId, &'n str>> {
    names
        .iter()
        .map(|n| {
            let n = n.as_ref();
            table.column_by_name(n).map(|c| c.id).ok_or(n)
        })
        .collect()
}

/// Surviving columns whose predecessor among the survivors changed.
fn moved_columns(original: &Table, current: &Table) -> HashSet<EntityId> {
    let before: Vec<EntityId> = original
        .columns
        .iter()
        .map(|c| c.id)
        .filter(|id| current.column_by_id(*id).is_some())
        .collect();
    let after: Vec<EntityId> = current
        .columns
        .iter()
        .map(|c| c.id)
        .filter(|id| original.column_by_id(*id).is_some())
        .collect();
    if before == after {
        return HashSet::new();
    }
    after
        .iter()
        .enumerate()
        .filter(|(i, id)| {
            let now = i.checked_sub(1).map(|j| after[j]);
            let was = before
                .iter()
                .position(|b| b == *id)
                .and_then(|p| p.checked_sub(1))
                .map(|j| before[j]);
            now != was
        })
        .map(|(_, id)| *id)
        .collect()
}
