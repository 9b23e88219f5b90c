//! Table definitions.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::error::{Error, Result, ValidationIssue};
use crate::id::{EntityId, Identified, next_pending_id};

use super::{Check, Column, ForeignKey, Index};

/// A table together with the collections it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Identity; pending until the table is created.
    pub id: EntityId,
    /// Table name.
    pub name: String,
    /// Storage engine (MariaDB/MySQL).
    pub engine: Option<String>,
    /// Default collation.
    pub collation: Option<String>,
    /// Table comment.
    pub comment: Option<String>,
    /// Next auto-increment value.
    pub auto_increment: Option<u64>,
    /// Approximate row count, informational.
    pub row_count: Option<u64>,
    /// Creation time, informational.
    pub created_at: Option<NaiveDateTime>,
    /// Last modification time, informational.
    pub updated_at: Option<NaiveDateTime>,
    /// Columns in table order.
    pub columns: Vec<Column>,
    /// Indexes, including the primary key.
    pub indexes: Vec<Index>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKey>,
    /// Table-level check constraints.
    pub checks: Vec<Check>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            engine: None,
            collation: None,
            comment: None,
            auto_increment: None,
            row_count: None,
            created_at: None,
            updated_at: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Creates an empty table that does not exist in the database yet.
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self::new(EntityId::Pending(-1), name)
    }

    /// Returns `true` once the table exists in the database.
    #[must_use]
    pub fn is_created(&self) -> bool {
        !self.id.is_pending()
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, mut column: Column) -> Self {
        column.position = self.columns.len();
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Sets the storage engine.
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Sets the default collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns a copy under a different name.
    #[must_use]
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Next pending id for a new column.
    #[must_use]
    pub fn next_column_id(&self) -> EntityId {
        next_pending_id(&self.columns)
    }

    /// Next pending id for a new index.
    #[must_use]
    pub fn next_index_id(&self) -> EntityId {
        next_pending_id(&self.indexes)
    }

    /// Next pending id for a new foreign key.
    #[must_use]
    pub fn next_foreign_key_id(&self) -> EntityId {
        next_pending_id(&self.foreign_keys)
    }

    /// Next pending id for a new check.
    #[must_use]
    pub fn next_check_id(&self) -> EntityId {
        next_pending_id(&self.checks)
    }

    /// Replaces the column collection, renumbering positions.
    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
        self.renumber_columns();
    }

    /// Inserts a column at `position` (clamped to the end).
    pub fn insert_column(&mut self, position: usize, column: Column) {
        let at = position.min(self.columns.len());
        self.columns.insert(at, column);
        self.renumber_columns();
    }

    /// Replaces the column with the same id. Returns `false` if there is none.
    pub fn replace_column(&mut self, column: Column) -> bool {
        match self.columns.iter_mut().find(|c| c.id == column.id) {
            Some(slot) => {
                let position = slot.position;
                *slot = column;
                slot.position = position;
                true
            }
            None => false,
        }
    }

    /// Removes a column by id.
    pub fn remove_column(&mut self, id: EntityId) -> Option<Column> {
        let at = self.columns.iter().position(|c| c.id == id)?;
        let removed = self.columns.remove(at);
        self.renumber_columns();
        Some(removed)
    }

    /// Renames a column and every reference to it: index and foreign key
    /// column lists, index conditions and key expressions, check constraints
    /// and generation expressions. Expressions are rewritten token by token;
    /// string literals and function names are left alone.
    pub fn rename_column(&mut self, id: EntityId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound {
                kind: "column",
                name: id.to_string(),
            })?;
        let old = std::mem::replace(&mut column.name, name.clone());
        for index in &mut self.indexes {
            for c in index.columns.iter_mut().filter(|c| **c == old) {
                c.clone_from(&name);
            }
        }
        for fk in &mut self.foreign_keys {
            for c in fk.columns.iter_mut().filter(|c| **c == old) {
                c.clone_from(&name);
            }
        }

        let rename = |expr: &mut String| *expr = rename_identifier(expr, &old, &name);
        for index in &mut self.indexes {
            index.condition.iter_mut().for_each(rename);
            index.expression.iter_mut().for_each(rename);
        }
        for column in &mut self.columns {
            column.check.iter_mut().for_each(rename);
            column.expression.iter_mut().for_each(rename);
        }
        for check in &mut self.checks {
            rename(&mut check.expression);
        }
        Ok(())
    }

    /// Replaces the index with the same id. Returns `false` if there is none.
    pub fn replace_index(&mut self, index: Index) -> bool {
        replace_by_id(&mut self.indexes, index)
    }

    /// Removes an index by id.
    pub fn remove_index(&mut self, id: EntityId) -> Option<Index> {
        remove_by_id(&mut self.indexes, id)
    }

    /// Replaces the foreign key with the same id.
    pub fn replace_foreign_key(&mut self, foreign_key: ForeignKey) -> bool {
        replace_by_id(&mut self.foreign_keys, foreign_key)
    }

    /// Removes a foreign key by id.
    pub fn remove_foreign_key(&mut self, id: EntityId) -> Option<ForeignKey> {
        remove_by_id(&mut self.foreign_keys, id)
    }

    /// Removes a check by id.
    pub fn remove_check(&mut self, id: EntityId) -> Option<Check> {
        remove_by_id(&mut self.checks, id)
    }

    /// Extends an index with one more column.
    ///
    /// Refused when the index type does not allow appending.
    pub fn append_to_index(&mut self, index_id: EntityId, column: &str) -> Result<()> {
        if self.column_by_name(column).is_none() {
            return Err(Error::NotFound {
                kind: "column",
                name: column.to_string(),
            });
        }
        let index = self
            .indexes
            .iter_mut()
            .find(|i| i.id == index_id)
            .ok_or_else(|| Error::NotFound {
                kind: "index",
                name: index_id.to_string(),
            })?;
        if !index.index_type.enable_append {
            return Err(Error::Unsupported(format!(
                "{} index \"{}\" cannot be extended with another column",
                index.index_type.name, index.name
            )));
        }
        if !index.contains(column) {
            index.columns.push(column.to_string());
        }
        Ok(())
    }

    /// Finds a column by id.
    #[must_use]
    pub fn column_by_id(&self, id: EntityId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Finds a column by name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary key index, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary())
    }

    /// Returns the primary key column names in key order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.primary_key()
            .map(|pk| pk.columns.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns `true` if `column` is part of the primary key.
    #[must_use]
    pub fn is_primary_key(&self, column: &Column) -> bool {
        self.indexes
            .iter()
            .any(|i| i.is_primary() && i.contains(&column.name))
    }

    /// Returns `true` if `column` alone makes up a unique (non-primary) key.
    #[must_use]
    pub fn is_unique_key(&self, column: &Column) -> bool {
        self.indexes.iter().any(|i| {
            i.index_type.is_unique
                && !i.is_primary()
                && i.condition.is_none()
                && i.columns.len() == 1
                && i.contains(&column.name)
        })
    }

    /// Collects every validation issue of the table and everything it owns.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let entity = format!("table \"{}\"", self.name);
        let mut issues = Vec::new();

        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new(&entity, "name is empty"));
        } else if self.name.chars().any(char::is_whitespace) {
            issues.push(ValidationIssue::new(&entity, "name contains whitespace"));
        }
        if self.columns.is_empty() {
            issues.push(ValidationIssue::new(&entity, "has no columns"));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.to_lowercase()) {
                issues.push(ValidationIssue::new(
                    &entity,
                    format!("column \"{}\" is defined twice", column.name),
                ));
            }
            issues.extend(column.validate());
        }

        if self.indexes.iter().filter(|i| i.is_primary()).count() > 1 {
            issues.push(ValidationIssue::new(&entity, "has more than one primary key"));
        }
        for index in &self.indexes {
            issues.extend(index.validate());
            for name in index.columns.iter().filter(|n| self.column_by_name(n).is_none()) {
                issues.push(ValidationIssue::new(
                    format!("index \"{}\"", index.name),
                    format!("column \"{name}\" does not exist"),
                ));
            }
        }
        for fk in &self.foreign_keys {
            issues.extend(fk.validate());
            for name in fk.columns.iter().filter(|n| self.column_by_name(n).is_none()) {
                issues.push(ValidationIssue::new(
                    format!("foreign key \"{}\"", fk.name),
                    format!("column \"{name}\" does not exist"),
                ));
            }
        }
        for check in &self.checks {
            issues.extend(check.validate());
        }

        let shared = [
            ("columns", duplicate_ids(&self.columns)),
            ("indexes", duplicate_ids(&self.indexes)),
            ("foreign keys", duplicate_ids(&self.foreign_keys)),
            ("checks", duplicate_ids(&self.checks)),
        ];
        for (kind, ids) in shared {
            for id in ids {
                issues.push(ValidationIssue::new(
                    &entity,
                    format!("two {kind} share the id {id}"),
                ));
            }
        }
        issues
    }

    /// Returns `true` if the table and everything it owns is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Fails with [`Error::Validation`] unless the table is valid.
    pub fn ensure_valid(&self) -> Result<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(issues))
        }
    }

    fn renumber_columns(&mut self) {
        for (position, column) in self.columns.iter_mut().enumerate() {
            column.position = position;
        }
    }
}

impl Identified for Table {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Replaces references to the column `old` in `expr` with `new`.
///
/// Bare identifiers match case-insensitively, quoted ones (`"x"`, `` `x` ``,
/// `[x]`) exactly. A bare identifier followed by `(` is a function call and
/// is kept.
fn rename_identifier(expr: &str, old: &str, new: &str) -> String {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = String::with_capacity(expr.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\'' => {
                let end = literal_end(&chars, i, '\'');
                out.extend(&chars[i..end]);
                i = end;
            }
            '"' | '`' | '[' => {
                let close = if ch == '[' { ']' } else { ch };
                let end = literal_end(&chars, i, close);
                let terminated = end > i + 1 && chars[end - 1] == close;
                if terminated && chars[i + 1..end - 1].iter().copied().eq(old.chars()) {
                    out.push(ch);
                    out.push_str(new);
                    out.push(close);
                } else {
                    out.extend(&chars[i..end]);
                }
                i = end;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let called = chars[i..].iter().find(|c| !c.is_whitespace()) == Some(&'(');
                if !called && word.eq_ignore_ascii_case(old) {
                    out.push_str(new);
                } else {
                    out.push_str(&word);
                }
            }
            c if c.is_ascii_digit() => {
                // Numbers like `1e5` are not identifiers.
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Index just past the quoted run opened at `start`. A doubled closing
/// character is an escape. Runs to the end of `chars` when unterminated.
fn literal_end(chars: &[char], start: usize, close: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == close {
            if close != ']' && chars.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

/// Ids used by more than one of `items`, each reported once.
fn duplicate_ids<T: Identified>(items: &[T]) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for id in items.iter().map(Identified::id) {
        if !seen.insert(id) && !repeated.contains(&id) {
            repeated.push(id);
        }
    }
    repeated
}

fn replace_by_id<T: Identified>(items: &mut [T], item: T) -> bool {
    match items.iter_mut().find(|i| i.id() == item.id()) {
        Some(slot) => {
            *slot = item;
            true
        }
        None => false,
    }
}

fn remove_by_id<T: Identified>(items: &mut Vec<T>, id: EntityId) -> Option<T> {
    let at = items.iter().position(|i| i.id() == id)?;
    Some(items.remove(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Datatype, DatatypeCategory, IndexType};
    use crate::schema::Virtuality;

    fn integer() -> Datatype {
        Datatype::new("INTEGER", DatatypeCategory::Integer)
    }

    fn varchar() -> Datatype {
        Datatype::new("VARCHAR", DatatypeCategory::Text).with_length()
    }

    fn users() -> Table {
        Table::new(EntityId::Persisted(1), "users")
            .column(Column::new(EntityId::Persisted(1), "id", integer()).not_null())
            .column(Column::new(EntityId::Persisted(2), "email", varchar()).length(255))
            .index(Index::new(
                EntityId::Persisted(1),
                "PRIMARY",
                IndexType::primary(),
                ["id"],
            ))
            .index(Index::new(
                EntityId::Persisted(2),
                "uq_email",
                IndexType::unique(),
                ["email"],
            ))
    }

    #[test]
    fn keys_are_derived_from_indexes() {
        let table = users();
        let id = table.column_by_name("id").unwrap();
        let email = table.column_by_name("email").unwrap();
        assert!(table.is_primary_key(id));
        assert!(!table.is_primary_key(email));
        assert!(table.is_unique_key(email));
        assert!(!table.is_unique_key(id));
    }

    #[test]
    fn keys_follow_index_edits() {
        let mut table = users();
        table.remove_index(EntityId::Persisted(2));
        let email = table.column_by_name("email").unwrap().clone();
        assert!(!table.is_unique_key(&email));
    }

    #[test]
    fn positions_follow_order() {
        let mut table = users();
        let id = table.next_column_id();
        table.insert_column(1, Column::new(id, "name", integer()));
        let names: Vec<(&str, usize)> = table
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.position))
            .collect();
        assert_eq!(names, vec![("id", 0), ("name", 1), ("email", 2)]);
    }

    #[test]
    fn pending_ids_do_not_collide() {
        let mut table = users();
        let first = table.next_column_id();
        assert_eq!(first, EntityId::Pending(-1));
        table = table.column(Column::new(first, "a", integer()));
        assert_eq!(table.next_column_id(), EntityId::Pending(-2));
    }

    #[test]
    fn rename_column_updates_indexes() {
        let mut table = users();
        table.rename_column(EntityId::Persisted(2), "mail").unwrap();
        assert_eq!(table.indexes[1].columns, vec!["mail".to_string()]);
        assert!(table.is_valid());
    }

    #[test]
    fn rename_column_rewrites_expressions() {
        let mut table = users()
            .column(
                Column::new(EntityId::Persisted(3), "domain", varchar())
                    .length(64)
                    .generated(Virtuality::Virtual, "substr(email, instr(email, '@') + 1)")
                    .check("length(\"email\") > 3"),
            )
            .index(
                Index::on_expressions(
                    EntityId::Persisted(3),
                    "idx_lower_email",
                    IndexType::expression(),
                    ["lower(email)"],
                )
                .condition("email <> 'email'"),
            )
            .check(Check::named(EntityId::Persisted(1), "not_admin", "EMAIL NOT LIKE 'admin@%'"));
        table.rename_column(EntityId::Persisted(2), "mail").unwrap();

        let domain = table.column_by_name("domain").unwrap();
        assert_eq!(
            domain.expression.as_deref(),
            Some("substr(mail, instr(mail, '@') + 1)")
        );
        assert_eq!(domain.check.as_deref(), Some("length(\"mail\") > 3"));
        let index = &table.indexes[2];
        assert_eq!(index.expression, vec!["lower(mail)".to_string()]);
        assert_eq!(index.condition.as_deref(), Some("mail <> 'email'"));
        assert_eq!(table.checks[0].expression, "mail NOT LIKE 'admin@%'");
    }

    #[test]
    fn renaming_leaves_calls_and_lookalikes_alone() {
        assert_eq!(rename_identifier("length(length) > 0", "length", "len"), "length(len) > 0");
        assert_eq!(rename_identifier("emails + email_2 + email", "email", "m"), "emails + email_2 + m");
        assert_eq!(rename_identifier("[email] = 'it''s email'", "email", "m"), "[m] = 'it''s email'");
        assert_eq!(rename_identifier("x > 1e5", "e5", "y"), "x > 1e5");
    }

    #[test]
    fn append_respects_index_type() {
        let mut table = users().column(Column::new(EntityId::Pending(-1), "body", integer()));
        table
            .append_to_index(EntityId::Persisted(2), "body")
            .unwrap();
        assert_eq!(table.indexes[1].columns, vec!["email", "body"]);

        table = table.index(Index::new(
            EntityId::Pending(-1),
            "ft_body",
            IndexType::fulltext(),
            ["body"],
        ));
        let err = table
            .append_to_index(EntityId::Pending(-1), "email")
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn validation_catches_structure() {
        assert!(users().is_valid());

        let empty = Table::pending("empty");
        assert!(!empty.is_valid());

        let spaced = users().renamed("my users");
        assert!(!spaced.is_valid());

        let dup = users().column(Column::new(EntityId::Pending(-1), "EMAIL", integer()));
        assert!(!dup.is_valid());

        let dangling = users().index(Index::new(
            EntityId::Pending(-1),
            "idx_missing",
            IndexType::normal(),
            ["missing"],
        ));
        let err = dangling.ensure_valid().unwrap_err();
        assert!(err.to_string().contains("\"missing\" does not exist"));
    }

    #[test]
    fn shared_ids_are_rejected() {
        let twin = users().column(Column::new(EntityId::Persisted(2), "nickname", varchar()).length(20));
        let issues = twin.validate();
        assert_eq!(issues.len(), 1, "{issues:?}");
        assert_eq!(issues[0].message, "two columns share the id 2");

        let twin_index = users().index(Index::new(
            EntityId::Persisted(1),
            "idx_email",
            IndexType::normal(),
            ["email"],
        ));
        assert!(twin_index
            .validate()
            .iter()
            .any(|i| i.message.starts_with("two indexes share")));

        // Ids only need to be unique per kind.
        let mixed = users().check(Check::named(EntityId::Persisted(1), "positive", "id > 0"));
        assert!(mixed.is_valid());
    }
}
