//! SQLite dialect.
//!
//! SQLite can rename tables and columns, add a column at the end and drop
//! a column, but it cannot change a column or add a constraint in place.
//! Everything beyond that goes through the rebuild strategy: rename the
//! live table away, create the new definition under the final name, copy
//! the rows over, drop the old table and recreate the indexes.

use tracing::{debug, info};

use crate::builder::{ColumnSlot, DdlBuilder, IndexSlot};
use crate::catalog::{
    BooleanStyle, Catalog, Datatype, DatatypeCategory, IndexType, standard_datatypes,
};
use crate::error::Result;
use crate::schema::{Column, Table, Virtuality};

use super::{
    Capabilities, Dialect, DialectContext, Plan, Strategy, TableChanges, create_table_statement,
    fill_value, temporary_name,
};

const COLUMN_SLOTS: &[ColumnSlot] = &[
    ColumnSlot::Name,
    ColumnSlot::Datatype,
    ColumnSlot::PrimaryKey,
    ColumnSlot::AutoIncrement,
    ColumnSlot::Nullable,
    ColumnSlot::Unique,
    ColumnSlot::Check,
    ColumnSlot::Default,
    ColumnSlot::Collate,
    ColumnSlot::Generated,
];

/// SQLite dialect context.
#[derive(Debug, Clone)]
pub struct SqliteContext {
    datatypes: Catalog<Datatype>,
    index_types: Catalog<IndexType>,
}

impl SqliteContext {
    /// Creates the context and its catalogs.
    #[must_use]
    pub fn new() -> Self {
        use DatatypeCategory::{Binary, Integer, Other, Real, Temporal, Text};
        let datatypes = Catalog::builder()
            .entry(Datatype::new("INTEGER", Integer).aliases(&["INT"]).signed_only())
            .entry(Datatype::new("TEXT", Text).aliases(&["CLOB"]))
            .entry(Datatype::new("BLOB", Binary))
            .entry(
                Datatype::new("REAL", Real)
                    .aliases(&["DOUBLE", "FLOAT"])
                    .signed_only(),
            )
            .entry(Datatype::new("NUMERIC", Real).signed_only())
            .entry(Datatype::new("DATETIME", Temporal))
            .entry(
                Datatype::new("BOOLEAN", Other)
                    .aliases(&["BOOL"])
                    .boolean(BooleanStyle::Digits),
            )
            .extend(
                standard_datatypes()
                    .into_iter()
                    .map(|d| d.signed_only().optional_params()),
            )
            .build();
        let index_types = Catalog::builder()
            .entry(IndexType::primary())
            .entry(IndexType::unique().with_condition().with_expression())
            .entry(IndexType::normal())
            .entry(IndexType::partial())
            .entry(IndexType::expression())
            .build();
        Self {
            datatypes,
            index_types,
        }
    }

    /// Renders `CREATE TABLE` with keys, foreign keys and checks inline.
    fn create_table(&self, table: &Table) -> String {
        let composite = table.primary_key_columns().len() > 1;
        let exclude: &[ColumnSlot] = if composite {
            &[ColumnSlot::PrimaryKey]
        } else {
            &[]
        };
        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.build_column(table, c, exclude))
            .collect();
        if let Some(pk) = table.primary_key().filter(|_| composite) {
            definitions.push(self.build_index(pk, &[IndexSlot::Name]));
        }
        definitions.extend(
            table
                .indexes
                .iter()
                .filter(|i| i.is_constraint() && !i.is_primary() && i.columns.len() > 1)
                .map(|i| self.build_index(i, &[IndexSlot::Name])),
        );
        definitions.extend(
            table
                .foreign_keys
                .iter()
                .map(|fk| self.foreign_key_definition(fk)),
        );
        definitions.extend(table.checks.iter().map(|c| self.check_definition(c)));
        create_table_statement(self, table, &definitions, "")
    }

    /// Why the change cannot be done with `ALTER TABLE`, if it cannot.
    fn rebuild_reason(changes: &TableChanges<'_>) -> Option<String> {
        if let Some((original, _)) = changes.modified_columns().next() {
            return Some(format!("column \"{}\" changed", original.name));
        }
        if changes.has_moves() {
            return Some("column order changed".into());
        }
        if changes.primary_key_changed() {
            return Some("primary key changed".into());
        }
        if !changes.dropped_foreign_keys().is_empty() || !changes.created_foreign_keys().is_empty()
        {
            return Some("foreign keys changed".into());
        }
        if !changes.dropped_checks().is_empty() || !changes.created_checks().is_empty() {
            return Some("check constraints changed".into());
        }
        let constraint_changed = changes
            .dropped_indexes()
            .iter()
            .chain(&changes.created_indexes())
            .any(|i| i.is_constraint());
        if constraint_changed {
            return Some("table constraint changed".into());
        }
        for column in changes.added_columns() {
            if changes.needs_position(column) {
                return Some(format!("column \"{}\" is not appended", column.name));
            }
            if let Some(why) = add_column_blocker(changes.current, column) {
                return Some(format!("column \"{}\" {why}", column.name));
            }
        }
        changes
            .removed_columns()
            .find(|c| c.check.is_some() || changes.original.is_primary_key(c))
            .map(|c| format!("column \"{}\" is constrained", c.name))
    }

    fn incremental(&self, changes: &TableChanges<'_>) -> Plan {
        let mut plan = Plan::new(Strategy::Incremental);
        let current = changes.current;
        let table = self.quote_identifier(&current.name);

        if changes.is_renamed() {
            plan.push(format!(
                "ALTER TABLE {} RENAME TO {table}",
                self.quote_identifier(&changes.original.name)
            ));
        }
        if changes.properties_changed() {
            debug!(table = %current.name, "SQLite stores no table options; ignoring");
        }
        for index in changes.dropped_indexes() {
            plan.push(format!("DROP INDEX {}", self.quote_identifier(&index.name)));
        }
        for column in changes.added_columns() {
            plan.push(format!(
                "ALTER TABLE {table} ADD COLUMN {}",
                self.build_column(current, column, &[])
            ));
        }
        for column in changes.removed_columns() {
            plan.push(format!(
                "ALTER TABLE {table} DROP COLUMN {}",
                self.quote_identifier(&column.name)
            ));
        }
        for index in changes.created_indexes() {
            plan.push(self.create_index(&current.name, index));
        }
        plan
    }

    fn rebuild(&self, changes: &TableChanges<'_>, taken: &[String]) -> Plan {
        let mut plan = Plan::new(Strategy::Rebuild);
        let current = changes.current;
        let mut names = taken.to_vec();
        names.push(current.name.clone());
        let temp = temporary_name(&changes.original.name, &names);

        plan.before = vec![
            "PRAGMA foreign_keys = OFF".into(),
            "PRAGMA legacy_alter_table = ON".into(),
        ];
        plan.push(format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(&changes.original.name),
            self.quote_identifier(&temp)
        ));
        plan.push(self.create_table(current));
        plan.push(self.copy_rows(changes, &temp));
        plan.push(format!("DROP TABLE {}", self.quote_identifier(&temp)));
        for index in current.indexes.iter().filter(|i| !i.is_constraint()) {
            plan.push(self.create_index(&current.name, index));
        }
        plan.after = vec![
            "PRAGMA foreign_keys = ON".into(),
            "PRAGMA legacy_alter_table = OFF".into(),
        ];
        plan
    }

    /// `INSERT INTO new SELECT ... FROM temp`, skipping generated columns.
    fn copy_rows(&self, changes: &TableChanges<'_>, temp: &str) -> String {
        let mut targets = Vec::new();
        let mut sources = Vec::new();
        let mut skipped = false;
        for column in &changes.current.columns {
            if column.is_generated() {
                skipped = true;
                continue;
            }
            targets.push(self.quote_identifier(&column.name));
            sources.push(match changes.original_name(column) {
                Some(name) => self.quote_identifier(name),
                None => fill_value(column),
            });
        }
        let table = self.quote_identifier(&changes.current.name);
        let target = if skipped {
            format!("{table} ({})", targets.join(", "))
        } else {
            table
        };
        format!(
            "INSERT INTO {target} SELECT {} FROM {}",
            sources.join(", "),
            self.quote_identifier(temp)
        )
    }
}

impl Default for SqliteContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Why `ALTER TABLE ADD COLUMN` refuses `column`, if it does.
fn add_column_blocker(table: &Table, column: &Column) -> Option<&'static str> {
    if table.is_primary_key(column) {
        return Some("is part of the primary key");
    }
    if table
        .indexes
        .iter()
        .any(|i| i.is_constraint() && i.contains(&column.name))
    {
        return Some("is part of a unique constraint");
    }
    if column.virtuality == Some(Virtuality::Stored) {
        return Some("is a stored generated column");
    }
    if !column.is_nullable && !column.is_generated() && column.server_default.is_none() {
        return Some("is NOT NULL without a default");
    }
    let non_constant = column.server_default.as_deref().is_some_and(|d| {
        let d = d.trim();
        d.starts_with('(') || d.to_ascii_uppercase().starts_with("CURRENT_")
    });
    if non_constant {
        return Some("has a non-constant default");
    }
    None
}

impl DdlBuilder for SqliteContext {
    fn column_slots(&self) -> &'static [ColumnSlot] {
        COLUMN_SLOTS
    }

    /// `AUTOINCREMENT` is only valid on a lone `INTEGER PRIMARY KEY`.
    fn auto_increment(&self, table: &Table, column: &Column) -> String {
        let lone_key = table.primary_key_columns() == [column.name.as_str()];
        if column.is_auto_increment && lone_key {
            "AUTOINCREMENT".to_string()
        } else {
            String::new()
        }
    }

    /// Only single-column unique constraints are written inline; explicit
    /// unique indexes are created separately.
    fn unique(&self, table: &Table, column: &Column) -> String {
        let inline = table.indexes.iter().any(|i| {
            i.is_constraint()
                && !i.is_primary()
                && i.index_type.is_unique
                && i.columns.len() == 1
                && i.contains(&column.name)
        });
        if inline {
            "UNIQUE".to_string()
        } else {
            String::new()
        }
    }
}

impl DialectContext for SqliteContext {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            rename_column: true,
            drop_column: true,
            alter_column: false,
            add_constraint: false,
            column_position: false,
            inline_indexes: false,
            transactional_ddl: true,
        }
    }

    fn datatypes(&self) -> &Catalog<Datatype> {
        &self.datatypes
    }

    fn index_types(&self) -> &Catalog<IndexType> {
        &self.index_types
    }

    fn emit_create(&self, table: &Table) -> Result<Plan> {
        let mut plan = Plan::new(Strategy::Create);
        plan.push(self.create_table(table));
        for index in table.indexes.iter().filter(|i| !i.is_constraint()) {
            plan.push(self.create_index(&table.name, index));
        }
        if table.comment.is_some() {
            debug!(table = %table.name, "SQLite has no table comments; ignoring");
        }
        Ok(plan)
    }

    fn emit_alter(&self, changes: &TableChanges<'_>, taken: &[String]) -> Result<Plan> {
        match Self::rebuild_reason(changes) {
            Some(reason) => {
                info!(table = %changes.current.name, reason = %reason, "Rebuilding table");
                Ok(self.rebuild(changes, taken))
            }
            None => Ok(self.incremental(changes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;
    use crate::schema::{Check, ForeignKey, Index, ReferentialAction};

    fn ctx() -> SqliteContext {
        SqliteContext::new()
    }

    fn dt(name: &str) -> Datatype {
        ctx().datatypes().get_by_name(name).unwrap()
    }

    fn users() -> Table {
        Table::new(EntityId::Persisted(1), "users")
            .column(Column::new(EntityId::Persisted(1), "id", dt("INTEGER")).not_null())
            .column(Column::new(EntityId::Persisted(2), "name", dt("VARCHAR")).length(50))
            .index(Index::new(
                EntityId::Persisted(1),
                "PRIMARY",
                IndexType::primary(),
                ["id"],
            ))
    }

    #[test]
    fn catalog_has_no_unsigned_types() {
        let ctx = ctx();
        assert!(ctx.datatypes().get_all().iter().all(|d| !d.flags.has_unsigned));
        assert_eq!(ctx.datatypes().get_by_name("int").unwrap().name, "INTEGER");
        let decimal = ctx.datatypes().get_by_name("DECIMAL").unwrap();
        assert!(decimal.flags.has_precision && decimal.flags.params_optional);
        assert!(!ctx.index_types().contains("FULLTEXT"));
    }

    #[test]
    fn create_inlines_constraints() {
        let int = dt("INTEGER");
        let table = Table::pending("posts")
            .column(Column::new(EntityId::Pending(-1), "id", int).auto_increment())
            .column(Column::new(EntityId::Pending(-2), "author_id", int).not_null())
            .column(Column::new(EntityId::Pending(-3), "slug", dt("TEXT")).collate("NOCASE"))
            .index(Index::new(
                EntityId::Pending(-1),
                "PRIMARY",
                IndexType::primary(),
                ["id"],
            ))
            .index(
                Index::new(EntityId::Pending(-2), "uq_slug", IndexType::unique(), ["slug"])
                    .constraint(),
            )
            .index(Index::new(
                EntityId::Pending(-3),
                "idx_author",
                IndexType::normal(),
                ["author_id"],
            ))
            .foreign_key(
                ForeignKey::new(EntityId::Pending(-1), "fk_author", "author_id", "users", "id")
                    .on_delete(ReferentialAction::Cascade),
            )
            .check(Check::named(EntityId::Pending(-1), "slug_length", "length(slug) > 2"));
        let plan = ctx().plan_create(&table).unwrap();
        assert_eq!(plan.strategy, Strategy::Create);
        assert_eq!(
            plan.statements,
            vec![
                "CREATE TABLE posts (\n  \
                 id INTEGER PRIMARY KEY AUTOINCREMENT,\n  \
                 author_id INTEGER NOT NULL,\n  \
                 slug TEXT UNIQUE COLLATE NOCASE,\n  \
                 CONSTRAINT fk_author FOREIGN KEY (author_id) REFERENCES users (id) ON DELETE CASCADE,\n  \
                 CONSTRAINT slug_length CHECK (length(slug) > 2)\n)"
                    .to_string(),
                "CREATE INDEX idx_author ON posts (author_id)".to_string(),
            ]
        );
    }

    #[test]
    fn composite_keys_become_table_constraints() {
        let int = dt("INTEGER");
        let table = Table::pending("memberships")
            .column(Column::new(EntityId::Pending(-1), "user_id", int).not_null())
            .column(Column::new(EntityId::Pending(-2), "group_id", int).not_null())
            .index(Index::new(
                EntityId::Pending(-1),
                "PRIMARY",
                IndexType::primary(),
                ["user_id", "group_id"],
            ));
        let plan = ctx().plan_create(&table).unwrap();
        assert_eq!(
            plan.statements[0],
            "CREATE TABLE memberships (\n  \
             user_id INTEGER NOT NULL,\n  \
             group_id INTEGER NOT NULL,\n  \
             PRIMARY KEY (user_id, group_id)\n)"
        );
    }

    #[test]
    fn rename_and_add_rebuilds() {
        let original = users();
        let mut current = original.clone();
        current.rename_column(EntityId::Persisted(2), "full_name").unwrap();
        current = current.column(
            Column::new(EntityId::Pending(-1), "email", dt("VARCHAR"))
                .length(255)
                .not_null()
                .default_text(""),
        );

        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(plan.strategy, Strategy::Rebuild);
        assert_eq!(
            plan.before,
            vec!["PRAGMA foreign_keys = OFF", "PRAGMA legacy_alter_table = ON"]
        );
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE users RENAME TO _old_users".to_string(),
                "CREATE TABLE users (\n  \
                 id INTEGER PRIMARY KEY NOT NULL,\n  \
                 full_name VARCHAR(50),\n  \
                 email VARCHAR(255) NOT NULL DEFAULT ''\n)"
                    .to_string(),
                "INSERT INTO users SELECT id, name, '' FROM _old_users".to_string(),
                "DROP TABLE _old_users".to_string(),
            ]
        );
        assert_eq!(
            plan.after,
            vec!["PRAGMA foreign_keys = ON", "PRAGMA legacy_alter_table = OFF"]
        );
    }

    #[test]
    fn appended_nullable_column_is_added_in_place() {
        let original = users();
        let current = original
            .clone()
            .column(Column::new(EntityId::Pending(-1), "bio", dt("TEXT")));
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(plan.strategy, Strategy::Incremental);
        assert_eq!(plan.statements, vec!["ALTER TABLE users ADD COLUMN bio TEXT"]);
        assert!(plan.before.is_empty());
    }

    #[test]
    fn not_null_without_default_rebuilds() {
        let original = users();
        let current = original
            .clone()
            .column(Column::new(EntityId::Pending(-1), "age", dt("INTEGER")).not_null());
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(plan.strategy, Strategy::Rebuild);
        assert!(plan.statements[2].ends_with("SELECT id, name, 0 FROM _old_users"));
    }

    #[test]
    fn index_change_drops_then_creates() {
        let original = users()
            .column(Column::new(EntityId::Persisted(3), "email", dt("TEXT")))
            .column(Column::new(EntityId::Persisted(4), "tenant_id", dt("INTEGER")))
            .index(Index::new(
                EntityId::Persisted(2),
                "idx_email",
                IndexType::normal(),
                ["email"],
            ));
        let mut current = original.clone();
        current
            .append_to_index(EntityId::Persisted(2), "tenant_id")
            .unwrap();
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(plan.strategy, Strategy::Incremental);
        assert_eq!(
            plan.statements,
            vec![
                "DROP INDEX idx_email",
                "CREATE INDEX idx_email ON users (email, tenant_id)",
            ]
        );
    }

    #[test]
    fn dropped_column_with_index_drops_index_first() {
        let original = users()
            .column(Column::new(EntityId::Persisted(3), "email", dt("TEXT")))
            .index(Index::new(
                EntityId::Persisted(2),
                "idx_email",
                IndexType::normal(),
                ["email"],
            ));
        let mut current = original.clone();
        current.remove_index(EntityId::Persisted(2));
        current.remove_column(EntityId::Persisted(3));
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(
            plan.statements,
            vec!["DROP INDEX idx_email", "ALTER TABLE users DROP COLUMN email"]
        );
    }

    #[test]
    fn rebuild_recreates_indexes_and_skips_generated_columns() {
        let original = users().index(Index::new(
            EntityId::Persisted(2),
            "idx_name",
            IndexType::normal(),
            ["name"],
        ));
        let mut current = original.clone().renamed("people");
        let name = current.columns[1].clone().not_null().default_text("anon");
        current.replace_column(name);
        current = current.column(
            Column::new(EntityId::Pending(-1), "initial", dt("TEXT"))
                .generated(Virtuality::Virtual, "substr(name, 1, 1)"),
        );
        let taken = vec!["users".to_string(), "_old_users".to_string()];
        let plan = ctx().plan_alter(&original, &current, &taken).unwrap();
        assert_eq!(plan.strategy, Strategy::Rebuild);
        assert_eq!(plan.statements[0], "ALTER TABLE users RENAME TO _old_users_1");
        assert!(plan.statements[1].starts_with("CREATE TABLE people ("));
        assert_eq!(
            plan.statements[2],
            "INSERT INTO people (id, name) SELECT id, name FROM _old_users_1"
        );
        assert_eq!(plan.statements[3], "DROP TABLE _old_users_1");
        assert_eq!(plan.statements[4], "CREATE INDEX idx_name ON people (name)");
    }

    #[test]
    fn identical_tables_plan_nothing() {
        let table = users();
        let plan = ctx().plan_alter(&table, &table, &[]).unwrap();
        assert!(plan.is_empty());
        let commented = table.clone().comment("people");
        assert!(ctx().plan_alter(&table, &commented, &[]).unwrap().is_empty());
    }
}
