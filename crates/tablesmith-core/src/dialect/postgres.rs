//! PostgreSQL dialect.

use tracing::{debug, warn};

use crate::builder::{ColumnSlot, DdlBuilder};
use crate::catalog::{
    BooleanStyle, Catalog, Datatype, DatatypeCategory, IndexType, quote_literal,
    standard_datatypes,
};
use crate::error::{Error, Result};
use crate::schema::{Column, Index, Table};

use super::{
    Capabilities, Dialect, DialectContext, Plan, Strategy, TableChanges, create_table_statement,
};

const COLUMN_SLOTS: &[ColumnSlot] = &[
    ColumnSlot::Name,
    ColumnSlot::Datatype,
    ColumnSlot::AutoIncrement,
    ColumnSlot::Collate,
    ColumnSlot::Generated,
    ColumnSlot::Nullable,
    ColumnSlot::Default,
    ColumnSlot::PrimaryKey,
    ColumnSlot::Unique,
    ColumnSlot::Check,
];

/// PostgreSQL dialect context.
///
/// Auto-increment integers become `SERIAL` types, unique keys become table
/// constraints and every other index is a separate `CREATE INDEX`. DDL is
/// transactional, so a failed alteration leaves nothing behind.
#[derive(Debug, Clone)]
pub struct PostgresContext {
    datatypes: Catalog<Datatype>,
    index_types: Catalog<IndexType>,
}

impl PostgresContext {
    /// Creates the context and its catalogs.
    #[must_use]
    pub fn new() -> Self {
        use DatatypeCategory::{Binary, Integer, Other, Real, Temporal, Text};
        let datatypes = Catalog::<Datatype>::builder()
            .extend([
                Datatype::new("SMALLINT", Integer).aliases(&["INT2"]),
                Datatype::new("INTEGER", Integer).aliases(&["INT", "INT4"]),
                Datatype::new("BIGINT", Integer).aliases(&["INT8"]),
                Datatype::new("REAL", Real).aliases(&["FLOAT4"]),
                Datatype::new("DOUBLE PRECISION", Real).aliases(&["FLOAT8", "DOUBLE"]),
                Datatype::new("NUMERIC", Real).with_precision_scale(),
                Datatype::new("DECIMAL", Real).with_precision_scale(),
                Datatype::new("VARCHAR", Text)
                    .aliases(&["CHARACTER VARYING"])
                    .with_length(),
                Datatype::new("CHAR", Text)
                    .aliases(&["CHARACTER", "BPCHAR"])
                    .with_length(),
                Datatype::new("TEXT", Text),
                Datatype::new("BYTEA", Binary).aliases(&["BLOB"]),
                Datatype::new("DATE", Temporal),
                Datatype::new("TIME", Temporal),
                Datatype::new("TIMESTAMP", Temporal),
                Datatype::new("TIMESTAMPTZ", Temporal)
                    .aliases(&["TIMESTAMP WITH TIME ZONE"]),
                Datatype::new("INTERVAL", Temporal),
                Datatype::new("BOOLEAN", Other)
                    .aliases(&["BOOL"])
                    .boolean(BooleanStyle::Keywords),
                Datatype::new("JSON", Other),
                Datatype::new("JSONB", Other),
                Datatype::new("UUID", Other),
            ])
            .extend(standard_datatypes())
            .build()
            .get_all()
            .iter()
            .copied()
            .map(Datatype::signed_only)
            .collect::<Vec<_>>();
        let datatypes = Catalog::builder().extend(datatypes).build();
        let index_types = Catalog::builder()
            .extend([
                IndexType::primary(),
                IndexType::unique().with_condition(),
                IndexType::normal().with_condition(),
                IndexType::partial(),
                IndexType::expression(),
                IndexType::using("GIN", "gin"),
                IndexType::using("GIST", "gist"),
                IndexType::using("BRIN", "brin"),
                IndexType::using("HASH", "hash"),
            ])
            .build();
        Self {
            datatypes,
            index_types,
        }
    }

    fn constraint_name(index: &Index, table: &str) -> String {
        if index.is_primary() && index.name.eq_ignore_ascii_case("PRIMARY") {
            format!("{table}_pkey")
        } else {
            index.name.clone()
        }
    }

    fn check_name(table: &str, column: &str) -> String {
        format!("{table}_{column}_check")
    }

    fn comment_statement(&self, table: &Table) -> String {
        let comment = table
            .comment
            .as_deref()
            .map_or_else(|| "NULL".to_string(), quote_literal);
        format!(
            "COMMENT ON TABLE {} IS {comment}",
            self.quote_identifier(&table.name)
        )
    }

    /// `ALTER COLUMN` sub-statements turning `original` into `column`.
    fn alter_column(
        &self,
        changes: &TableChanges<'_>,
        original: &Column,
        column: &Column,
        plan: &mut Plan,
    ) -> Result<()> {
        let current = changes.current;
        let table = self.quote_identifier(&current.name);
        let name = self.quote_identifier(&column.name);

        if original.name != column.name {
            plan.push(format!(
                "ALTER TABLE {table} RENAME COLUMN {} TO {name}",
                self.quote_identifier(&original.name)
            ));
        }
        if original.virtuality != column.virtuality || original.expression != column.expression {
            // A generation expression cannot be altered in place.
            plan.push(format!("ALTER TABLE {table} DROP COLUMN {name}"));
            plan.push(format!(
                "ALTER TABLE {table} ADD COLUMN {}",
                self.build_column(current, column, &[ColumnSlot::PrimaryKey, ColumnSlot::Unique])
            ));
            return Ok(());
        }
        if original.is_auto_increment != column.is_auto_increment {
            return Err(Error::Unsupported(format!(
                "cannot switch auto-increment on {}.{}",
                current.name, column.name
            )));
        }

        let alter = |clause: String| format!("ALTER TABLE {table} ALTER COLUMN {name} {clause}");
        if column.type_differs(original) {
            let ty = column.type_sql();
            let collate = self.collate(current, column);
            let collate = if collate.is_empty() {
                collate
            } else {
                format!(" {collate}")
            };
            plan.push(alter(format!("TYPE {ty}{collate} USING {name}::{ty}")));
        }
        if original.is_nullable != column.is_nullable {
            plan.push(alter(if column.is_nullable {
                "DROP NOT NULL".to_string()
            } else {
                "SET NOT NULL".to_string()
            }));
        }
        if original.server_default != column.server_default {
            plan.push(alter(match &column.server_default {
                Some(default) => format!("SET DEFAULT {default}"),
                None => "DROP DEFAULT".to_string(),
            }));
        }
        if original.check != column.check {
            if original.check.is_some() {
                plan.push(format!(
                    "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS {}",
                    self.quote_identifier(&Self::check_name(&changes.original.name, &original.name))
                ));
            }
            if let Some(check) = &column.check {
                plan.push(format!(
                    "ALTER TABLE {table} ADD CONSTRAINT {} CHECK ({check})",
                    self.quote_identifier(&Self::check_name(&current.name, &column.name))
                ));
            }
        }
        Ok(())
    }
}

impl Default for PostgresContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DdlBuilder for PostgresContext {
    fn column_slots(&self) -> &'static [ColumnSlot] {
        COLUMN_SLOTS
    }

    /// Left to the `SERIAL` substitution for auto-increment columns.
    fn datatype(&self, _table: &Table, column: &Column) -> String {
        if column.is_auto_increment {
            String::new()
        } else {
            column.type_sql()
        }
    }

    fn auto_increment(&self, _table: &Table, column: &Column) -> String {
        if !column.is_auto_increment {
            return String::new();
        }
        match column.datatype.name {
            "SMALLINT" => "SMALLSERIAL",
            "BIGINT" => "BIGSERIAL",
            _ => "SERIAL",
        }
        .to_string()
    }

    fn collate(&self, _table: &Table, column: &Column) -> String {
        match &column.collation {
            Some(c) if column.datatype.flags.has_collation => {
                format!("COLLATE \"{}\"", c.replace('"', "\"\""))
            }
            _ => String::new(),
        }
    }

    fn generated(&self, _table: &Table, column: &Column) -> String {
        match (&column.virtuality, &column.expression) {
            (Some(_), Some(expr)) => format!("GENERATED ALWAYS AS ({expr}) STORED"),
            _ => String::new(),
        }
    }

    fn check(&self, table: &Table, column: &Column) -> String {
        column
            .check
            .as_ref()
            .map(|expr| {
                format!(
                    "CONSTRAINT {} CHECK ({expr})",
                    self.quote_identifier(&Self::check_name(&table.name, &column.name))
                )
            })
            .unwrap_or_default()
    }

    fn index_name(&self, index: &Index) -> String {
        if index.is_primary() && index.name.eq_ignore_ascii_case("PRIMARY") {
            String::new()
        } else {
            format!("CONSTRAINT {}", self.quote_identifier(&index.name))
        }
    }
}

impl DialectContext for PostgresContext {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSql
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            rename_column: true,
            drop_column: true,
            alter_column: true,
            add_constraint: true,
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
        let composite = table.primary_key_columns().len() > 1;
        let exclude: &[ColumnSlot] = if composite {
            &[ColumnSlot::PrimaryKey, ColumnSlot::Unique]
        } else {
            &[ColumnSlot::Unique]
        };
        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.build_column(table, c, exclude))
            .collect();
        definitions.extend(
            table
                .indexes
                .iter()
                .filter(|i| i.is_constraint() && (!i.is_primary() || composite))
                .map(|i| self.build_index(i, &[])),
        );
        definitions.extend(
            table
                .foreign_keys
                .iter()
                .map(|fk| self.foreign_key_definition(fk)),
        );
        definitions.extend(table.checks.iter().map(|c| self.check_definition(c)));

        if table.engine.is_some() || table.collation.is_some() {
            debug!(table = %table.name, "Ignoring engine and collation");
        }
        let mut plan = Plan::new(Strategy::Create);
        plan.push(create_table_statement(self, table, &definitions, ""));
        for index in table.indexes.iter().filter(|i| !i.is_constraint()) {
            plan.push(self.create_index(&table.name, index));
        }
        if table.comment.is_some() {
            plan.push(self.comment_statement(table));
        }
        Ok(plan)
    }

    fn emit_alter(&self, changes: &TableChanges<'_>, _taken: &[String]) -> Result<Plan> {
        let mut plan = Plan::new(Strategy::Incremental);
        let (original, current) = (changes.original, changes.current);
        let table = self.quote_identifier(&current.name);

        if changes.is_renamed() {
            plan.push(format!(
                "ALTER TABLE {} RENAME TO {table}",
                self.quote_identifier(&original.name)
            ));
        }
        if original.comment != current.comment {
            plan.push(self.comment_statement(current));
        }
        if original.engine != current.engine
            || original.collation != current.collation
            || original.auto_increment != current.auto_increment
        {
            warn!(table = %current.name, "Engine, collation and auto-increment cannot be altered; ignored");
        }

        for fk in changes.dropped_foreign_keys() {
            plan.push(format!(
                "ALTER TABLE {table} DROP CONSTRAINT {}",
                self.quote_identifier(&fk.name)
            ));
        }
        for index in changes.dropped_indexes() {
            if index.is_constraint() {
                plan.push(format!(
                    "ALTER TABLE {table} DROP CONSTRAINT {}",
                    self.quote_identifier(&Self::constraint_name(index, &original.name))
                ));
            } else {
                plan.push(format!("DROP INDEX {}", self.quote_identifier(&index.name)));
            }
        }
        for check in changes.dropped_checks() {
            let name = check.name.as_deref().ok_or_else(|| {
                Error::Unsupported(format!(
                    "cannot drop anonymous check ({}) on {}",
                    check.expression, current.name
                ))
            })?;
            plan.push(format!(
                "ALTER TABLE {table} DROP CONSTRAINT {}",
                self.quote_identifier(name)
            ));
        }

        for column in changes.added_columns() {
            plan.push(format!(
                "ALTER TABLE {table} ADD COLUMN {}",
                self.build_column(current, column, &[ColumnSlot::PrimaryKey, ColumnSlot::Unique])
            ));
        }
        for (before, after) in changes.modified_columns() {
            self.alter_column(changes, before, after, &mut plan)?;
        }
        if changes.has_moves() {
            warn!(table = %current.name, "Column order cannot be changed; ignored");
        }
        for column in changes.removed_columns() {
            plan.push(format!(
                "ALTER TABLE {table} DROP COLUMN {}",
                self.quote_identifier(&column.name)
            ));
        }

        for index in changes.created_indexes() {
            if index.is_constraint() {
                plan.push(format!(
                    "ALTER TABLE {table} ADD {}",
                    self.build_index(index, &[])
                ));
            } else {
                plan.push(self.create_index(&current.name, index));
            }
        }
        for fk in changes.created_foreign_keys() {
            plan.push(format!(
                "ALTER TABLE {table} ADD {}",
                self.foreign_key_definition(fk)
            ));
        }
        for check in changes.created_checks() {
            plan.push(format!(
                "ALTER TABLE {table} ADD {}",
                self.check_definition(check)
            ));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;
    use crate::schema::{Check, Virtuality};

    fn ctx() -> PostgresContext {
        PostgresContext::new()
    }

    fn dt(name: &str) -> Datatype {
        ctx().datatypes().get_by_name(name).unwrap()
    }

    fn users() -> Table {
        Table::new(EntityId::Persisted(1), "users")
            .column(
                Column::new(EntityId::Persisted(1), "id", dt("INT4"))
                    .not_null()
                    .auto_increment(),
            )
            .column(Column::new(EntityId::Persisted(2), "name", dt("VARCHAR")).length(50))
            .index(Index::new(
                EntityId::Persisted(1),
                "PRIMARY",
                IndexType::primary(),
                ["id"],
            ))
    }

    #[test]
    fn nothing_is_unsigned() {
        assert!(ctx().datatypes().get_all().iter().all(|d| !d.flags.has_unsigned));
        assert_eq!(dt("float8").name, "DOUBLE PRECISION");
        assert_eq!(dt("blob").name, "BYTEA");
        assert!(ctx().index_types().contains("GIN"));
    }

    #[test]
    fn serial_columns_and_comment() {
        let table = users()
            .column(
                Column::new(EntityId::Persisted(3), "created_at", dt("TIMESTAMPTZ"))
                    .default_expr("CURRENT_TIMESTAMP"),
            )
            .comment("People");
        let plan = ctx().plan_create(&table).unwrap();
        assert_eq!(
            plan.statements,
            vec![
                "CREATE TABLE users (\n  \
                 id SERIAL NOT NULL PRIMARY KEY,\n  \
                 name VARCHAR(50),\n  \
                 created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP\n)",
                "COMMENT ON TABLE users IS 'People'",
            ]
        );

        let big = Table::pending("events").column(
            Column::new(EntityId::Pending(-1), "id", dt("BIGINT"))
                .not_null()
                .auto_increment(),
        );
        let plan = ctx().plan_create(&big).unwrap();
        assert_eq!(plan.statements[0], "CREATE TABLE events (\n  id BIGSERIAL NOT NULL\n)");
    }

    #[test]
    fn constraints_inline_and_indexes_separate() {
        let table = Table::pending("memberships")
            .column(Column::new(EntityId::Pending(-1), "team_id", dt("INTEGER")).not_null())
            .column(Column::new(EntityId::Pending(-2), "user_id", dt("INTEGER")).not_null())
            .column(Column::new(EntityId::Pending(-3), "handle", dt("TEXT")).collate("C"))
            .column(Column::new(EntityId::Pending(-4), "tags", dt("JSONB")))
            .column(Column::new(EntityId::Pending(-5), "left_at", dt("TIMESTAMP")))
            .index(Index::new(
                EntityId::Pending(-1),
                "PRIMARY",
                IndexType::primary(),
                ["team_id", "user_id"],
            ))
            .index(
                Index::new(
                    EntityId::Pending(-2),
                    "memberships_handle_key",
                    IndexType::unique(),
                    ["handle"],
                )
                .constraint(),
            )
            .index(
                Index::new(
                    EntityId::Pending(-3),
                    "idx_active",
                    IndexType::partial(),
                    ["team_id"],
                )
                .condition("left_at IS NULL"),
            )
            .index(Index::new(
                EntityId::Pending(-4),
                "idx_tags",
                IndexType::using("GIN", "gin"),
                ["tags"],
            ))
            .check(Check::anonymous(EntityId::Pending(-1), "team_id > 0"));
        let plan = ctx().plan_create(&table).unwrap();
        assert_eq!(
            plan.statements,
            vec![
                "CREATE TABLE memberships (\n  \
                 team_id INTEGER NOT NULL,\n  \
                 user_id INTEGER NOT NULL,\n  \
                 handle TEXT COLLATE \"C\",\n  \
                 tags JSONB,\n  \
                 left_at TIMESTAMP,\n  \
                 PRIMARY KEY (team_id, user_id),\n  \
                 CONSTRAINT memberships_handle_key UNIQUE (handle),\n  \
                 CHECK (team_id > 0)\n)",
                "CREATE INDEX idx_active ON memberships (team_id) WHERE left_at IS NULL",
                "CREATE INDEX idx_tags ON memberships USING gin (tags)",
            ]
        );
    }

    #[test]
    fn add_and_rename_column() {
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
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE users ADD COLUMN email VARCHAR(255) NOT NULL DEFAULT ''",
                "ALTER TABLE users RENAME COLUMN name TO full_name",
            ]
        );
    }

    #[test]
    fn type_nullability_and_default_change() {
        let original = users().column(Column::new(EntityId::Persisted(3), "score", dt("INTEGER")));
        let mut current = original.clone();
        let score = current.column_by_id(EntityId::Persisted(3)).unwrap().clone();
        current.replace_column(
            score
                .retyped(dt("BIGINT"))
                .not_null()
                .default_expr("0")
                .check("score >= 0"),
        );
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE users ALTER COLUMN score TYPE BIGINT USING score::BIGINT",
                "ALTER TABLE users ALTER COLUMN score SET NOT NULL",
                "ALTER TABLE users ALTER COLUMN score SET DEFAULT 0",
                "ALTER TABLE users ADD CONSTRAINT users_score_check CHECK (score >= 0)",
            ]
        );
    }

    #[test]
    fn changed_check_is_replaced() {
        let original = users().column(
            Column::new(EntityId::Persisted(3), "age", dt("INTEGER")).check("age >= 0"),
        );
        let mut current = original.clone();
        let age = current.column_by_id(EntityId::Persisted(3)).unwrap().clone();
        current.replace_column(age.check("age >= 18"));
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE users DROP CONSTRAINT IF EXISTS users_age_check",
                "ALTER TABLE users ADD CONSTRAINT users_age_check CHECK (age >= 18)",
            ]
        );
    }

    #[test]
    fn generated_column_is_recreated() {
        let original = users().column(
            Column::new(EntityId::Persisted(3), "slug", dt("TEXT"))
                .generated(Virtuality::Stored, "lower(name)"),
        );
        let mut current = original.clone();
        let slug = current.column_by_id(EntityId::Persisted(3)).unwrap().clone();
        current.replace_column(slug.generated(Virtuality::Stored, "upper(name)"));
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE users DROP COLUMN slug",
                "ALTER TABLE users ADD COLUMN slug TEXT GENERATED ALWAYS AS (upper(name)) STORED",
            ]
        );
    }

    #[test]
    fn auto_increment_switch_is_unsupported() {
        let original = users();
        let mut current = original.clone();
        let mut id = current.column_by_id(EntityId::Persisted(1)).unwrap().clone();
        id.is_auto_increment = false;
        current.replace_column(id);
        let err = ctx().plan_alter(&original, &current, &[]).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn primary_key_is_dropped_by_constraint_name() {
        let original = users().comment("People");
        let mut current = original.clone().renamed("accounts");
        current.comment = None;
        current.append_to_index(EntityId::Persisted(1), "name").unwrap();
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert_eq!(
            plan.statements,
            vec![
                "ALTER TABLE users RENAME TO accounts",
                "COMMENT ON TABLE accounts IS NULL",
                "ALTER TABLE accounts DROP CONSTRAINT users_pkey",
                "ALTER TABLE accounts ADD PRIMARY KEY (id, name)",
            ]
        );
    }

    #[test]
    fn column_order_is_ignored() {
        let original = users();
        let mut current = original.clone();
        let mut columns = current.columns.clone();
        columns.reverse();
        current.set_columns(columns);
        let plan = ctx().plan_alter(&original, &current, &[]).unwrap();
        assert!(plan.is_empty());
    }
}
