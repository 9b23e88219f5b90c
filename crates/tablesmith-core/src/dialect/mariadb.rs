//! MariaDB / MySQL dialect.
//!
//! Every change is a direct `ALTER TABLE`. Indexes live inside
//! `CREATE TABLE`, columns can be placed with `FIRST` / `AFTER` and renamed
//! together with a type change through `CHANGE`. DDL is not transactional:
//! each statement commits on its own.

use crate::builder::{ColumnSlot, DdlBuilder, IndexSlot};
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
    ColumnSlot::Unsigned,
    ColumnSlot::Zerofill,
    ColumnSlot::Collate,
    ColumnSlot::Generated,
    ColumnSlot::Nullable,
    ColumnSlot::Default,
    ColumnSlot::AutoIncrement,
    ColumnSlot::Unique,
    ColumnSlot::PrimaryKey,
    ColumnSlot::Check,
];

/// Keys are always written as index definitions, never on the column.
const INLINE_KEYS: &[ColumnSlot] = &[ColumnSlot::PrimaryKey, ColumnSlot::Unique];

const INDEX_SLOTS: &[IndexSlot] = &[IndexSlot::Type, IndexSlot::Name, IndexSlot::Columns];

/// MariaDB / MySQL dialect context.
#[derive(Debug, Clone)]
pub struct MariaDbContext {
    datatypes: Catalog<Datatype>,
    index_types: Catalog<IndexType>,
}

impl MariaDbContext {
    /// Creates the context and its catalogs.
    #[must_use]
    pub fn new() -> Self {
        use DatatypeCategory::{Binary, Integer, Other, Real, Spatial, Temporal, Text};
        let datatypes = Catalog::builder()
            .extend([
                Datatype::new("TINYINT", Integer),
                Datatype::new("SMALLINT", Integer),
                Datatype::new("MEDIUMINT", Integer),
                Datatype::new("INT", Integer).aliases(&["INTEGER"]),
                Datatype::new("BIGINT", Integer),
                Datatype::new("FLOAT", Real),
                Datatype::new("DOUBLE", Real).aliases(&["DOUBLE PRECISION", "REAL"]),
                Datatype::new("DECIMAL", Real)
                    .aliases(&["DEC", "NUMERIC", "FIXED"])
                    .with_precision_scale(),
                Datatype::new("VARCHAR", Text).with_length(),
                Datatype::new("CHAR", Text).with_length(),
                Datatype::new("TINYTEXT", Text),
                Datatype::new("TEXT", Text),
                Datatype::new("MEDIUMTEXT", Text),
                Datatype::new("LONGTEXT", Text),
                Datatype::new("BINARY", Binary).with_length(),
                Datatype::new("VARBINARY", Binary).with_length(),
                Datatype::new("TINYBLOB", Binary),
                Datatype::new("BLOB", Binary),
                Datatype::new("MEDIUMBLOB", Binary),
                Datatype::new("LONGBLOB", Binary),
                Datatype::new("GEOMETRY", Spatial),
                Datatype::new("POINT", Spatial),
                Datatype::new("LINESTRING", Spatial),
                Datatype::new("POLYGON", Spatial),
                Datatype::new("DATE", Temporal),
                Datatype::new("TIME", Temporal),
                Datatype::new("DATETIME", Temporal),
                Datatype::new("TIMESTAMP", Temporal),
                Datatype::new("YEAR", Temporal),
                Datatype::new("BOOLEAN", Other)
                    .aliases(&["BOOL"])
                    .boolean(BooleanStyle::Digits),
                Datatype::new("ENUM", Other).with_set().with_collation(),
                Datatype::new("SET", Other).with_set().with_collation(),
                Datatype::new("JSON", Other),
                Datatype::new("UUID", Other),
            ])
            .extend(standard_datatypes())
            .build();
        let index_types = Catalog::builder()
            .extend([
                IndexType::primary(),
                IndexType::unique(),
                IndexType::normal(),
                IndexType::fulltext(),
                IndexType::spatial(),
            ])
            .build();
        Self {
            datatypes,
            index_types,
        }
    }

    fn create_table(&self, table: &Table) -> String {
        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.build_column(table, c, INLINE_KEYS))
            .collect();
        definitions.extend(table.indexes.iter().map(|i| self.build_index(i, &[])));
        definitions.extend(
            table
                .foreign_keys
                .iter()
                .map(|fk| self.foreign_key_definition(fk)),
        );
        definitions.extend(table.checks.iter().map(|c| self.check_definition(c)));

        let mut options = Vec::new();
        if let Some(engine) = &table.engine {
            options.push(format!("ENGINE={engine}"));
        }
        if let Some(collation) = &table.collation {
            options.push(format!("COLLATE={collation}"));
        }
        if let Some(next) = table.auto_increment {
            options.push(format!("AUTO_INCREMENT={next}"));
        }
        if let Some(comment) = &table.comment {
            options.push(format!("COMMENT={}", quote_literal(comment)));
        }
        create_table_statement(self, table, &definitions, &options.join(" "))
    }

    /// One `ALTER TABLE` per changed table option.
    fn table_options(changes: &TableChanges<'_>, table: &str, plan: &mut Plan) {
        let (original, current) = (changes.original, changes.current);
        if original.collation != current.collation {
            if let Some(collation) = &current.collation {
                let charset = collation.split('_').next().unwrap_or(collation);
                plan.push(format!(
                    "ALTER TABLE {table} CONVERT TO CHARACTER SET {charset} COLLATE {collation}"
                ));
            }
        }
        if original.engine != current.engine {
            if let Some(engine) = &current.engine {
                plan.push(format!("ALTER TABLE {table} ENGINE = {engine}"));
            }
        }
        if original.auto_increment != current.auto_increment {
            if let Some(next) = current.auto_increment {
                plan.push(format!("ALTER TABLE {table} AUTO_INCREMENT = {next}"));
            }
        }
        if original.comment != current.comment {
            let comment = current.comment.as_deref().unwrap_or_default();
            plan.push(format!(
                "ALTER TABLE {table} COMMENT = {}",
                quote_literal(comment)
            ));
        }
    }

    /// ` FIRST` or ` AFTER col` placing `column` behind its current
    /// predecessor, whose name is looked up with `name_of`.
    fn position<'a>(
        &self,
        changes: &TableChanges<'a>,
        column: &Column,
        name_of: impl Fn(&'a Column) -> &'a str,
    ) -> String {
        match changes.predecessor(column) {
            None => " FIRST".to_string(),
            Some(before) => format!(" AFTER {}", self.quote_identifier(name_of(before))),
        }
    }

    fn drop_index(&self, table: &str, index: &Index) -> String {
        if index.is_primary() {
            format!("ALTER TABLE {table} DROP PRIMARY KEY")
        } else {
            format!("DROP INDEX {} ON {table}", self.quote_identifier(&index.name))
        }
    }
}

impl Default for MariaDbContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DdlBuilder for MariaDbContext {
    fn quote_char(&self) -> char {
        '`'
    }

    fn column_slots(&self) -> &'static [ColumnSlot] {
        COLUMN_SLOTS
    }

    fn index_slots(&self) -> &'static [IndexSlot] {
        INDEX_SLOTS
    }

    fn index_type(&self, index: &Index) -> String {
        if index.is_primary() {
            "PRIMARY KEY".to_string()
        } else if index.index_type.keyword.is_empty() {
            "KEY".to_string()
        } else {
            format!("{} KEY", index.index_type.keyword)
        }
    }

    fn index_name(&self, index: &Index) -> String {
        if index.is_primary() {
            String::new()
        } else {
            self.quote_identifier(&index.name)
        }
    }
}

impl DialectContext for MariaDbContext {
    fn dialect(&self) -> Dialect {
        Dialect::MariaDb
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            rename_column: true,
            drop_column: true,
            alter_column: true,
            add_constraint: true,
            column_position: true,
            inline_indexes: true,
            transactional_ddl: false,
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
        Ok(plan)
    }

    fn emit_alter(&self, changes: &TableChanges<'_>, _taken: &[String]) -> Result<Plan> {
        let mut plan = Plan::new(Strategy::Incremental);
        let current = changes.current;
        let table = self.quote_identifier(&current.name);

        if changes.is_renamed() {
            plan.push(format!(
                "ALTER TABLE {} RENAME TO {table}",
                self.quote_identifier(&changes.original.name)
            ));
        }
        Self::table_options(changes, &table, &mut plan);

        // Keys go first so the columns they cover can change or go.
        for fk in changes.dropped_foreign_keys() {
            plan.push(format!(
                "ALTER TABLE {table} DROP FOREIGN KEY {}",
                self.quote_identifier(&fk.name)
            ));
        }
        for index in changes.dropped_indexes() {
            plan.push(self.drop_index(&table, index));
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

        // New columns are added before existing ones are renamed, so a
        // predecessor that already existed is named as it was.
        for column in changes.added_columns() {
            let position = if changes.needs_position(column) {
                self.position(changes, column, |c| {
                    changes.original_name(c).unwrap_or(c.name.as_str())
                })
            } else {
                String::new()
            };
            plan.push(format!(
                "ALTER TABLE {table} ADD COLUMN {}{position}",
                self.build_column(current, column, INLINE_KEYS)
            ));
        }
        for (original, column) in changes.changed_columns() {
            let definition = self.build_column(current, column, INLINE_KEYS);
            let clause = if original.name == column.name {
                format!("MODIFY {definition}")
            } else {
                format!(
                    "CHANGE {} {definition}",
                    self.quote_identifier(&original.name)
                )
            };
            let position = if changes.is_moved(column) {
                self.position(changes, column, |c| c.name.as_str())
            } else {
                String::new()
            };
            plan.push(format!("ALTER TABLE {table} {clause}{position}"));
        }
        for column in changes.removed_columns() {
            plan.push(format!(
                "ALTER TABLE {table} DROP COLUMN {}",
                self.quote_identifier(&column.name)
            ));
        }

        for index in changes.created_indexes() {
            if index.is_primary() {
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
